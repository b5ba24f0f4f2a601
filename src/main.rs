use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use beacon::config::{Backend, ConfigOverrides, parse_duration};
use beacon::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(version, about = "Leader-election participant backed by ZooKeeper ephemeral nodes")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line encoding: text or json
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Write logs to this file instead of stdout
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to beacon.toml. Defaults to ./beacon.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a participant: connect, contend for /election, and write
    /// artifacts while leader
    Run(RunArgs),
    /// View, validate or initialize beacon.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// ZooKeeper servers (repeatable, comma-separated)
    #[arg(short = 's', long = "zk-servers", env = "BEACON_ZK_SERVERS", value_delimiter = ',')]
    pub zk_servers: Vec<String>,

    /// Period of the leader's artifact writing (e.g. "5s")
    #[arg(short = 'l', long = "leader-timeout", env = "BEACON_LEADER_TIMEOUT", value_parser = parse_duration)]
    pub leader_timeout: Option<Duration>,

    /// Period with which a contender retries for leadership (e.g. "2s")
    #[arg(short = 'a', long = "attempter-timeout", env = "BEACON_ATTEMPTER_TIMEOUT", value_parser = parse_duration)]
    pub attempter_timeout: Option<Duration>,

    /// Directory where the leader writes artifacts
    #[arg(short = 'f', long = "file-dir", env = "BEACON_FILE_DIR")]
    pub file_dir: Option<PathBuf>,

    /// Maximum number of files kept in the artifact directory
    #[arg(short = 'c', long = "storage-capacity", env = "BEACON_STORAGE_CAPACITY")]
    pub storage_capacity: Option<usize>,

    /// Coordination backend: zookeeper or memory
    #[arg(long, env = "BEACON_BACKEND")]
    pub backend: Option<Backend>,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.backend,
            endpoints: self.zk_servers.clone(),
            leader_interval: self.leader_timeout,
            attempt_interval: self.attempter_timeout,
            artifact_dir: self.file_dir.clone(),
            capacity: self.storage_capacity,
        }
    }
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the configuration file and effective values
    Show,
    /// Validate the configuration file
    Validate,
    /// Write a starter beacon.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_format, cli.log_file.as_deref())?;

    match &cli.command {
        Commands::Run(args) => cmd::cmd_run(&cli, args).await?,
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
