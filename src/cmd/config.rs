//! Configuration view and validation commands: `beacon config`.

use anyhow::{Context, Result};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    use beacon::config::{BeaconToml, ConfigOverrides, DEFAULT_CONFIG_FILE, ElectionConfig};

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_FILE));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", console::style("Beacon Configuration").bold());
            println!("====================");
            println!();

            if !config_path.exists() {
                println!("No beacon.toml found at {}", config_path.display());
                println!();
                println!("Run 'beacon config init' to create one, or pass every setting to 'beacon run'.");
                println!();
                return Ok(());
            }

            println!("Config file: {}", config_path.display());
            println!();
            let toml = BeaconToml::load(&config_path)?;

            println!("[coordination]");
            println!("  backend = \"{}\"", toml.coordination.backend);
            println!("  endpoints = {:?}", toml.coordination.endpoints);
            println!();
            println!("[timing]");
            if let Some(d) = &toml.timing.leader_interval {
                println!("  leader_interval = \"{}\"", d);
            }
            if let Some(d) = &toml.timing.attempt_interval {
                println!("  attempt_interval = \"{}\"", d);
            }
            println!();
            println!("[artifacts]");
            if let Some(dir) = &toml.artifacts.dir {
                println!("  dir = \"{}\"", dir.display());
            }
            if let Some(capacity) = toml.artifacts.capacity {
                println!("  capacity = {}", capacity);
            }
            println!();

            match ElectionConfig::resolve(Some(&toml), ConfigOverrides::default()) {
                Ok(config) => {
                    println!("Effective values:");
                    println!("  connect string = \"{}\"", config.connect_string());
                    println!("  leader interval = {:?}", config.leader_interval);
                    println!("  attempt interval = {:?}", config.attempt_interval);
                }
                Err(e) => {
                    println!(
                        "{} {:#}",
                        console::style("Incomplete:").yellow(),
                        e
                    );
                    println!("Missing values must be supplied on the 'beacon run' command line.");
                }
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let toml = BeaconToml::load(&config_path)?;
            ElectionConfig::resolve(Some(&toml), ConfigOverrides::default())
                .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
            println!("Configuration is valid.");
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                anyhow::bail!(
                    "{} already exists. Delete it first if you want to recreate it.",
                    config_path.display()
                );
            }

            BeaconToml::sample().save(&config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [coordination] backend, endpoints");
            println!("  - [timing] leader_interval, attempt_interval");
            println!("  - [artifacts] dir, capacity");
            println!();
        }
    }

    Ok(())
}
