//! The participant itself: `beacon run`.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::super::{Cli, RunArgs};

pub async fn cmd_run(cli: &Cli, args: &RunArgs) -> Result<()> {
    use beacon::config::{BeaconToml, ElectionConfig};
    use beacon::coordination::coordinator_for;
    use beacon::driver::Driver;
    use beacon::phase::{PhaseFactory, Phases};

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let file = BeaconToml::discover(cli.config.as_deref(), &cwd)?;
    let config = ElectionConfig::resolve(file.as_ref(), args.overrides())?;

    info!(
        backend = %config.backend,
        servers = %config.endpoints.join(", "),
        file_dir = %config.artifact_dir.display(),
        capacity = config.capacity,
        leader_interval = ?config.leader_interval,
        attempt_interval = ?config.attempt_interval,
        "args received"
    );

    let coordinator = coordinator_for(config.backend);
    let phases = Phases::new(config, coordinator);

    Driver::new()
        .run(CancellationToken::new(), phases.init())
        .await
        .context("Failed to run phases")?;

    Ok(())
}
