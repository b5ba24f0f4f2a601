//! The phase loop.
//!
//! The driver owns no policy: it runs the current phase, logs whatever fault
//! came back, and moves to the phase it was handed until there is none.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

use crate::phase::Phase;

/// Counters from one driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Phase runs performed, including the terminal one
    pub phases_run: u64,
    /// Transitions that carried a fault
    pub faults: u64,
}

#[derive(Debug, Default)]
pub struct Driver;

impl Driver {
    pub fn new() -> Self {
        Self
    }

    /// Run phases from `initial` until one returns no successor.
    ///
    /// A child of `cancel` is handed to the phases and is also cancelled on
    /// SIGINT or SIGTERM. Phase faults are logged, never returned; the only
    /// error is failing to install the signal handlers.
    pub async fn run(&self, cancel: CancellationToken, initial: Arc<dyn Phase>) -> Result<RunSummary> {
        let cancel = cancel.child_token();
        let watcher = spawn_signal_watcher(cancel.clone())?;

        let mut summary = RunSummary::default();
        let mut current = Some(initial);
        while let Some(phase) = current {
            let name = phase.name();
            info!(phase = name, "start running phase");

            let transition = phase
                .run(&cancel)
                .instrument(info_span!("phase", name))
                .await;
            summary.phases_run += 1;

            if let Some(err) = &transition.error {
                summary.faults += 1;
                error!(phase = name, error = %err, "phase run failed");
            }
            current = transition.next;
        }

        info!(phases_run = summary.phases_run, faults = summary.faults, "no new phase, finish");
        watcher.abort();
        Ok(summary)
    }
}

fn spawn_signal_watcher(cancel: CancellationToken) -> Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let sigterm = terminate.recv();
        #[cfg(not(unix))]
        let sigterm = std::future::pending::<Option<()>>();

        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => info!("received SIGINT, cancelling"),
            _ = sigterm => info!("received SIGTERM, cancelling"),
            _ = cancel.cancelled() => return,
        }
        cancel.cancel();
    }))
}
