use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::{Phase, PhaseFactory, Transition};
use crate::config::ElectionConfig;
use crate::coordination::{Coordinator, SessionSlot};
use crate::errors::PhaseError;
use crate::store::ArtifactStore;

/// Reconnect attempts before giving up.
pub const FAILOVER_ATTEMPTS: u32 = 5;

/// Connect timeout of the first attempt; doubled after every failure.
pub const FAILOVER_BASE_TIMEOUT: Duration = Duration::from_secs(1);

/// Recovery: re-establish a session with exponential connect timeouts.
///
/// A reconnect with an inaccessible artifact directory is final (Stop); a
/// successful one goes back to contending, never straight to Lead.
pub struct FailoverPhase {
    phases: Arc<dyn PhaseFactory>,
    config: Arc<ElectionConfig>,
    coordinator: Arc<dyn Coordinator>,
    session: SessionSlot,
    store: Arc<ArtifactStore>,
    cause: String,
}

impl FailoverPhase {
    pub fn new(
        phases: Arc<dyn PhaseFactory>,
        config: Arc<ElectionConfig>,
        coordinator: Arc<dyn Coordinator>,
        session: SessionSlot,
        store: Arc<ArtifactStore>,
        cause: String,
    ) -> Self {
        Self {
            phases,
            config,
            coordinator,
            session,
            store,
            cause,
        }
    }
}

#[async_trait]
impl Phase for FailoverPhase {
    fn name(&self) -> &'static str {
        "Failover"
    }

    async fn run(&self, cancel: &CancellationToken) -> Transition {
        warn!(cause = %self.cause, "attempting to recover");

        let mut timeout = FAILOVER_BASE_TIMEOUT;
        for attempt in 1..=FAILOVER_ATTEMPTS {
            if cancel.is_cancelled() {
                info!("cancelled, going to stop");
                return Transition::to(self.phases.stop());
            }

            info!(attempt, timeout_ms = timeout.as_millis() as u64, "reconnecting");
            let session = match self.coordinator.connect(&self.config.endpoints, timeout).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(attempt, error = %e, "failed to reconnect to coordination service");
                    timeout *= 2;
                    continue;
                }
            };

            // The superseded session may still hold the election node.
            if let Some(previous) = self.session.replace(session) {
                previous.close().await;
            }

            if let Err(e) = self.store.check_accessible() {
                error!(error = %e, "artifact directory lost, giving up");
                return Transition::fault(self.phases.stop(), e.into());
            }

            info!(attempt, "recovered");
            return Transition::to(self.phases.attempt());
        }

        error!(attempts = FAILOVER_ATTEMPTS, "failed to reconnect after all attempts");
        Transition::fault(
            self.phases.stop(),
            PhaseError::RecoveryExhausted {
                attempts: FAILOVER_ATTEMPTS,
            },
        )
    }
}
