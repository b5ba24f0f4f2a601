use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{Phase, PhaseFactory, Transition, pause, to_failover};
use crate::config::ElectionConfig;
use crate::coordination::{Acl, ELECTION_PATH, SessionSlot};
use crate::errors::PhaseError;

/// Contender: try once to create the election node.
///
/// Losing the race is not a fault. The phase waits one attempt interval and
/// loops back into itself; only Failover retries on real errors.
pub struct AttemptPhase {
    phases: Arc<dyn PhaseFactory>,
    config: Arc<ElectionConfig>,
    session: SessionSlot,
}

impl AttemptPhase {
    pub fn new(
        phases: Arc<dyn PhaseFactory>,
        config: Arc<ElectionConfig>,
        session: SessionSlot,
    ) -> Self {
        Self {
            phases,
            config,
            session,
        }
    }
}

#[async_trait]
impl Phase for AttemptPhase {
    fn name(&self) -> &'static str {
        "Attempt"
    }

    async fn run(&self, cancel: &CancellationToken) -> Transition {
        info!("trying to become leader");

        if cancel.is_cancelled() {
            info!("cancelled, going to stop");
            return Transition::to(self.phases.stop());
        }

        let Some(session) = self.session.current() else {
            error!("no coordination session");
            return to_failover(self.phases.as_ref(), PhaseError::NoSession);
        };

        match session.create_ephemeral(ELECTION_PATH, &[], Acl::Open).await {
            Ok(()) => {
                info!(path = ELECTION_PATH, "became leader");
                Transition::to(self.phases.lead())
            }
            Err(e) if e.is_node_exists() => {
                info!(
                    retry_in_ms = self.config.attempt_interval.as_millis() as u64,
                    "leadership already taken"
                );
                pause(cancel, self.config.attempt_interval).await;
                Transition::to(self.phases.attempt())
            }
            Err(e) => {
                error!(error = %e, "failed to create election node");
                to_failover(self.phases.as_ref(), e)
            }
        }
    }
}
