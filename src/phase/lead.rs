use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{Phase, PhaseFactory, Transition, pause, to_failover};
use crate::config::ElectionConfig;
use crate::store::ArtifactStore;

/// Leader duty cycle: write one artifact, trim the directory to capacity,
/// sleep, repeat.
///
/// Leadership is not re-verified between cycles. A leader whose session was
/// expired server-side keeps writing until some later coordination call fails.
pub struct LeadPhase {
    phases: Arc<dyn PhaseFactory>,
    config: Arc<ElectionConfig>,
    store: Arc<ArtifactStore>,
}

impl LeadPhase {
    pub fn new(
        phases: Arc<dyn PhaseFactory>,
        config: Arc<ElectionConfig>,
        store: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            phases,
            config,
            store,
        }
    }
}

#[async_trait]
impl Phase for LeadPhase {
    fn name(&self) -> &'static str {
        "Lead"
    }

    async fn run(&self, cancel: &CancellationToken) -> Transition {
        info!("leading, writing artifact");

        if cancel.is_cancelled() {
            info!("cancelled, going to stop");
            return Transition::to(self.phases.stop());
        }

        let artifact = match self.store.write_artifact() {
            Ok(name) => name,
            Err(e) => {
                error!(error = %e, "failed to write artifact");
                return to_failover(self.phases.as_ref(), e);
            }
        };
        debug!(artifact = %artifact, "artifact written");

        let entries = match self.store.list() {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "failed to read artifact directory");
                return to_failover(self.phases.as_ref(), e);
            }
        };

        match self.store.evict_oldest(entries) {
            Ok(evicted) if !evicted.is_empty() => {
                info!(evicted = evicted.len(), capacity = self.store.capacity(), "evicted old artifacts");
                debug!(names = ?evicted, "evicted");
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "failed to delete old artifact");
                return to_failover(self.phases.as_ref(), e);
            }
        }

        pause(cancel, self.config.leader_interval).await;
        Transition::to(self.phases.lead())
    }
}
