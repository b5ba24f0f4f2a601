use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{Phase, PhaseFactory, Transition, to_failover};
use crate::config::ElectionConfig;
use crate::coordination::{Coordinator, SessionSlot};
use crate::store::ArtifactStore;

/// Connect timeout for the very first session.
pub const INIT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Entry phase: open the first session and check the artifact directory.
pub struct InitPhase {
    phases: Arc<dyn PhaseFactory>,
    config: Arc<ElectionConfig>,
    coordinator: Arc<dyn Coordinator>,
    session: SessionSlot,
    store: Arc<ArtifactStore>,
}

impl InitPhase {
    pub fn new(
        phases: Arc<dyn PhaseFactory>,
        config: Arc<ElectionConfig>,
        coordinator: Arc<dyn Coordinator>,
        session: SessionSlot,
        store: Arc<ArtifactStore>,
    ) -> Self {
        Self {
            phases,
            config,
            coordinator,
            session,
            store,
        }
    }
}

#[async_trait]
impl Phase for InitPhase {
    fn name(&self) -> &'static str {
        "Init"
    }

    async fn run(&self, cancel: &CancellationToken) -> Transition {
        info!("checking availability of resources");

        if cancel.is_cancelled() {
            info!("cancelled, going to stop");
            return Transition::to(self.phases.stop());
        }

        let session = match self
            .coordinator
            .connect(&self.config.endpoints, INIT_CONNECT_TIMEOUT)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "failed to connect to coordination service");
                return to_failover(self.phases.as_ref(), e);
            }
        };
        if let Some(previous) = self.session.replace(session) {
            previous.close().await;
        }

        if let Err(e) = self.store.check_accessible() {
            error!(error = %e, "artifact directory is not accessible");
            return to_failover(self.phases.as_ref(), e);
        }

        info!("resources are available");
        Transition::to(self.phases.attempt())
    }
}
