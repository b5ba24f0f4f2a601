use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{Phase, Transition};
use crate::coordination::SessionSlot;

/// Terminal phase: release the session, best effort.
pub struct StopPhase {
    session: SessionSlot,
}

impl StopPhase {
    pub fn new(session: SessionSlot) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Phase for StopPhase {
    fn name(&self) -> &'static str {
        "Stop"
    }

    async fn run(&self, _cancel: &CancellationToken) -> Transition {
        info!("releasing resources");

        if let Some(session) = self.session.take() {
            session.close().await;
        }

        info!("resources released");
        Transition::finish()
    }
}
