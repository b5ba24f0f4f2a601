//! The election state machine.
//!
//! Each phase is one step: it runs, then names its successor. Phases never
//! construct each other directly; they ask a [`PhaseFactory`] so the cycle
//! Init → Attempt → Lead → Failover → Attempt … stays a cycle of values, not
//! of types.
//!
//! | Phase     | Triggers → Next                                                        |
//! |-----------|-------------------------------------------------------------------------|
//! | Init      | cancel→Stop; connect/dir fail→Failover; success→Attempt                  |
//! | Attempt   | cancel→Stop; no session→Failover; conflict→Attempt; win→Lead; error→Failover |
//! | Lead      | cancel→Stop; I/O error→Failover; normal cycle→Lead                       |
//! | Failover  | cancel→Stop; dir lost→Stop; retries exhausted→Stop; recovered→Attempt    |
//! | Stop      | terminal                                                               |

mod attempt;
mod factory;
mod failover;
mod init;
mod lead;
mod stop;

pub use attempt::AttemptPhase;
pub use factory::Phases;
pub use failover::{FAILOVER_ATTEMPTS, FAILOVER_BASE_TIMEOUT, FailoverPhase};
pub use init::{INIT_CONNECT_TIMEOUT, InitPhase};
pub use lead::LeadPhase;
pub use stop::StopPhase;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::PhaseError;

/// One state of the election state machine.
#[async_trait]
pub trait Phase: Send + Sync {
    /// Short name used in logs ("Init", "Attempt", ...).
    fn name(&self) -> &'static str;

    /// Perform this phase's work and pick the next phase.
    ///
    /// Implementations check `cancel` before any blocking call.
    async fn run(&self, cancel: &CancellationToken) -> Transition;
}

/// What a phase hands back to the driver.
pub struct Transition {
    /// `None` ends the run.
    pub next: Option<Arc<dyn Phase>>,
    /// The fault behind this transition, for the driver to log.
    pub error: Option<PhaseError>,
}

impl Transition {
    pub fn to(next: Arc<dyn Phase>) -> Self {
        Self {
            next: Some(next),
            error: None,
        }
    }

    pub fn fault(next: Arc<dyn Phase>, error: PhaseError) -> Self {
        Self {
            next: Some(next),
            error: Some(error),
        }
    }

    pub fn finish() -> Self {
        Self {
            next: None,
            error: None,
        }
    }

    pub fn next_name(&self) -> Option<&'static str> {
        self.next.as_ref().map(|p| p.name())
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("next", &self.next_name())
            .field("error", &self.error)
            .finish()
    }
}

/// Builds phases with their shared dependencies injected.
pub trait PhaseFactory: Send + Sync {
    fn init(&self) -> Arc<dyn Phase>;
    fn attempt(&self) -> Arc<dyn Phase>;
    fn lead(&self) -> Arc<dyn Phase>;
    fn failover(&self, cause: &PhaseError) -> Arc<dyn Phase>;
    fn stop(&self) -> Arc<dyn Phase>;
}

/// Route a fault to Failover.
pub(crate) fn to_failover(phases: &dyn PhaseFactory, error: impl Into<PhaseError>) -> Transition {
    let error = error.into();
    Transition::fault(phases.failover(&error), error)
}

/// Sleep for `duration`, waking early if `cancel` fires. The caller's next
/// entry check sees the cancellation.
pub(crate) async fn pause(cancel: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = cancel.cancelled() => {}
    }
}
