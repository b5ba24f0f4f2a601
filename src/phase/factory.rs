use std::sync::Arc;

use super::{
    AttemptPhase, FailoverPhase, InitPhase, LeadPhase, Phase, PhaseFactory, StopPhase,
};
use crate::config::ElectionConfig;
use crate::coordination::{Coordinator, SessionSlot};
use crate::errors::PhaseError;
use crate::store::ArtifactStore;

struct Shared {
    config: Arc<ElectionConfig>,
    coordinator: Arc<dyn Coordinator>,
    session: SessionSlot,
    store: Arc<ArtifactStore>,
}

/// The dependency graph of one participant.
///
/// Cloning is cheap and every clone shares the same session slot and store,
/// so phases can carry a handle back to the factory without a reference cycle.
#[derive(Clone)]
pub struct Phases {
    shared: Arc<Shared>,
}

impl Phases {
    pub fn new(config: ElectionConfig, coordinator: Arc<dyn Coordinator>) -> Self {
        let store = ArtifactStore::new(config.artifact_dir.clone(), config.capacity);
        Self::with_store(config, coordinator, store)
    }

    pub fn with_store(
        config: ElectionConfig,
        coordinator: Arc<dyn Coordinator>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                coordinator,
                session: SessionSlot::new(),
                store: Arc::new(store),
            }),
        }
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.shared.config
    }

    pub fn session(&self) -> &SessionSlot {
        &self.shared.session
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.shared.store
    }

    fn handle(&self) -> Arc<dyn PhaseFactory> {
        Arc::new(self.clone())
    }
}

impl PhaseFactory for Phases {
    fn init(&self) -> Arc<dyn Phase> {
        let s = &self.shared;
        Arc::new(InitPhase::new(
            self.handle(),
            Arc::clone(&s.config),
            Arc::clone(&s.coordinator),
            s.session.clone(),
            Arc::clone(&s.store),
        ))
    }

    fn attempt(&self) -> Arc<dyn Phase> {
        let s = &self.shared;
        Arc::new(AttemptPhase::new(
            self.handle(),
            Arc::clone(&s.config),
            s.session.clone(),
        ))
    }

    fn lead(&self) -> Arc<dyn Phase> {
        let s = &self.shared;
        Arc::new(LeadPhase::new(
            self.handle(),
            Arc::clone(&s.config),
            Arc::clone(&s.store),
        ))
    }

    fn failover(&self, cause: &PhaseError) -> Arc<dyn Phase> {
        let s = &self.shared;
        Arc::new(FailoverPhase::new(
            self.handle(),
            Arc::clone(&s.config),
            Arc::clone(&s.coordinator),
            s.session.clone(),
            Arc::clone(&s.store),
            cause.to_string(),
        ))
    }

    fn stop(&self) -> Arc<dyn Phase> {
        Arc::new(StopPhase::new(self.shared.session.clone()))
    }
}
