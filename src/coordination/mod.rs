//! Coordination service abstraction.
//!
//! A [`Coordinator`] opens [`Session`]s; a session can register an ephemeral
//! node, which the service removes once that session goes away. The election
//! is nothing more than racing to create [`ELECTION_PATH`].
//!
//! Two backends ship with the crate:
//!
//! | Backend                 | Use                                          |
//! |-------------------------|----------------------------------------------|
//! | [`ZooKeeperCoordinator`] | A real ensemble (`backend = "zookeeper"`)   |
//! | [`MemoryCoordinator`]    | Standalone runs and tests (`backend = "memory"`) |

mod memory;
mod zookeeper;

pub use memory::{MemoryCoordinator, MemorySession};
pub use zookeeper::ZooKeeperCoordinator;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Backend;
use crate::errors::CoordinationError;

/// Well-known node whose holder is the leader.
pub const ELECTION_PATH: &str = "/election";

/// Access control attached to a created node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acl {
    /// `world:anyone` with every permission
    Open,
}

/// Opens sessions against a coordination service.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Establish a session, giving up after `timeout`.
    async fn connect(
        &self,
        endpoints: &[String],
        timeout: Duration,
    ) -> Result<Arc<dyn Session>, CoordinationError>;
}

/// A live session with the coordination service.
#[async_trait]
pub trait Session: Send + Sync {
    /// Create an ephemeral node at `path`.
    ///
    /// Fails with [`CoordinationError::NodeExists`] if another live session
    /// already holds it.
    async fn create_ephemeral(
        &self,
        path: &str,
        content: &[u8],
        acl: Acl,
    ) -> Result<(), CoordinationError>;

    /// End the session. Ephemeral nodes it created are released. Idempotent.
    async fn close(&self);
}

/// Build the coordinator for a configured backend.
pub fn coordinator_for(backend: Backend) -> Arc<dyn Coordinator> {
    match backend {
        Backend::Zookeeper => Arc::new(ZooKeeperCoordinator),
        Backend::Memory => Arc::new(MemoryCoordinator::new()),
    }
}

/// The single shared session cell.
///
/// Only one phase runs at a time, so the lock is never contended; it exists
/// to make the cell `Sync`. Installing a session always replaces the previous
/// one wholesale and hands it back to the caller.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<Mutex<Option<Arc<dyn Session>>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `session`, returning the one it supersedes.
    pub fn replace(&self, session: Arc<dyn Session>) -> Option<Arc<dyn Session>> {
        self.lock().replace(session)
    }

    /// The current session, if any.
    pub fn current(&self) -> Option<Arc<dyn Session>> {
        self.lock().clone()
    }

    /// Remove and return the current session.
    pub fn take(&self) -> Option<Arc<dyn Session>> {
        self.lock().take()
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn Session>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSlot")
            .field("set", &self.is_set())
            .finish()
    }
}
