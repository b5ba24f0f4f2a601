//! In-process coordination service.
//!
//! Sessions and ephemeral nodes live in a shared table. A node is owned by the
//! session that created it and disappears when that session is closed,
//! dropped, or expired. Clones of a [`MemoryCoordinator`] see the same table,
//! so several participants in one process contend for real.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{Acl, Coordinator, Session};
use crate::errors::CoordinationError;

#[derive(Debug)]
struct Ensemble {
    next_session: u64,
    live: HashSet<u64>,
    /// path -> owning session id
    nodes: HashMap<String, u64>,
    reachable: bool,
    /// Connects still to be refused before honouring `reachable`
    refuse_connects: usize,
    connect_timeouts: Vec<Duration>,
}

impl Ensemble {
    fn release(&mut self, session: u64) {
        self.live.remove(&session);
        self.nodes.retain(|_, owner| *owner != session);
    }
}

#[derive(Debug, Clone)]
pub struct MemoryCoordinator {
    ensemble: Arc<Mutex<Ensemble>>,
}

impl Default for MemoryCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        Self {
            ensemble: Arc::new(Mutex::new(Ensemble {
                next_session: 1,
                live: HashSet::new(),
                nodes: HashMap::new(),
                reachable: true,
                refuse_connects: 0,
                connect_timeouts: Vec::new(),
            })),
        }
    }

    /// Toggle reachability. While unreachable, connects and node operations fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().reachable = reachable;
    }

    /// Refuse the next `count` connects, then behave normally.
    pub fn refuse_next_connects(&self, count: usize) {
        self.lock().refuse_connects = count;
    }

    /// Session id holding `path`, if any.
    pub fn holder(&self, path: &str) -> Option<u64> {
        self.lock().nodes.get(path).copied()
    }

    /// Kill a session server-side, as a session timeout would.
    pub fn expire(&self, session: u64) {
        self.lock().release(session);
    }

    pub fn live_sessions(&self) -> usize {
        self.lock().live.len()
    }

    /// Timeout passed to every connect so far, in call order.
    pub fn connect_timeouts(&self) -> Vec<Duration> {
        self.lock().connect_timeouts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Ensemble> {
        self.ensemble
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Coordinator for MemoryCoordinator {
    async fn connect(
        &self,
        endpoints: &[String],
        timeout: Duration,
    ) -> Result<Arc<dyn Session>, CoordinationError> {
        let mut ensemble = self.lock();
        ensemble.connect_timeouts.push(timeout);

        if ensemble.refuse_connects > 0 {
            ensemble.refuse_connects -= 1;
            return Err(unreachable(endpoints));
        }
        if !ensemble.reachable {
            return Err(unreachable(endpoints));
        }

        let id = ensemble.next_session;
        ensemble.next_session += 1;
        ensemble.live.insert(id);

        Ok(Arc::new(MemorySession {
            id,
            ensemble: Arc::clone(&self.ensemble),
        }))
    }
}

fn unreachable(endpoints: &[String]) -> CoordinationError {
    let endpoints = if endpoints.is_empty() {
        "memory".to_string()
    } else {
        endpoints.join(",")
    };
    CoordinationError::Unreachable { endpoints }
}

#[derive(Debug)]
pub struct MemorySession {
    id: u64,
    ensemble: Arc<Mutex<Ensemble>>,
}

impl MemorySession {
    fn lock(&self) -> MutexGuard<'_, Ensemble> {
        self.ensemble
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn create_ephemeral(
        &self,
        path: &str,
        _content: &[u8],
        _acl: Acl,
    ) -> Result<(), CoordinationError> {
        let mut ensemble = self.lock();

        if !ensemble.live.contains(&self.id) {
            return Err(CoordinationError::SessionClosed);
        }
        if !ensemble.reachable {
            return Err(unreachable(&[]));
        }
        if ensemble.nodes.contains_key(path) {
            return Err(CoordinationError::NodeExists {
                path: path.to_string(),
            });
        }

        ensemble.nodes.insert(path.to_string(), self.id);
        Ok(())
    }

    async fn close(&self) {
        self.lock().release(self.id);
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.lock().release(self.id);
    }
}
