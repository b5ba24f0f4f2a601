//! Typed error hierarchy for the beacon participant.
//!
//! Three top-level enums cover the three subsystems:
//! - `CoordinationError`: coordination-service connect and registration failures
//! - `StoreError`: artifact directory failures
//! - `PhaseError`: the fault a phase hands to the driver alongside its successor

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from the coordination service (connect, ephemeral registration).
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("Node {path} already exists")]
    NodeExists { path: String },

    #[error("Timed out after {timeout:?} connecting to coordination service")]
    ConnectTimeout { timeout: Duration },

    #[error("Coordination service unreachable at {endpoints}")]
    Unreachable { endpoints: String },

    #[error("Session is closed")]
    SessionClosed,

    #[error("Coordination backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CoordinationError {
    /// Whether this is the expected "someone else is leader" outcome.
    pub fn is_node_exists(&self) -> bool {
        matches!(self, CoordinationError::NodeExists { .. })
    }
}

/// Errors from the artifact directory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact directory {path} is not accessible: {source}")]
    DirectoryInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list artifact directory {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove artifact {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The fault that caused a phase to leave its happy path.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("No coordination session is set")]
    NoSession,

    #[error("Recovery failed after {attempts} reconnect attempts")]
    RecoveryExhausted { attempts: u32 },

    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
