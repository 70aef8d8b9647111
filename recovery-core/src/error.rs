//! Error kinds for the recovery core, following the `thiserror`-at-the-
//! boundary style used throughout this repository's consensus crate (see
//! `consensus_observer::error::Error`).

use crate::model::ReplicaId;
use std::path::PathBuf;
use thiserror::Error;

/// Stable-storage failures. Every variant is fatal per the recovery core's
/// error handling design: the replica must not continue if the epoch bump
/// cannot be made durable.
#[derive(Debug, Error)]
pub enum EpochStoreError {
    #[error("failed to read epoch file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write epoch temp file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to sync directory {path}: {source}")]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("epoch file {path} has {len} bytes, expected 8")]
    Corrupt { path: PathBuf, len: usize },
}

/// Failure to deregister or otherwise interact with the external catch-up
/// subsystem.
#[derive(Debug, Error)]
#[error("catch-up client error: {0}")]
pub struct CatchUpError(pub String);

/// Errors surfaced by the recovery coordinator's driving loop. Only
/// `RetransmitterFailure`, `CatchUpDeregisterFailure`, and `EpochStore` are
/// fatal; malformed and stale answers are discarded by the coordinator
/// before ever becoming a `RecoveryError` (see `coordinator::handle_answer`).
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("retransmitter failed to narrow to leader {leader}: {reason}")]
    RetransmitterFailure { leader: ReplicaId, reason: String },

    #[error("failed to deregister catch-up listener: {0}")]
    CatchUpDeregisterFailure(String),

    #[error(transparent)]
    EpochStore(#[from] EpochStoreError),
}

impl From<CatchUpError> for RecoveryError {
    fn from(value: CatchUpError) -> Self {
        RecoveryError::CatchUpDeregisterFailure(value.0)
    }
}
