//! In-memory volatile Paxos state seeded fresh on every boot, and the
//! bootstrap routine that builds it.
//!
//! Disk-log replay of accepted instances is a non-goal of this variant —
//! only the epoch is stable — so `log` below exists purely to mirror the
//! shape of "fresh storage with an empty log" from the bootstrap steps; it
//! is never populated.

use crate::{
    epoch_store::EpochStore,
    error::EpochStoreError,
    model::{EpochVector, LocalEpoch, ReplicaId, View},
};
use std::sync::Arc;

use parking_lot::RwLock;

/// The subset of Paxos volatile state the recovery core seeds and mutates:
/// the current view and the epoch vector. Shared with the Paxos engine
/// behind a lock; the recovery core only ever touches it on the single
/// dispatcher task (see the coordinator's `run` loop).
pub struct PaxosVolatileState {
    pub view: View,
    pub epoch_vector: EpochVector,
    pub log: Vec<()>,
}

/// Builds fresh volatile storage for this boot and bumps the local epoch.
pub struct StorageBootstrap;

impl StorageBootstrap {
    /// Steps, in order, per the component design:
    /// 1. fresh storage, view 0, empty log
    /// 2. bump view if it would make this replica leader
    /// 3. read the prior epoch and compute the new one
    /// 4. persist the new epoch (must succeed before any message is sent)
    /// 5-6. build and install the epoch vector
    pub fn bootstrap(
        epoch_store: &dyn EpochStore,
        local_id: ReplicaId,
        n: usize,
    ) -> Result<(Arc<RwLock<PaxosVolatileState>>, LocalEpoch), EpochStoreError> {
        let mut view = View(0);
        if view.leader(n) == local_id {
            view = view.bump();
        }

        let prior_epoch = epoch_store.read()?;
        let new_epoch = LocalEpoch(prior_epoch + 1);
        epoch_store.write(new_epoch.get())?;

        let epoch_vector = EpochVector::seeded(n, local_id, new_epoch);
        let storage = Arc::new(RwLock::new(PaxosVolatileState {
            view,
            epoch_vector,
            log: Vec::new(),
        }));

        Ok((storage, new_epoch))
    }
}
