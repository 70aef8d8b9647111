//! EpochSS: the epoch-based stable-storage recovery protocol for an
//! S-Paxos-style replicated state machine.
//!
//! This crate owns the recovery core only — the Paxos proposer/acceptor/
//! learner engine, the catch-up subsystem, the network transport, and the
//! snapshot provider are all external collaborators, specified here purely
//! by the trait boundaries this crate consumes (`network::RecoveryNetwork`,
//! `catchup::CatchUpClient`) or produces (`storage::PaxosVolatileState`).

pub mod catchup;
pub mod coordinator;
pub mod epoch_store;
pub mod error;
pub mod logging;
pub mod model;
pub mod network;
pub mod quorum;
pub mod retransmit;
pub mod storage;

pub use catchup::{CatchUpClient, CatchUpOutcome, CatchUpSubscriptionId};
pub use coordinator::{CoordinatorState, RecoveryCoordinator};
pub use epoch_store::{EpochStore, FileEpochStore};
pub use error::{CatchUpError, EpochStoreError, RecoveryError};
pub use model::{EpochVector, LocalEpoch, QuorumState, ReplicaId, RecoveryAnswer, RecoveryProbe, View};
pub use network::{ProbeSender, RecoveryNetwork, RecoveryObserver, RecoveryRequestHandler, Retransmitter};
pub use quorum::QuorumGatherer;
pub use retransmit::TokioRetransmitter;
pub use storage::{PaxosVolatileState, StorageBootstrap};

use std::{path::PathBuf, sync::Arc};

/// The subset of process configuration the recovery core needs: where the
/// epoch file lives, and this replica's position in the ensemble.
/// Everything else (config file loading, logging subscriber setup) is the
/// embedder's responsibility per the scope note in §1 of the specification.
#[derive(Clone, Debug)]
pub struct RecoveryConfig {
    pub epoch_file_dir: PathBuf,
    pub local_id: ReplicaId,
    pub replica_count: usize,
}

/// Bootstraps storage and the epoch, constructs a `RecoveryCoordinator`,
/// and drives it to `Live`. The top-level entry point an embedder calls
/// once at process start, mirroring `consensus_provider::start_consensus`'s
/// role of wiring the epoch manager together and handing back what the
/// rest of the system needs.
pub async fn recover<N, C>(
    config: &RecoveryConfig,
    network: Arc<N>,
    catchup: Arc<C>,
    request_handler: Arc<dyn RecoveryRequestHandler>,
    observer: Arc<dyn RecoveryObserver>,
) -> Result<RecoveryCoordinator<N, C>, RecoveryError>
where
    N: RecoveryNetwork,
    C: CatchUpClient,
{
    let epoch_store = FileEpochStore::new(config.epoch_file_dir.clone());
    let (storage, local_epoch) =
        StorageBootstrap::bootstrap(&epoch_store, config.local_id, config.replica_count)?;

    let coordinator = RecoveryCoordinator::new(
        config.local_id,
        config.replica_count,
        storage,
        local_epoch,
        network,
        catchup,
        request_handler,
        observer,
    );

    coordinator.run().await
}
