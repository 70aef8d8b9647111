//! Structured logging events, mirroring the shape (if not the macro
//! machinery) of `consensus::logging::LogSchema`: a small enum of event
//! names logged alongside a few identifying fields. This crate is not built
//! inside the internal logging framework, so plain `tracing` stands in for
//! it — the rest of this pack reaches for `tracing` wherever the internal
//! logger isn't available.

use crate::model::{LocalEpoch, ReplicaId};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub enum RecoveryEvent {
    FirstBoot,
    SingleReplicaEnsemble,
    ProbeBroadcast,
    AnswerDiscardedMalformed,
    AnswerDiscardedStale,
    QuorumReachedWithoutLeader,
    NarrowedToLeader,
    CatchUpStarted,
    CatchUpUnderrun,
    RecoveryFinished,
}

pub(crate) fn log(event: RecoveryEvent, local_id: ReplicaId, epoch: LocalEpoch) {
    tracing::info!(event = ?event, local_id, epoch = epoch.get(), "recovery core event");
}
