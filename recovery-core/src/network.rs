//! The network-facing contracts the recovery core consumes. All of these
//! are external collaborators per the scope note in §1 — the recovery core
//! only depends on their interfaces, never a concrete transport.

use crate::{
    error::RecoveryError,
    model::{RecoveryAnswer, RecoveryProbe, ReplicaId},
};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::mpsc;

/// A running retransmission of one message to a set of peers. Re-sent on a
/// fixed cadence until every peer answers or is explicitly stopped.
pub trait Retransmitter: Send + Sync {
    /// Stop resending to a single peer; other peers are unaffected. If a
    /// send to `peer` is in flight when this is called, no further resend
    /// to `peer` occurs once this call returns.
    fn stop_peer(&self, peer: ReplicaId);

    /// Stop resending to every peer and invalidate this handle.
    fn stop_all(&self);
}

/// The embedder's network layer, from the recovery core's point of view.
/// Installing one of the two listeners below always implies the other is
/// not installed — the coordinator enforces this by construction (it holds
/// at most one of {`Probing`/`AwaitingLeader`, `Live`} at a time).
pub trait RecoveryNetwork: Send + Sync {
    type Retransmitter: Retransmitter;

    /// Start resending `probe` to `targets` until stopped. Failure here is
    /// fatal: it means a transport invariant was violated (for example, no
    /// known address for a target the coordinator believes is a live peer).
    fn start_retransmitting(
        &self,
        probe: RecoveryProbe,
        targets: HashSet<ReplicaId>,
    ) -> Result<Self::Retransmitter, RecoveryError>;

    /// Install the listener that forwards incoming `RecoveryAnswer`
    /// messages onto `sender`. Only valid while the coordinator is in
    /// `Probing` or `AwaitingLeader`.
    fn install_recovery_answer_listener(&self, sender: mpsc::Sender<(ReplicaId, RecoveryAnswer)>);

    /// Remove the `RecoveryAnswer` listener installed above.
    fn uninstall_recovery_answer_listener(&self);

    /// Install the handler that serves peers who are themselves recovering.
    /// Installed exactly once, on entering `Live`, and never removed.
    fn install_recovery_request_handler(&self, handler: Arc<dyn RecoveryRequestHandler>);
}

/// Serves `Recovery` requests from peers that are themselves recovering.
/// Installed only once this replica has reached `Live`.
pub trait RecoveryRequestHandler: Send + Sync {
    fn handle_recovery_request(&self, from: ReplicaId, probe: &RecoveryProbe) -> RecoveryAnswer;
}

/// One-shot signal to the embedder that recovery has reached `Live` and the
/// Paxos engine may accept protocol traffic.
pub trait RecoveryObserver: Send + Sync {
    fn on_recovery_finished(&self);
}

/// Sends a single `RecoveryProbe` to a single peer. Factored out of
/// `RecoveryNetwork` so a `Retransmitter` implementation (see
/// `retransmit::TokioRetransmitter`) can be built against just the part of
/// the network it actually drives.
#[async_trait::async_trait]
pub trait ProbeSender: Send + Sync {
    async fn send_probe(&self, peer: ReplicaId, probe: &RecoveryProbe);
}
