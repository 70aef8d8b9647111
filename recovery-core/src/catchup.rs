//! The catch-up subsystem's contract, as consumed by the recovery core.
//! A separate trait from `RecoveryNetwork` because it models a local
//! collaborator (the catch-up engine), not a network peer.

use crate::error::CatchUpError;
use tokio::sync::mpsc;

/// Identifies a single catch-up registration, so deregistration is
/// well-defined and observable rather than relying on dropping a closure —
/// see the redesign note about giving the catch-up listener an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CatchUpSubscriptionId(pub u64);

/// Reported by the catch-up subsystem each time a round completes. A round
/// completing does not imply the target instance is locally known yet —
/// gaps closed by a snapshot can leave holes at the tail.
#[derive(Clone, Copy, Debug)]
pub struct CatchUpOutcome {
    pub first_uncommitted: u64,
}

/// Fetches missing decided instances (and, if necessary, snapshots) from
/// other replicas.
pub trait CatchUpClient: Send + Sync {
    /// Register as a one-shot listener for rounds targeting
    /// `target_next_id`. Returns a subscription id the caller must later
    /// pass to `deregister`.
    fn register(
        &self,
        target_next_id: u64,
        sender: mpsc::Sender<CatchUpOutcome>,
    ) -> CatchUpSubscriptionId;

    /// Request another catch-up round under an existing subscription.
    fn force_catchup(&self, subscription: CatchUpSubscriptionId);

    /// Remove a subscription. Failure here is fatal: a stale listener could
    /// fire after recovery has already completed.
    fn deregister(&self, subscription: CatchUpSubscriptionId) -> Result<(), CatchUpError>;
}
