//! Wire-relevant data types shared by the recovery core: the local epoch,
//! the epoch vector, the view, and the two recovery messages.

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};

/// Identifies a replica by its position in the validator set, `0..N`.
pub type ReplicaId = u64;

/// A monotonic per-replica incarnation counter, bumped once per boot and
/// persisted before any protocol message is sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalEpoch(pub u64);

impl LocalEpoch {
    /// The epoch value a replica gets on its very first boot, when
    /// `EpochStore::read` returned 0.
    pub const FIRST_BOOT: LocalEpoch = LocalEpoch(1);

    pub fn get(self) -> u64 {
        self.0
    }

    /// True iff no prior incarnation of this replica can possibly exist.
    pub fn is_first_boot(self) -> bool {
        self == Self::FIRST_BOOT
    }
}

impl fmt::Display for LocalEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing view number. The leader of view `v` is replica
/// `v mod N`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct View(pub u64);

impl View {
    pub fn leader(self, n: usize) -> ReplicaId {
        debug_assert!(n > 0, "a replica set must have at least one member");
        self.0 % n as u64
    }

    pub fn bump(self) -> Self {
        View(self.0 + 1)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-length array of per-replica epochs, merged element-wise by max.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochVector(Vec<u64>);

impl EpochVector {
    pub fn zeros(n: usize) -> Self {
        Self(vec![0; n])
    }

    /// A zero vector with `local_id`'s slot set to `local_epoch`, as built
    /// fresh on every boot (see `StorageBootstrap`).
    pub fn seeded(n: usize, local_id: ReplicaId, local_epoch: LocalEpoch) -> Self {
        let mut vector = Self::zeros(n);
        vector.0[local_id as usize] = local_epoch.get();
        vector
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, replica: ReplicaId) -> u64 {
        self.0[replica as usize]
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    /// Element-wise max merge. Both vectors must have the same length;
    /// callers validate this before merging (see `RecoveryError::MalformedAnswer`).
    pub fn merge(&mut self, other: &EpochVector) {
        debug_assert_eq!(self.0.len(), other.0.len());
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            *mine = (*mine).max(*theirs);
        }
    }
}

/// Outbound probe, re-sent on a timer until every addressed peer answers or
/// is explicitly stopped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoveryProbe {
    pub view: View,
    pub epoch: LocalEpoch,
}

/// Inbound reply to a `RecoveryProbe`. `next_id` is the sender's
/// `firstUncommitted` — the smallest Paxos instance id not yet decided there.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoveryAnswer {
    pub view: View,
    pub epoch_vector: EpochVector,
    pub next_id: u64,
}

/// Bookkeeping over the answers collected so far in the current gather round.
#[derive(Clone, Debug, Default)]
pub struct QuorumState {
    pub received: HashSet<ReplicaId>,
    pub answer_from_leader: Option<RecoveryAnswer>,
}

impl QuorumState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn view_leader_wraps_around_replica_count() {
        assert_eq!(View(0).leader(3), 0);
        assert_eq!(View(12).leader(3), 0);
        assert_eq!(View(13).leader(3), 1);
    }

    #[test]
    fn epoch_vector_merge_is_elementwise_max() {
        let mut a = EpochVector(vec![0, 8, 8]);
        let b = EpochVector(vec![8, 7, 9]);
        a.merge(&b);
        assert_eq!(a.as_slice(), &[8, 8, 9]);
    }

    #[test]
    fn epoch_vector_merge_is_commutative() {
        let a = EpochVector(vec![3, 0, 5]);
        let b = EpochVector(vec![1, 4, 5]);

        let mut a_then_b = a.clone();
        a_then_b.merge(&b);
        let mut b_then_a = b.clone();
        b_then_a.merge(&a);

        assert_eq!(a_then_b, b_then_a);
    }

    #[test]
    fn epoch_vector_merge_is_idempotent() {
        let mut a = EpochVector(vec![3, 0, 5]);
        let b = EpochVector(vec![1, 4, 5]);
        a.merge(&b);
        let once = a.clone();
        a.merge(&b);
        assert_eq!(a, once);
    }

    #[test]
    fn seeded_vector_has_only_local_slot_set() {
        let v = EpochVector::seeded(3, 1, LocalEpoch(8));
        assert_eq!(v.as_slice(), &[0, 8, 0]);
    }

    proptest! {
        #[test]
        fn merge_is_commutative_for_arbitrary_vectors(
            a in prop::collection::vec(0u64..1000, 4),
            b in prop::collection::vec(0u64..1000, 4),
        ) {
            let mut a_then_b = EpochVector(a.clone());
            a_then_b.merge(&EpochVector(b.clone()));
            let mut b_then_a = EpochVector(b);
            b_then_a.merge(&EpochVector(a));
            prop_assert_eq!(a_then_b, b_then_a);
        }

        #[test]
        fn merge_is_associative_for_arbitrary_vectors(
            a in prop::collection::vec(0u64..1000, 4),
            b in prop::collection::vec(0u64..1000, 4),
            c in prop::collection::vec(0u64..1000, 4),
        ) {
            let mut ab_then_c = EpochVector(a.clone());
            ab_then_c.merge(&EpochVector(b.clone()));
            ab_then_c.merge(&EpochVector(c.clone()));

            let mut bc = EpochVector(b);
            bc.merge(&EpochVector(c));
            let mut a_then_bc = EpochVector(a);
            a_then_bc.merge(&bc);

            prop_assert_eq!(ab_then_c, a_then_bc);
        }
    }
}
