//! The top-level recovery state machine: bootstrap -> probe -> quorum ->
//! catch-up -> live.

use crate::{
    catchup::{CatchUpClient, CatchUpOutcome, CatchUpSubscriptionId},
    error::RecoveryError,
    logging::{self, RecoveryEvent},
    model::{LocalEpoch, QuorumState, RecoveryAnswer, RecoveryProbe, ReplicaId},
    network::{RecoveryNetwork, RecoveryObserver, RecoveryRequestHandler, Retransmitter},
    quorum::QuorumGatherer,
    storage::PaxosVolatileState,
};
use parking_lot::RwLock;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorState {
    Bootstrapping,
    Probing,
    AwaitingLeader,
    CatchingUp,
    Live,
}

/// Channel capacity for the internal event queues. Generous relative to
/// `n` so a burst of simultaneous replies from every peer never blocks a
/// network-facing caller of `install_recovery_answer_listener`.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Orchestrates a single replica's recovery. Generic over the network and
/// catch-up contracts so this crate has no compile-time dependency on a
/// concrete transport or catch-up engine.
pub struct RecoveryCoordinator<N, C>
where
    N: RecoveryNetwork,
    C: CatchUpClient,
{
    local_id: ReplicaId,
    n: usize,
    local_epoch: LocalEpoch,
    storage: Arc<RwLock<PaxosVolatileState>>,
    network: Arc<N>,
    catchup: Arc<C>,
    request_handler: Arc<dyn RecoveryRequestHandler>,
    observer: Arc<dyn RecoveryObserver>,

    state: CoordinatorState,
    quorum: QuorumState,
    retransmitter: Option<N::Retransmitter>,
    catchup_sub: Option<CatchUpSubscriptionId>,
    catchup_target: u64,
    catchup_tx: Option<mpsc::Sender<CatchUpOutcome>>,
}

impl<N, C> RecoveryCoordinator<N, C>
where
    N: RecoveryNetwork,
    C: CatchUpClient,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local_id: ReplicaId,
        n: usize,
        storage: Arc<RwLock<PaxosVolatileState>>,
        local_epoch: LocalEpoch,
        network: Arc<N>,
        catchup: Arc<C>,
        request_handler: Arc<dyn RecoveryRequestHandler>,
        observer: Arc<dyn RecoveryObserver>,
    ) -> Self {
        Self {
            local_id,
            n,
            local_epoch,
            storage,
            network,
            catchup,
            request_handler,
            observer,
            state: CoordinatorState::Bootstrapping,
            quorum: QuorumState::new(),
            retransmitter: None,
            catchup_sub: None,
            catchup_target: 0,
            catchup_tx: None,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Returns the shared Paxos volatile storage built during bootstrap.
    /// Stands in for the source's `getPaxos()` — the Paxos engine proper is
    /// out of scope, so what the recovery core actually owns and can hand
    /// back is the storage it seeded.
    pub fn storage_handle(&self) -> Arc<RwLock<PaxosVolatileState>> {
        self.storage.clone()
    }

    /// Drives the coordinator from `Bootstrapping` to `Live`. Consumes and
    /// returns `self` so the caller keeps ownership once recovery
    /// completes; any error is fatal per the error handling design.
    pub async fn run(mut self) -> Result<Self, RecoveryError> {
        if self.local_epoch.is_first_boot() {
            logging::log(RecoveryEvent::FirstBoot, self.local_id, self.local_epoch);
            self.enter_live();
            return Ok(self);
        }

        // With no peers, a strict majority is self alone: there is nobody to
        // probe and nobody to wait on, so recovery completes immediately
        // regardless of the epoch value (the epoch is still bumped above,
        // in `StorageBootstrap`, before this point is ever reached).
        if self.n == 1 {
            logging::log(RecoveryEvent::SingleReplicaEnsemble, self.local_id, self.local_epoch);
            self.enter_live();
            return Ok(self);
        }

        let (answer_tx, mut answer_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.network.install_recovery_answer_listener(answer_tx);
        self.broadcast_probe()?;

        let (catchup_tx, mut catchup_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.catchup_tx = Some(catchup_tx);

        while self.state != CoordinatorState::Live {
            tokio::select! {
                Some((sender, answer)) = answer_rx.recv() => {
                    self.handle_answer(sender, answer)?;
                }
                Some(outcome) = catchup_rx.recv(), if self.state == CoordinatorState::CatchingUp => {
                    self.handle_catchup_outcome(outcome)?;
                }
                else => break,
            }
        }

        Ok(self)
    }

    fn broadcast_probe(&mut self) -> Result<(), RecoveryError> {
        let view = self.storage.read().view;
        let probe = RecoveryProbe {
            view,
            epoch: self.local_epoch,
        };
        let targets = self.peers_except_self();
        let retransmitter = self.network.start_retransmitting(probe, targets).map_err(|_| {
            RecoveryError::RetransmitterFailure {
                leader: self.local_id,
                reason: "failed to broadcast initial recovery probe".to_string(),
            }
        })?;
        self.retransmitter = Some(retransmitter);
        self.state = CoordinatorState::Probing;
        logging::log(RecoveryEvent::ProbeBroadcast, self.local_id, self.local_epoch);
        Ok(())
    }

    fn peers_except_self(&self) -> HashSet<ReplicaId> {
        (0..self.n as u64).filter(|&id| id != self.local_id).collect()
    }

    /// Implements the absorb semantics of §4.3: reject stale replies,
    /// merge the epoch vector and view into storage, then delegate
    /// majority/leader bookkeeping to `QuorumGatherer` and drive the state
    /// transition table.
    fn handle_answer(&mut self, sender: ReplicaId, answer: RecoveryAnswer) -> Result<(), RecoveryError> {
        if answer.epoch_vector.len() != self.n {
            logging::log(
                RecoveryEvent::AnswerDiscardedMalformed,
                self.local_id,
                self.local_epoch,
            );
            return Ok(());
        }
        if answer.epoch_vector.get(self.local_id) != self.local_epoch.get() {
            logging::log(RecoveryEvent::AnswerDiscardedStale, self.local_id, self.local_epoch);
            return Ok(());
        }

        {
            let mut storage = self.storage.write();
            storage.epoch_vector.merge(&answer.epoch_vector);
            if answer.view > storage.view {
                storage.view = answer.view;
            }
        }

        QuorumGatherer::absorb(&mut self.quorum, sender, &answer, self.n);
        if let Some(retransmitter) = &self.retransmitter {
            retransmitter.stop_peer(sender);
        }

        match self.state {
            CoordinatorState::Probing => {
                if QuorumGatherer::is_quorum(&self.quorum, self.n) {
                    match QuorumGatherer::leader_answer(&self.quorum).cloned() {
                        Some(leader_answer) => self.begin_catchup(leader_answer.next_id),
                        None => self.narrow_to_leader()?,
                    }
                }
            }
            CoordinatorState::AwaitingLeader => {
                if let Some(leader_answer) = QuorumGatherer::leader_answer(&self.quorum).cloned() {
                    self.begin_catchup(leader_answer.next_id);
                }
            }
            CoordinatorState::Bootstrapping
            | CoordinatorState::CatchingUp
            | CoordinatorState::Live => {}
        }

        Ok(())
    }

    /// Quorum was reached without the leader among the answerers: stop the
    /// broadcast retransmission and unicast-retry the probe to the leader
    /// implied by the merged (maximum) view, per the redesign note
    /// resolving the multi-view disagreement open question. The
    /// `RecoveryAnswer` listener stays installed throughout — narrowing
    /// only changes who the retransmitter targets, not whether the
    /// coordinator is still listening for replies.
    fn narrow_to_leader(&mut self) -> Result<(), RecoveryError> {
        logging::log(RecoveryEvent::QuorumReachedWithoutLeader, self.local_id, self.local_epoch);
        let (leader, view) = {
            let storage = self.storage.read();
            (storage.view.leader(self.n), storage.view)
        };
        if let Some(retransmitter) = self.retransmitter.take() {
            retransmitter.stop_all();
        }

        let probe = RecoveryProbe {
            view,
            epoch: self.local_epoch,
        };
        let mut targets = HashSet::new();
        targets.insert(leader);
        let retransmitter = self
            .network
            .start_retransmitting(probe, targets)
            .map_err(|_| RecoveryError::RetransmitterFailure {
                leader,
                reason: "failed to narrow retransmission to the apparent leader".to_string(),
            })?;
        self.retransmitter = Some(retransmitter);

        self.state = CoordinatorState::AwaitingLeader;
        logging::log(RecoveryEvent::NarrowedToLeader, self.local_id, self.local_epoch);
        Ok(())
    }

    fn begin_catchup(&mut self, target_next_id: u64) {
        self.network.uninstall_recovery_answer_listener();
        if let Some(retransmitter) = self.retransmitter.take() {
            retransmitter.stop_all();
        }

        self.catchup_target = target_next_id;
        let tx = self
            .catchup_tx
            .clone()
            .expect("catch-up channel is installed before probing begins");
        self.catchup_sub = Some(self.catchup.register(target_next_id, tx));
        self.state = CoordinatorState::CatchingUp;
        logging::log(RecoveryEvent::CatchUpStarted, self.local_id, self.local_epoch);
    }

    fn handle_catchup_outcome(&mut self, outcome: CatchUpOutcome) -> Result<(), RecoveryError> {
        if outcome.first_uncommitted >= self.catchup_target {
            if let Some(sub) = self.catchup_sub.take() {
                self.catchup
                    .deregister(sub)
                    .map_err(|e| RecoveryError::CatchUpDeregisterFailure(e.0))?;
            }
            self.enter_live();
        } else {
            logging::log(RecoveryEvent::CatchUpUnderrun, self.local_id, self.local_epoch);
            if let Some(sub) = self.catchup_sub {
                self.catchup.force_catchup(sub);
            }
        }
        Ok(())
    }

    fn enter_live(&mut self) {
        self.network
            .install_recovery_request_handler(self.request_handler.clone());
        self.state = CoordinatorState::Live;
        logging::log(RecoveryEvent::RecoveryFinished, self.local_id, self.local_epoch);
        self.observer.on_recovery_finished();
    }
}
