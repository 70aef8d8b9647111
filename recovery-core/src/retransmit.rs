//! Reference `Retransmitter` implementation. Not required by embedders —
//! `RecoveryNetwork::Retransmitter` can be backed by whatever transport the
//! embedding system already has — but provided for tests and as a
//! reasonable default.
//!
//! Each targeted peer gets its own `tokio` task looping on a fixed cadence;
//! `stop_peer` aborts exactly that task via `futures::future::AbortHandle`,
//! the same primitive `experimental::commit_reliable_broadcast::DropGuard`
//! wraps for the ack-tracking side of reliable broadcast in this repository.

use crate::{
    model::{RecoveryProbe, ReplicaId},
    network::{ProbeSender, Retransmitter},
};
use futures::future::{abortable, AbortHandle};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tokio_retry::strategy::FixedInterval;

pub struct TokioRetransmitter {
    handles: Mutex<HashMap<ReplicaId, AbortHandle>>,
}

impl TokioRetransmitter {
    /// Starts resending `probe` to every id in `targets` on `cadence`,
    /// using `sender` to perform the actual send.
    pub fn start<S>(
        sender: Arc<S>,
        probe: RecoveryProbe,
        targets: HashSet<ReplicaId>,
        cadence: Duration,
    ) -> Self
    where
        S: ProbeSender + 'static,
    {
        let mut handles = HashMap::with_capacity(targets.len());
        for peer in targets {
            let sender = sender.clone();
            let probe = probe.clone();
            let (future, abort_handle) = abortable(Self::retransmit_loop(sender, peer, probe, cadence));
            tokio::spawn(future);
            handles.insert(peer, abort_handle);
        }
        Self {
            handles: Mutex::new(handles),
        }
    }

    async fn retransmit_loop<S: ProbeSender>(
        sender: Arc<S>,
        peer: ReplicaId,
        probe: RecoveryProbe,
        cadence: Duration,
    ) {
        let mut intervals = FixedInterval::new(cadence);
        loop {
            sender.send_probe(peer, &probe).await;
            let delay = intervals.next().unwrap_or(cadence);
            tokio::time::sleep(delay).await;
        }
    }
}

impl Retransmitter for TokioRetransmitter {
    fn stop_peer(&self, peer: ReplicaId) {
        if let Some(handle) = self.handles.lock().remove(&peer) {
            handle.abort();
        }
    }

    fn stop_all(&self) {
        for (_, handle) in self.handles.lock().drain() {
            handle.abort();
        }
    }
}
