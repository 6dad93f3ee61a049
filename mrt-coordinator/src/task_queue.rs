//! Thread-safe pending/in-flight/failed tracking of segments with a
//! bounded-retry policy.
//!
//! Every segment id is in exactly one of pending, in-flight, failed or
//! completed at any time; all transitions happen under one lock. A
//! [`Lease`] is a move-only value owned by exactly one session, so a
//! segment attempt can be concluded only once.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use common::error::ExchangeError;

use crate::splitter::Segment;

/// One segment claimed for one attempt.
#[derive(Debug)]
pub struct Lease {
    pub segment: Arc<Segment>,
    pub attempt: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Arc<Segment>>,
    in_flight: HashSet<u64>,
    /// Cumulative attempt count per segment id.
    attempts: HashMap<u64, u32>,
    failed: BTreeMap<u64, String>,
    completed: HashSet<u64>,
}

#[derive(Debug, Clone)]
pub struct QueueStats {
    pub total: usize,
    pub completed: usize,
    pub failed: BTreeMap<u64, String>,
}

#[derive(Debug)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    /// Fired on every transition that can change the exhaustion answer,
    /// so the accept loop blocks instead of polling.
    wakeup: Notify,
    max_retries: u32,
    total: usize,
}

impl TaskQueue {
    pub fn new(segments: Vec<Segment>, max_retries: u32) -> Self {
        let total = segments.len();
        let state = QueueState {
            pending: segments.into_iter().map(Arc::new).collect(),
            ..QueueState::default()
        };
        Self {
            state: Mutex::new(state),
            wakeup: Notify::new(),
            max_retries,
            total,
        }
    }

    /// Non-blocking FIFO claim of the next pending segment.
    ///
    /// Returns `None` when nothing is pending; that is the idle-worker
    /// rejection case, not an error, and it mutates nothing.
    pub async fn try_claim(&self) -> Option<Lease> {
        let mut state = self.state.lock().await;
        let segment = state.pending.pop_front()?;
        let attempt = state.attempts.entry(segment.id).or_insert(0);
        *attempt += 1;
        let attempt = *attempt;
        state.in_flight.insert(segment.id);
        Some(Lease { segment, attempt })
    }

    /// Mark the leased segment done; it is never reconsidered.
    pub async fn complete(&self, lease: Lease) {
        {
            let mut state = self.state.lock().await;
            state.in_flight.remove(&lease.segment.id);
            state.completed.insert(lease.segment.id);
        }
        debug!(segment = lease.segment.id, "segment completed");
        self.wakeup.notify_one();
    }

    /// Requeue the leased segment at the tail, or mark it permanently
    /// failed once its attempts reach the retry bound.
    ///
    /// Requeueing at the tail lets retries interleave with fresh work,
    /// so one bad segment cannot block the head of the queue.
    pub async fn fail(&self, lease: Lease, reason: &ExchangeError) {
        let id = lease.segment.id;
        let requeued = {
            let mut state = self.state.lock().await;
            state.in_flight.remove(&id);
            if lease.attempt < self.max_retries {
                state.pending.push_back(lease.segment);
                true
            } else {
                state.failed.insert(id, format!("{}: {reason}", reason.kind()));
                false
            }
        };
        if requeued {
            info!(
                segment = id,
                attempt = lease.attempt,
                %reason,
                "attempt failed, segment requeued"
            );
        } else {
            warn!(
                segment = id,
                attempts = lease.attempt,
                %reason,
                "segment failed permanently, giving up"
            );
        }
        self.wakeup.notify_one();
    }

    /// True once nothing is pending and nothing is in flight.
    ///
    /// A segment being retried is not pending at that instant but is not
    /// done either, so pending emptiness alone is not enough.
    pub async fn is_exhausted(&self) -> bool {
        let state = self.state.lock().await;
        state.pending.is_empty() && state.in_flight.is_empty()
    }

    /// Wait until some queue transition may have changed the exhaustion
    /// answer.
    pub async fn changed(&self) {
        self.wakeup.notified().await;
    }

    pub async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;
        QueueStats {
            total: self.total,
            completed: state.completed.len(),
            failed: state.failed.clone(),
        }
    }
}
