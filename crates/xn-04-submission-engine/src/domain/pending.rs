//! Pending Submission Store
//!
//! Maps correlation ids to in-flight submissions and the channel their
//! outcome is delivered on.
//!
//! Flow:
//! 1. `submit` calls `register()` and hands the receiver to the caller
//! 2. The driver task advances the record with `set_state()` / `set_handle()`
//! 3. The driver calls `complete()` exactly once with the outcome
//! 4. The caller awaits the receiver, or abandons it with `cancel()`

use crate::domain::outcome::SubmissionOutcome;
use crate::domain::state::SubmissionState;
use dashmap::DashMap;
use serde::Serialize;
use shared_types::{AccountAddress, CorrelationId, SubmissionHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use xn_03_operation_codec::{EventKind, OperationKind};

/// Snapshot of one in-flight submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSubmission {
    pub id: CorrelationId,
    pub kind: OperationKind,
    pub submitter: AccountAddress,
    pub expected_event: EventKind,
    /// Set once the node accepted the extrinsic.
    pub handle: Option<SubmissionHandle>,
    pub state: SubmissionState,
    #[serde(skip)]
    pub created_at: Instant,
}

impl PendingSubmission {
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

struct Entry {
    record: PendingSubmission,
    sender: oneshot::Sender<SubmissionOutcome>,
}

/// Lifetime counters.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    pub total_resolved: AtomicU64,
    pub total_failed: AtomicU64,
    /// Abandoned by the caller, or completed after the caller went away.
    pub total_cancelled: AtomicU64,
}

impl PendingStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            registered: self.total_registered.load(Ordering::Relaxed),
            resolved: self.total_resolved.load(Ordering::Relaxed),
            failed: self.total_failed.load(Ordering::Relaxed),
            cancelled: self.total_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `PendingStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub registered: u64,
    pub resolved: u64,
    pub failed: u64,
    pub cancelled: u64,
}

/// In-flight submissions keyed by correlation id.
#[derive(Default)]
pub struct PendingSubmissionStore {
    pending: DashMap<CorrelationId, Entry>,
    stats: PendingStats,
}

impl PendingSubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a submission in `Building` and get the receiver its outcome
    /// will arrive on.
    pub fn register(
        &self,
        kind: OperationKind,
        submitter: AccountAddress,
    ) -> (CorrelationId, oneshot::Receiver<SubmissionOutcome>) {
        let id = CorrelationId::new();
        let (sender, rx) = oneshot::channel();

        let record = PendingSubmission {
            id,
            kind,
            submitter,
            expected_event: kind.expected_event(),
            handle: None,
            state: SubmissionState::Building,
            created_at: Instant::now(),
        };
        self.pending.insert(id, Entry { record, sender });
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(correlation_id = %id, %kind, "Registered submission");
        (id, rx)
    }

    /// Record a state transition. Returns false if `id` is no longer pending.
    pub fn set_state(&self, id: &CorrelationId, state: SubmissionState) -> bool {
        match self.pending.get_mut(id) {
            Some(mut entry) => {
                entry.record.state = state;
                true
            }
            None => false,
        }
    }

    pub fn set_handle(&self, id: &CorrelationId, handle: SubmissionHandle) -> bool {
        match self.pending.get_mut(id) {
            Some(mut entry) => {
                entry.record.handle = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Deliver the outcome and forget the submission.
    ///
    /// Only the first call for an id delivers anything. Returns false if the
    /// id was unknown or the caller had already gone away.
    pub fn complete(&self, id: &CorrelationId, outcome: SubmissionOutcome) -> bool {
        let Some((_, entry)) = self.pending.remove(id) else {
            debug!(correlation_id = %id, "Outcome for unknown or finished submission");
            return false;
        };

        let resolved = outcome.is_ok();
        let elapsed = entry.record.age();
        match entry.sender.send(outcome) {
            Ok(()) => {
                let counter = if resolved {
                    &self.stats.total_resolved
                } else {
                    &self.stats.total_failed
                };
                counter.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %id,
                    kind = %entry.record.kind,
                    resolved,
                    elapsed_ms = elapsed.as_millis(),
                    "Submission completed"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                warn!(correlation_id = %id, "Submission completed after caller went away");
                false
            }
        }
    }

    /// Forget a submission without delivering anything.
    pub fn cancel(&self, id: &CorrelationId) -> bool {
        if self.pending.remove(id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %id, "Submission cancelled");
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn get(&self, id: &CorrelationId) -> Option<PendingSubmission> {
        self.pending.get(id).map(|entry| entry.record.clone())
    }

    /// All in-flight submissions, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PendingSubmission> {
        let mut records: Vec<_> = self
            .pending
            .iter()
            .map(|entry| entry.record.clone())
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    #[must_use]
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}
