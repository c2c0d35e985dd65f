// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory queue core.
//!
//! Wraps the persisted [`QueueState`] with ordered insertion,
//! eligibility selection, and the cleanup policies. Ordering is
//! deterministic everywhere: priority descending, then creation
//! timestamp ascending, then id ascending.

use chrono::{DateTime, Utc};
use specforge_core::{Operation, OperationId, OperationStatus, QueueState};
use std::cmp::Ordering;
use std::time::Duration;

/// Operation queue with the executor-facing behaviors.
#[derive(Debug)]
pub struct QueueCore {
    state: QueueState,
}

fn queue_order(a: &Operation, b: &Operation) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| a.id.cmp(&b.id))
}

impl QueueCore {
    pub fn new(state: QueueState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut QueueState {
        &mut self.state
    }

    pub fn into_state(self) -> QueueState {
        self.state
    }

    /// Replace the in-memory state with a reloaded on-disk snapshot.
    /// The on-disk queue is canonical after an external rewrite.
    pub fn replace(&mut self, state: QueueState) {
        self.state = state;
    }

    pub fn len(&self) -> usize {
        self.state.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.operations.is_empty()
    }

    /// Insert preserving queue order.
    pub fn insert(&mut self, op: Operation) {
        let at = self
            .state
            .operations
            .partition_point(|existing| queue_order(existing, &op) != Ordering::Greater);
        self.state.operations.insert(at, op);
    }

    /// Whether every dependency of `op` has completed. A dependency id
    /// that no longer exists counts as completed, since expiry only ever
    /// removes terminal operations.
    pub fn dependencies_completed(&self, op: &Operation) -> bool {
        op.dependencies.iter().all(|dep| {
            self.state.get(dep).is_none_or(|d| d.status == OperationStatus::Completed)
        })
    }

    /// Whether every conflict referenced by `op` is resolved. A missing
    /// conflict record counts as resolved, since cleanup only removes
    /// resolved conflicts.
    pub fn conflicts_resolved(&self, op: &Operation) -> bool {
        op.conflict_ids
            .iter()
            .all(|id| self.state.get_conflict(id).is_none_or(|c| c.is_resolved()))
    }

    /// Operations eligible for dispatch at `now`, in queue order:
    /// pending, dependencies completed, conflicts resolved, retry
    /// window open.
    pub fn eligible_ids(&self, now: DateTime<Utc>) -> Vec<OperationId> {
        let mut eligible: Vec<&Operation> = self
            .state
            .operations
            .iter()
            .filter(|op| {
                op.status == OperationStatus::Pending
                    && op.retry_window_open(now)
                    && self.dependencies_completed(op)
                    && self.conflicts_resolved(op)
            })
            .collect();
        eligible.sort_by(|a, b| queue_order(a, b));
        eligible.into_iter().map(|op| op.id.clone()).collect()
    }

    /// Evict the oldest terminal operations until at least
    /// `needed_free` slots are open under `max_size`. Returns how many
    /// were evicted.
    pub fn evict_terminal(&mut self, max_size: usize, needed_free: usize) -> usize {
        let target = max_size.saturating_sub(needed_free);
        let mut terminal: Vec<(DateTime<Utc>, OperationId)> = self
            .state
            .operations
            .iter()
            .filter(|op| op.is_terminal())
            .map(|op| (op.completed_at.unwrap_or(op.timestamp), op.id.clone()))
            .collect();
        terminal.sort();

        let mut evicted = 0;
        for (_, id) in terminal {
            if self.state.operations.len() <= target {
                break;
            }
            self.state.operations.retain(|op| op.id != id);
            evicted += 1;
        }
        evicted
    }

    /// Drop completed operations older than `age` once the queue grows
    /// past `threshold` entries.
    pub fn compress(&mut self, now: DateTime<Utc>, age: Duration, threshold: usize) -> usize {
        if self.state.operations.len() <= threshold {
            return 0;
        }
        let cutoff = now - chrono::TimeDelta::milliseconds(age.as_millis() as i64);
        let before = self.state.operations.len();
        self.state.operations.retain(|op| {
            !(op.status == OperationStatus::Completed
                && op.completed_at.is_some_and(|at| at < cutoff))
        });
        before - self.state.operations.len()
    }

    /// Expire terminal operations older than `max_age`.
    pub fn expire_operations(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let cutoff = now - chrono::TimeDelta::milliseconds(max_age.as_millis() as i64);
        let before = self.state.operations.len();
        self.state
            .operations
            .retain(|op| !(op.is_terminal() && op.completed_at.is_some_and(|at| at < cutoff)));
        before - self.state.operations.len()
    }

    /// Expire resolved conflicts older than `max_age`.
    pub fn expire_conflicts(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let cutoff = now - chrono::TimeDelta::milliseconds(max_age.as_millis() as i64);
        let before = self.state.conflicts.len();
        self.state
            .conflicts
            .retain(|c| !(c.resolved_at.is_some_and(|at| at < cutoff)));
        before - self.state.conflicts.len()
    }

    /// Revert `in_progress` operations whose attempt started more than
    /// `max_age` ago: a crashed tick never finished them. The attempt
    /// counts against the retry budget.
    pub fn recover_stale_in_progress(&mut self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let cutoff = now - chrono::TimeDelta::milliseconds(max_age.as_millis() as i64);
        let mut recovered = 0;
        for op in &mut self.state.operations {
            if op.status == OperationStatus::InProgress
                && op.started_at.is_some_and(|at| at < cutoff)
            {
                if op.retries_remaining() {
                    op.revert_for_retry("abandoned by interrupted processing", now);
                } else {
                    op.mark_failed("abandoned by interrupted processing", now);
                }
                recovered += 1;
            }
        }
        recovered
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
