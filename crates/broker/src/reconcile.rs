// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result reconciliation.
//!
//! The peer mirrors outcomes for operations it executed into
//! `mcp-results.json`. Each entry that settles a still-open queued
//! operation is folded back into the queue (status, error, duration,
//! conflicts) and removed from the log. Entries with no matching open
//! operation stay put: they are either the broker's own mirror of a
//! terminal outcome or addressed to the peer.

use specforge_core::{OperationStatus, QueueState, ResultsLog};

/// Fold matching results into the queue. Returns how many entries were
/// reconciled (and removed from the log).
pub fn reconcile_results(queue: &mut QueueState, results: &mut ResultsLog) -> usize {
    let mut reconciled = 0;

    results.results.retain(|result| {
        let Some(op) = queue.get_mut(&result.operation_id) else {
            return true;
        };
        if op.is_terminal() {
            return true;
        }

        if result.success {
            op.status = OperationStatus::Completed;
            op.result = result.data.clone();
            op.error = None;
        } else {
            op.status = OperationStatus::Failed;
            op.error = result.error.clone();
        }
        if op.started_at.is_none() {
            op.started_at = Some(result.completed_at);
        }
        op.completed_at = Some(result.completed_at);
        if result.duration_ms.is_some() {
            op.actual_duration_ms = result.duration_ms;
        }
        for conflict_id in &result.conflict_ids {
            if !op.conflict_ids.contains(conflict_id) {
                op.conflict_ids.push(conflict_id.clone());
            }
        }

        reconciled += 1;
        false
    });

    if reconciled > 0 {
        tracing::debug!(reconciled, remaining = results.results.len(), "reconciled peer results");
    }
    reconciled
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
