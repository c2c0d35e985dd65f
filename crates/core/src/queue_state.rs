// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted queue document and result log.
//!
//! `QueueState` is the exact content of `mcp-operations.json` (minus the
//! checksum envelope the storage layer adds); `ResultsLog` is
//! `mcp-results.json`. Both peers read and write these, so the shapes
//! here are the wire contract.

use crate::conflict::Conflict;
use crate::id::{ConflictId, OperationId};
use crate::operation::{Operation, OperationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard cap on queued operations.
pub const MAX_QUEUE_SIZE: usize = 1000;
/// Result log keeps only the most recent entries.
pub const MAX_RESULTS: usize = 100;

/// Aggregate throughput counters carried inside the queue document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub total_processed: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub average_processing_time_ms: f64,
}

impl ProcessingStats {
    /// Fold one finished operation into the counters, keeping a running
    /// average.
    pub fn record(&mut self, success: bool, duration_ms: u64) {
        let prior_total = self.average_processing_time_ms * self.total_processed as f64;
        self.total_processed += 1;
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.average_processing_time_ms =
            (prior_total + duration_ms as f64) / self.total_processed as f64;
    }
}

/// The durable operation queue, persisted as `mcp-operations.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    /// Monotonically increasing; bumped on every persist.
    pub version: u64,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub processing_stats: ProcessingStats,
}

impl QueueState {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: 0,
            last_modified: now,
            operations: Vec::new(),
            conflicts: Vec::new(),
            processing_stats: ProcessingStats::default(),
        }
    }

    pub fn get(&self, id: &OperationId) -> Option<&Operation> {
        self.operations.iter().find(|op| &op.id == id)
    }

    pub fn get_mut(&mut self, id: &OperationId) -> Option<&mut Operation> {
        self.operations.iter_mut().find(|op| &op.id == id)
    }

    pub fn get_conflict(&self, id: &ConflictId) -> Option<&Conflict> {
        self.conflicts.iter().find(|c| &c.id == id)
    }

    pub fn get_conflict_mut(&mut self, id: &ConflictId) -> Option<&mut Conflict> {
        self.conflicts.iter_mut().find(|c| &c.id == id)
    }

    /// Count operations in each status:
    /// `(pending, in_progress, completed, failed, cancelled)`.
    pub fn status_counts(&self) -> (usize, usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0, 0);
        for op in &self.operations {
            match op.status {
                OperationStatus::Pending => counts.0 += 1,
                OperationStatus::InProgress => counts.1 += 1,
                OperationStatus::Completed => counts.2 += 1,
                OperationStatus::Failed => counts.3 += 1,
                OperationStatus::Cancelled => counts.4 += 1,
            }
        }
        counts
    }

    pub fn active_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| !c.is_resolved())
    }

    /// Every unresolved conflict referenced by `op` through
    /// `conflict_ids`.
    pub fn unresolved_conflicts_for(&self, op: &Operation) -> Vec<&Conflict> {
        op.conflict_ids
            .iter()
            .filter_map(|id| self.get_conflict(id))
            .filter(|c| !c.is_resolved())
            .collect()
    }

    /// Record a persist: bump the version and stamp the time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.last_modified = now;
    }
}

/// Terminal outcome of one operation, mirrored into `mcp-results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub operation_id: OperationId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflict_ids: Vec<ConflictId>,
}

/// Bounded result log, persisted as `mcp-results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsLog {
    #[serde(default)]
    pub results: Vec<OperationResult>,
    pub last_updated: DateTime<Utc>,
}

impl ResultsLog {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self { results: Vec::new(), last_updated: now }
    }

    /// Append a result, trimming the log to [`MAX_RESULTS`] newest
    /// entries.
    pub fn push(&mut self, result: OperationResult, now: DateTime<Utc>) {
        self.results.push(result);
        if self.results.len() > MAX_RESULTS {
            let excess = self.results.len() - MAX_RESULTS;
            self.results.drain(..excess);
        }
        self.last_updated = now;
    }
}

#[cfg(test)]
#[path = "queue_state_tests.rs"]
mod tests;
