// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-owned sync state, persisted as `specforge-sync.json`.
//!
//! The counters are always derivable from the queue; `recompute` is the
//! single place that derives them, so every persisted snapshot satisfies
//! the counting invariant.

use crate::queue_state::QueueState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ring size for recent sync errors.
pub const MAX_SYNC_ERRORS: usize = 10;

/// Per-spec entry mirrored from the materialized spec manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSyncInfo {
    pub spec_id: String,
    pub last_modified: DateTime<Utc>,
    pub version: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// Rolling performance figures for the processing loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub average_operation_time_ms: f64,
    /// Operations completed per processing tick, smoothed.
    pub queue_processing_rate: f64,
    pub last_processing_duration_ms: u64,
}

/// Broker view of peer liveness, queue counters, and recent errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub extension_online: bool,
    pub mcp_server_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub pending_operations: usize,
    pub in_progress_operations: usize,
    pub completed_operations: usize,
    pub failed_operations: usize,
    pub cancelled_operations: usize,
    pub active_conflicts: usize,
    #[serde(default)]
    pub specifications: Vec<SpecSyncInfo>,
    #[serde(default)]
    pub sync_errors: Vec<SyncErrorEntry>,
    #[serde(default)]
    pub performance: PerformanceMetrics,
}

impl SyncState {
    pub fn offline() -> Self {
        Self {
            extension_online: false,
            mcp_server_online: false,
            last_sync: None,
            last_heartbeat: None,
            pending_operations: 0,
            in_progress_operations: 0,
            completed_operations: 0,
            failed_operations: 0,
            cancelled_operations: 0,
            active_conflicts: 0,
            specifications: Vec::new(),
            sync_errors: Vec::new(),
            performance: PerformanceMetrics::default(),
        }
    }

    /// Derive every counter from the queue. Idempotent: applying twice
    /// with the same queue yields the same state. `lastSync` is stamped
    /// by the processing loop, not here, so that adopting a peer's
    /// snapshot without changes never forces a rewrite.
    pub fn recompute(&mut self, queue: &QueueState) {
        let (pending, in_progress, completed, failed, cancelled) = queue.status_counts();
        self.pending_operations = pending;
        self.in_progress_operations = in_progress;
        self.completed_operations = completed;
        self.failed_operations = failed;
        self.cancelled_operations = cancelled;
        self.active_conflicts = queue.active_conflicts().count();
        self.performance.average_operation_time_ms =
            queue.processing_stats.average_processing_time_ms;
    }

    /// Append to the bounded error ring, evicting the oldest entry.
    pub fn push_error(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.sync_errors.push(SyncErrorEntry { timestamp: now, error: error.into() });
        if self.sync_errors.len() > MAX_SYNC_ERRORS {
            let excess = self.sync_errors.len() - MAX_SYNC_ERRORS;
            self.sync_errors.drain(..excess);
        }
    }
}

#[cfg(test)]
#[path = "sync_state_tests.rs"]
mod tests;
