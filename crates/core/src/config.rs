// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker configuration, loaded once at init.

use std::time::Duration;

/// Atomic file-write options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOpsConfig {
    pub backup_enabled: bool,
    pub max_backups: u32,
    /// Hard timeout for the advisory per-file write lock.
    pub lock_timeout: Duration,
}

impl Default for FileOpsConfig {
    fn default() -> Self {
        Self { backup_enabled: true, max_backups: 5, lock_timeout: Duration::from_secs(5) }
    }
}

/// Optional performance behaviors; all enabled by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceToggles {
    pub batch_processing: bool,
    pub file_watcher_debouncing: bool,
    pub operation_caching: bool,
    pub memory_optimization: bool,
}

impl Default for PerformanceToggles {
    fn default() -> Self {
        Self {
            batch_processing: true,
            file_watcher_debouncing: true,
            operation_caching: true,
            memory_optimization: true,
        }
    }
}

/// Process-wide broker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub processing_interval: Duration,
    pub heartbeat_interval: Duration,
    pub cleanup_interval: Duration,
    /// Terminal operations older than this are expired by maintenance.
    pub max_operation_age: Duration,
    pub max_queue_size: usize,
    pub priority_processing_enabled: bool,
    pub conflict_detection_enabled: bool,
    pub retry_failed_operations: bool,
    pub file_ops: FileOpsConfig,
    pub performance: PerformanceToggles,
    /// Window for coalescing file-watcher events per key.
    pub debounce_window: Duration,
    /// Age bound for the signature recent-set.
    pub dedup_recent_ttl: Duration,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    /// Completed operations older than this are dropped when the queue
    /// grows past the compression threshold.
    pub compression_age: Duration,
    pub compression_threshold: usize,
    /// `in_progress` operations older than this on reload are treated
    /// as abandoned by a crashed tick and revert to pending.
    pub stale_in_progress_age: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_millis(5_000),
            heartbeat_interval: Duration::from_millis(30_000),
            cleanup_interval: Duration::from_millis(3_600_000),
            max_operation_age: Duration::from_secs(24 * 3600),
            max_queue_size: crate::queue_state::MAX_QUEUE_SIZE,
            priority_processing_enabled: true,
            conflict_detection_enabled: true,
            retry_failed_operations: true,
            file_ops: FileOpsConfig::default(),
            performance: PerformanceToggles::default(),
            debounce_window: Duration::from_millis(250),
            dedup_recent_ttl: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 500,
            compression_age: Duration::from_secs(2 * 3600),
            compression_threshold: 200,
            stale_in_progress_age: Duration::from_secs(600),
        }
    }
}
