// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable overrides for the broker.

use specforge_core::BrokerConfig;
use std::time::Duration;

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| match s.as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

/// Apply `SPECFORGE_*` overrides on top of the defaults.
pub fn apply_env_overrides(mut config: BrokerConfig) -> BrokerConfig {
    if let Some(ms) = env_u64("SPECFORGE_PROCESSING_INTERVAL_MS") {
        config.processing_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = env_u64("SPECFORGE_HEARTBEAT_INTERVAL_MS") {
        config.heartbeat_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = env_u64("SPECFORGE_CLEANUP_INTERVAL_MS") {
        config.cleanup_interval = Duration::from_millis(ms);
    }
    if let Some(hours) = env_u64("SPECFORGE_MAX_OPERATION_AGE_HOURS") {
        config.max_operation_age = Duration::from_secs(hours * 3600);
    }
    if let Some(n) = env_u64("SPECFORGE_MAX_QUEUE_SIZE") {
        config.max_queue_size = n as usize;
    }
    if let Some(ms) = env_u64("SPECFORGE_DEBOUNCE_MS") {
        config.debounce_window = Duration::from_millis(ms);
    }
    if let Some(enabled) = env_bool("SPECFORGE_BACKUPS_ENABLED") {
        config.file_ops.backup_enabled = enabled;
    }
    if let Some(n) = env_u64("SPECFORGE_MAX_BACKUPS") {
        config.file_ops.max_backups = n as u32;
    }
    if let Some(enabled) = env_bool("SPECFORGE_PRIORITY_PROCESSING") {
        config.priority_processing_enabled = enabled;
    }
    if let Some(enabled) = env_bool("SPECFORGE_CONFLICT_DETECTION") {
        config.conflict_detection_enabled = enabled;
    }
    if let Some(enabled) = env_bool("SPECFORGE_RETRY_FAILED") {
        config.retry_failed_operations = enabled;
    }
    if let Some(enabled) = env_bool("SPECFORGE_OPERATION_CACHING") {
        config.performance.operation_caching = enabled;
    }
    if let Some(enabled) = env_bool("SPECFORGE_BATCH_PROCESSING") {
        config.performance.batch_processing = enabled;
    }
    if let Some(enabled) = env_bool("SPECFORGE_WATCHER_DEBOUNCING") {
        config.performance.file_watcher_debouncing = enabled;
    }
    if let Some(enabled) = env_bool("SPECFORGE_MEMORY_OPTIMIZATION") {
        config.performance.memory_optimization = enabled;
    }
    config
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
