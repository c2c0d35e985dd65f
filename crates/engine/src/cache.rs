// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result cache for read-only operations.
//!
//! Only `sync_status` and `heartbeat` results are cacheable. Every
//! other operation type mutates the tree, and serving a stale mutation
//! result would break the create/delete laws. Entries expire after a
//! TTL; when the cache is full the least-hit entry is evicted.

use specforge_core::{OperationPayload, OperationType};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cache key for a payload, or `None` when the type is not cacheable.
pub fn cache_key(payload: &OperationPayload) -> Option<String> {
    match payload.op_type() {
        OperationType::SyncStatus | OperationType::Heartbeat => {
            // serde_json maps are ordered, so params serialize
            // canonically.
            let params = serde_json::to_value(payload)
                .ok()
                .and_then(|v| v.get("params").cloned())
                .unwrap_or(serde_json::Value::Null);
            Some(format!("{}:{params}", payload.op_type()))
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    inserted: Instant,
    hits: u64,
}

/// TTL + least-hit bounded cache of dispatch results.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { entries: HashMap::new(), ttl, max_entries }
    }

    /// Look up a fresh entry, counting the hit.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<serde_json::Value> {
        let entry = self.entries.get_mut(key)?;
        if now.duration_since(entry.inserted) >= self.ttl {
            self.entries.remove(key);
            return None;
        }
        entry.hits += 1;
        Some(entry.value.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value, now: Instant) {
        self.purge_expired(now);
        if self.entries.len() >= self.max_entries {
            // Evict the least-hit entry; ties broken by age.
            let victim = self
                .entries
                .iter()
                .min_by(|a, b| {
                    a.1.hits.cmp(&b.1.hits).then_with(|| a.1.inserted.cmp(&b.1.inserted))
                })
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }
        self.entries.insert(key.into(), CacheEntry { value, inserted: now, hits: 0 });
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| now.duration_since(e.inserted) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
