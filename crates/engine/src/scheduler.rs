// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed timer wheel.
//!
//! The broker paces everything (processing ticks, heartbeats,
//! maintenance, per-file watcher debouncing) through one polled
//! scheduler. Setting a timer under an existing key replaces its
//! deadline, which is exactly the debounce behavior the watcher needs.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Polled collection of named deadlines.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: HashMap<String, Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the timer `key` to fire `after` from `now`.
    pub fn set_timer(&mut self, key: impl Into<String>, after: Duration, now: Instant) {
        self.timers.insert(key.into(), now + after);
    }

    pub fn cancel_timer(&mut self, key: &str) {
        self.timers.remove(key);
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    /// Earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().min().copied()
    }

    /// Remove and return the keys of every timer due at `now`, ordered
    /// by deadline.
    pub fn fired_timers(&mut self, now: Instant) -> Vec<String> {
        let mut due: Vec<(String, Instant)> = self
            .timers
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(k, d)| (k.clone(), *d))
            .collect();
        due.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        for (key, _) in &due {
            self.timers.remove(key);
        }
        due.into_iter().map(|(key, _)| key).collect()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
