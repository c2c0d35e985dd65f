// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signature dedup gate.
//!
//! Two sets instead of one map: a pending-set for signatures of
//! operations still in flight, and a recent-set with a TTL for
//! signatures that just finished. Membership checks stay cheap during
//! submission bursts, and a resubmission right after completion is
//! still refused.

use specforge_core::Operation;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Admission control keyed by operation signature.
#[derive(Debug)]
pub struct SignatureGate {
    pending: HashSet<String>,
    recent: HashMap<String, Instant>,
    recent_ttl: Duration,
}

impl SignatureGate {
    pub fn new(recent_ttl: Duration) -> Self {
        Self { pending: HashSet::new(), recent: HashMap::new(), recent_ttl }
    }

    /// Rebuild the pending-set from a reloaded queue. The recent-set is
    /// deliberately dropped: the on-disk queue is canonical.
    pub fn rebuild(&mut self, operations: &[Operation]) {
        self.pending =
            operations.iter().filter(|op| !op.is_terminal()).map(signature_of).collect();
        self.recent.clear();
    }

    /// Try to admit `signature`. Refused while an identical operation
    /// is in flight or finished less than the TTL ago; admission
    /// reserves the signature in the pending-set.
    pub fn admit(&mut self, signature: &str, now: Instant) -> bool {
        self.purge(now);
        if self.pending.contains(signature) {
            return false;
        }
        if let Some(finished) = self.recent.get(signature) {
            if now.duration_since(*finished) < self.recent_ttl {
                return false;
            }
        }
        self.pending.insert(signature.to_string());
        true
    }

    /// Move a signature from pending to recent once its operation
    /// reaches a terminal status.
    pub fn release(&mut self, signature: &str, now: Instant) {
        if self.pending.remove(signature) {
            self.recent.insert(signature.to_string(), now);
        }
    }

    /// Drop a reservation without starting the recent window (used when
    /// an admitted submission fails validation or capacity checks).
    pub fn forget(&mut self, signature: &str) {
        self.pending.remove(signature);
    }

    /// Evict recent entries older than the TTL.
    pub fn purge(&mut self, now: Instant) {
        let ttl = self.recent_ttl;
        self.recent.retain(|_, finished| now.duration_since(*finished) < ttl);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn signature_of(op: &Operation) -> String {
    specforge_core::signature(&op.payload)
}

#[cfg(test)]
#[path = "dedup_tests.rs"]
mod tests;
