// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry-timing math.
//!
//! Failed retryable operations wait `base × 2^retry_count + jitter`
//! milliseconds before the next attempt, capped at one minute. Jitter is
//! derived from the operation id and attempt number rather than a RNG,
//! which keeps the schedule reproducible under test while still spreading
//! retries from distinct operations apart.

use crate::id::OperationId;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Base delay for the first retry.
pub const BASE_BACKOFF_MS: u64 = 1_000;
/// Ceiling for any computed delay.
pub const MAX_BACKOFF_MS: u64 = 60_000;
/// Jitter is drawn from `[0, BASE_BACKOFF_MS / 2)`.
pub const JITTER_RANGE_MS: u64 = BASE_BACKOFF_MS / 2;

/// Deterministic jitter in `[0, JITTER_RANGE_MS)` for a given attempt.
pub fn jitter_ms(id: &OperationId, retry_count: u32) -> u64 {
    let digest = Sha256::digest(format!("{id}:{retry_count}").as_bytes());
    let word = u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ]);
    word % JITTER_RANGE_MS
}

/// Delay before the attempt following failure number `retry_count`
/// (zero-based: the first failure uses `retry_count = 0`).
pub fn backoff(id: &OperationId, retry_count: u32) -> Duration {
    let exp = BASE_BACKOFF_MS.saturating_mul(1u64 << retry_count.min(16));
    let delay = exp.saturating_add(jitter_ms(id, retry_count)).min(MAX_BACKOFF_MS);
    Duration::from_millis(delay)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
