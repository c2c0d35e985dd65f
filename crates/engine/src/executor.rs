// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The processing tick.
//!
//! One tick drains the eligible set in queue order: mark in-progress,
//! persist, dispatch, then settle. An operation settles as completed
//! with a result record, reverted to pending with a backoff window, or
//! terminally failed. Errors on one operation never stop the batch.

use crate::cache::{cache_key, ResultCache};
use crate::dedup::SignatureGate;
use crate::dispatch::{Dispatch, DispatchError};
use crate::queue::QueueCore;
use specforge_adapters::{NotifySink, RemoteDispatcher};
use specforge_core::signature::resource_path;
use specforge_core::{
    retry, BrokerConfig, Clock, Conflict, ConflictId, ConflictSeverity, ConflictType, ErrorCode,
    IdGen, Operation, OperationId, OperationResult, OperationStatus, OperationType, ResultsLog,
};
use specforge_storage::{ProtocolStore, StorageError};
use std::sync::Arc;
use std::time::Duration;

/// What one processing tick did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retried: usize,
    pub duration: Duration,
}

/// Dispatches eligible operations and settles their outcomes.
pub struct Executor<N: NotifySink, C: Clock> {
    local: Arc<dyn Dispatch>,
    remote: Option<Arc<dyn RemoteDispatcher>>,
    sink: N,
    clock: C,
    idgen: Arc<dyn IdGen>,
    cache: ResultCache,
    config: BrokerConfig,
}

impl<N: NotifySink, C: Clock> Executor<N, C> {
    pub fn new(
        local: Arc<dyn Dispatch>,
        remote: Option<Arc<dyn RemoteDispatcher>>,
        sink: N,
        clock: C,
        idgen: Arc<dyn IdGen>,
        config: BrokerConfig,
    ) -> Self {
        let cache = ResultCache::new(config.cache_ttl, config.cache_max_entries);
        Self { local, remote, sink, clock, idgen, cache, config }
    }

    pub fn cache(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    /// Run one tick over the queue. Persists the queue after every
    /// status transition and appends terminal results to the log.
    pub async fn process(
        &mut self,
        queue: &mut QueueCore,
        gate: &mut SignatureGate,
        results: &mut ResultsLog,
        store: &ProtocolStore<C>,
    ) -> Result<TickOutcome, StorageError> {
        let tick_started = self.clock.now();
        let mut outcome = TickOutcome::default();

        for id in queue.eligible_ids(self.clock.now_utc()) {
            // A resolver or reconciliation step may have settled this
            // operation earlier in the same batch.
            let Some(op) = queue.state().get(&id).cloned() else { continue };
            if op.status != OperationStatus::Pending {
                continue;
            }
            let sig = specforge_core::signature(&op.payload);

            if self.config.performance.operation_caching {
                if let Some(hit) = self.cache_lookup(&op) {
                    self.settle_from_cache(queue, gate, results, &id, &sig, hit);
                    outcome.processed += 1;
                    outcome.succeeded += 1;
                    continue;
                }
            }

            if let Some(running) = queue.state_mut().get_mut(&id) {
                running.mark_started(self.clock.now_utc());
            }
            self.persist(queue, store)?;

            let attempt_started = self.clock.now();
            let dispatched = self.route(&op).await;
            let duration_ms = self.clock.now().duration_since(attempt_started).as_millis() as u64;
            outcome.processed += 1;

            match dispatched {
                Ok(data) => {
                    self.settle_success(queue, gate, results, &id, &sig, data, duration_ms).await;
                    outcome.succeeded += 1;
                }
                Err(error) => {
                    let terminal = self
                        .settle_failure(queue, gate, results, &id, &sig, error, duration_ms)
                        .await;
                    if terminal {
                        outcome.failed += 1;
                    } else {
                        outcome.retried += 1;
                    }
                }
            }
            self.persist(queue, store)?;
        }

        store.store_results(results)?;
        outcome.duration = self.clock.now().duration_since(tick_started);
        tracing::info!(
            processed = outcome.processed,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            retried = outcome.retried,
            elapsed_ms = outcome.duration.as_millis() as u64,
            "processing tick finished"
        );
        Ok(outcome)
    }

    fn persist(&self, queue: &mut QueueCore, store: &ProtocolStore<C>) -> Result<(), StorageError> {
        queue.state_mut().touch(self.clock.now_utc());
        store.store_queue(queue.state())
    }

    /// Type-based routing: liveness operations prefer the remote
    /// endpoint when it is reachable, everything else runs locally.
    async fn route(&self, op: &Operation) -> Result<serde_json::Value, DispatchError> {
        let remote_eligible =
            matches!(op.op_type(), OperationType::Heartbeat | OperationType::SyncStatus);
        if remote_eligible {
            if let Some(remote) = &self.remote {
                if remote.is_available() {
                    return remote.dispatch(op).await.map_err(DispatchError::from);
                }
            }
        }
        self.local.dispatch(op).await
    }

    fn cache_lookup(&mut self, op: &Operation) -> Option<serde_json::Value> {
        let key = cache_key(&op.payload)?;
        self.cache.get(&key, self.clock.now())
    }

    fn settle_from_cache(
        &mut self,
        queue: &mut QueueCore,
        gate: &mut SignatureGate,
        results: &mut ResultsLog,
        id: &OperationId,
        sig: &str,
        hit: serde_json::Value,
    ) {
        let now = self.clock.now_utc();
        if let Some(op) = queue.state_mut().get_mut(id) {
            op.mark_started(now);
            op.mark_completed(hit.clone(), now);
            op.actual_duration_ms = Some(0);
        }
        gate.release(sig, self.clock.now());
        queue.state_mut().processing_stats.record(true, 0);
        results.push(
            OperationResult {
                operation_id: id.clone(),
                success: true,
                data: Some(hit),
                error: None,
                duration_ms: Some(0),
                completed_at: now,
                conflict_ids: Vec::new(),
            },
            now,
        );
        tracing::debug!(op = %id, "served from result cache");
    }

    async fn settle_success(
        &mut self,
        queue: &mut QueueCore,
        gate: &mut SignatureGate,
        results: &mut ResultsLog,
        id: &OperationId,
        sig: &str,
        data: serde_json::Value,
        duration_ms: u64,
    ) {
        let now = self.clock.now_utc();
        if let Some(op) = queue.state_mut().get_mut(id) {
            op.mark_completed(data.clone(), now);
        }
        gate.release(sig, self.clock.now());
        queue.state_mut().processing_stats.record(true, duration_ms);

        let Some(op) = queue.state().get(id).cloned() else { return };
        if self.config.performance.operation_caching {
            if let Some(key) = cache_key(&op.payload) {
                self.cache.insert(key, data.clone(), self.clock.now());
            }
        }
        let result = OperationResult {
            operation_id: id.clone(),
            success: true,
            data: Some(data),
            error: None,
            duration_ms: Some(duration_ms),
            completed_at: now,
            conflict_ids: op.conflict_ids.clone(),
        };
        self.sink.on_success(&op, &result).await;
        results.push(result, now);
    }

    /// Settle a dispatch failure. Returns `true` when the failure is
    /// terminal.
    async fn settle_failure(
        &mut self,
        queue: &mut QueueCore,
        gate: &mut SignatureGate,
        results: &mut ResultsLog,
        id: &OperationId,
        sig: &str,
        error: DispatchError,
        duration_ms: u64,
    ) -> bool {
        let now = self.clock.now_utc();

        if error.code == ErrorCode::PermissionDenied {
            self.record_permission_conflict(queue, id, now).await;
        }

        let Some(op) = queue.state().get(id).cloned() else { return true };
        let retry_allowed = self.config.retry_failed_operations
            && error.retryable()
            && op.retries_remaining();

        if retry_allowed {
            let delay = retry::backoff(id, op.retry_count);
            let next_retry_at = now + chrono::TimeDelta::milliseconds(delay.as_millis() as i64);
            if let Some(op) = queue.state_mut().get_mut(id) {
                op.revert_for_retry(error.to_string(), next_retry_at);
            }
            tracing::warn!(
                op = %id,
                error = %error,
                retry_in_ms = delay.as_millis() as u64,
                "operation failed, retry scheduled"
            );
        } else {
            if let Some(op) = queue.state_mut().get_mut(id) {
                op.mark_failed(error.to_string(), now);
            }
            gate.release(sig, self.clock.now());
            queue.state_mut().processing_stats.record(false, duration_ms);
            results.push(
                OperationResult {
                    operation_id: id.clone(),
                    success: false,
                    data: None,
                    error: Some(error.to_string()),
                    duration_ms: Some(duration_ms),
                    completed_at: now,
                    conflict_ids: op.conflict_ids.clone(),
                },
                now,
            );
            tracing::error!(op = %id, error = %error, "operation failed terminally");
        }

        if let Some(op) = queue.state().get(id) {
            self.sink.on_failure(op, &error.message).await;
        }
        !retry_allowed
    }

    /// Record an escalated `permission_denied` conflict against the
    /// operation and tell the sink.
    async fn record_permission_conflict(
        &mut self,
        queue: &mut QueueCore,
        id: &OperationId,
        now: chrono::DateTime<chrono::Utc>,
    ) {
        let Some(op) = queue.state().get(id).cloned() else { return };
        let conflict = Conflict::new(
            ConflictId::generate(self.idgen.as_ref()),
            ConflictType::PermissionDenied,
            vec![id.clone()],
            resource_path(&op.payload),
            format!("the filesystem refused a write for operation {id}"),
            ConflictSeverity::Critical,
            now,
        );
        if let Some(op) = queue.state_mut().get_mut(id) {
            op.conflict_ids.push(conflict.id.clone());
        }
        self.sink.on_conflict(&conflict).await;
        queue.state_mut().conflicts.push(conflict);
    }

    /// Hourly maintenance: expire old terminal operations and resolved
    /// conflicts, purge cache entries, and clear orphaned temp files.
    pub fn maintenance(
        &mut self,
        queue: &mut QueueCore,
        store: &ProtocolStore<C>,
    ) -> Result<(), StorageError> {
        let now = self.clock.now_utc();
        let expired_ops = queue.expire_operations(now, self.config.max_operation_age);
        let expired_conflicts = queue.expire_conflicts(now, self.config.max_operation_age);
        let compressed = if self.config.performance.memory_optimization {
            queue.compress(now, self.config.compression_age, self.config.compression_threshold)
        } else {
            0
        };
        let purged = self.cache.purge_expired(self.clock.now());
        let temps = store.cleanup_temp_files();

        if expired_ops + expired_conflicts + compressed + purged + temps > 0 {
            tracing::info!(
                expired_ops,
                expired_conflicts,
                compressed,
                cache_purged = purged,
                temp_files = temps,
                "maintenance pass"
            );
            self.persist(queue, store)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
