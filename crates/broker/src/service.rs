// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker service.
//!
//! One instance per workspace. All mutable state (queue, sync state,
//! signature gate, result log, timers) lives behind a single async
//! mutex, so the processing loop is cooperatively single-threaded;
//! suspension points are file I/O and timers only.

use crate::reconcile::reconcile_results;
use crate::watcher::{FileWatcher, WatchedFile};
use specforge_adapters::{NotifySink, RemoteDispatcher};
use specforge_core::{
    signature, BrokerConfig, BrokerError, Clock, Conflict, ConflictId, ErrorCode, IdGen,
    NanoIdGen, OperationFactory, OperationId, OperationIntent, OperationPayload,
    OperationPriority, OperationSource, QueueState, ResolutionStrategy, ResultsLog, SpecSyncInfo,
    SyncState,
};
use specforge_engine::{
    ConflictDetector, ConflictResolver, Executor, QueueCore, Scheduler, SignatureGate,
    TickOutcome,
};
use specforge_engine::dispatch::LocalDispatcher;
use specforge_materializer::{SpecManifest, SpecMaterializer, WorkspaceFs};
use specforge_storage::{BrokerPaths, ProtocolStore, StorageError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

const PROCESS_TIMER: &str = "process";
const HEARTBEAT_TIMER: &str = "heartbeat";
const MAINTENANCE_TIMER: &str = "maintenance";

/// Outcome of a submission: the id when accepted, or `queued: false`
/// when the signature gate dropped a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub operation_id: Option<OperationId>,
    pub queued: bool,
}

fn storage_err(e: StorageError) -> BrokerError {
    BrokerError::new(e.code(), e.to_string())
}

fn service_unavailable(message: &str) -> BrokerError {
    BrokerError::new(ErrorCode::ServiceUnavailable, message)
}

/// Everything guarded by the single state lock.
struct BrokerState<N: NotifySink, C: Clock> {
    queue: QueueCore,
    sync: SyncState,
    gate: SignatureGate,
    results: ResultsLog,
    scheduler: Scheduler,
    executor: Executor<N, C>,
}

/// Parts that only exist when the workspace validated at init.
struct Active<N: NotifySink, C: Clock> {
    store: ProtocolStore<C>,
    paths: BrokerPaths,
    materializer: SpecMaterializer<C>,
    factory: OperationFactory<C>,
    detector: ConflictDetector,
    state: Mutex<BrokerState<N, C>>,
}

/// The workspace-local operation broker.
pub struct Broker<N: NotifySink, C: Clock> {
    active: Option<Active<N, C>>,
    sink: N,
    clock: C,
    config: BrokerConfig,
    disposed: AtomicBool,
    processing: AtomicBool,
    wake: Notify,
}

impl<N: NotifySink, C: Clock> Broker<N, C> {
    /// Initialize against a workspace root. An invalid workspace or an
    /// unreadable protocol file leaves the broker initialized but
    /// inactive: every later call answers `SERVICE_UNAVAILABLE`.
    pub fn initialize(
        root: impl AsRef<Path>,
        config: BrokerConfig,
        sink: N,
        remote: Option<Arc<dyn RemoteDispatcher>>,
        clock: C,
    ) -> Self {
        Self::initialize_with_idgen(root, config, sink, remote, clock, Arc::new(NanoIdGen))
    }

    pub fn initialize_with_idgen(
        root: impl AsRef<Path>,
        config: BrokerConfig,
        sink: N,
        remote: Option<Arc<dyn RemoteDispatcher>>,
        clock: C,
        idgen: Arc<dyn IdGen>,
    ) -> Self {
        let active = match Self::activate(root.as_ref(), &config, &sink, remote, &clock, idgen) {
            Ok(active) => Some(active),
            Err(e) => {
                tracing::error!(error = %e, "broker initialization failed, service inactive");
                None
            }
        };
        Self {
            active,
            sink,
            clock,
            config,
            disposed: AtomicBool::new(false),
            processing: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    fn activate(
        root: &Path,
        config: &BrokerConfig,
        sink: &N,
        remote: Option<Arc<dyn RemoteDispatcher>>,
        clock: &C,
        idgen: Arc<dyn IdGen>,
    ) -> Result<Active<N, C>, StorageError> {
        let paths = BrokerPaths::new(root)?;
        paths.ensure_layout()?;
        let store = ProtocolStore::new(paths.clone(), &config.file_ops, clock.clone());
        store.cleanup_temp_files();

        let now = clock.now_utc();
        let mut queue = QueueCore::new(store.load_queue()?);
        let recovered = queue.recover_stale_in_progress(now, config.stale_in_progress_age);
        if recovered > 0 {
            tracing::warn!(recovered, "reverted operations abandoned by a previous session");
        }
        let mut gate = SignatureGate::new(config.dedup_recent_ttl);
        gate.rebuild(&queue.state().operations);

        let mut sync = store.load_sync_state()?;
        sync.extension_online = true;
        sync.recompute(queue.state());
        store.store_sync_state(&sync)?;

        let results = store.load_results()?;
        let materializer = SpecMaterializer::new(paths.specifications_dir(), clock.clone());
        let local = Arc::new(LocalDispatcher::new(
            materializer.clone(),
            WorkspaceFs::new(paths.root()),
        ));
        let executor = Executor::new(
            local,
            remote,
            sink.clone(),
            clock.clone(),
            idgen.clone(),
            config.clone(),
        );

        tracing::info!(root = %root.display(), "broker active");
        Ok(Active {
            store,
            paths,
            materializer,
            factory: OperationFactory::new(idgen.clone(), clock.clone()),
            detector: ConflictDetector::new(idgen),
            state: Mutex::new(BrokerState {
                queue,
                sync,
                gate,
                results,
                scheduler: Scheduler::new(),
                executor,
            }),
        })
    }

    fn active(&self) -> Result<&Active<N, C>, BrokerError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(service_unavailable("broker disposed"));
        }
        self.active
            .as_ref()
            .ok_or_else(|| service_unavailable("workspace failed validation at initialization"))
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some() && !self.disposed.load(Ordering::SeqCst)
    }

    // --- submission ---

    /// Queue an operation intent.
    ///
    /// Duplicates inside the signature window come back as
    /// `queued: false`; validation and capacity problems are errors.
    pub async fn submit(&self, intent: OperationIntent) -> Result<SubmitReceipt, BrokerError> {
        let active = self.active()?;
        let sig = signature(&intent.payload);
        let mut st = active.state.lock().await;

        if !st.gate.admit(&sig, self.clock.now()) {
            tracing::debug!(signature = %sig, "duplicate submission dropped");
            return Ok(SubmitReceipt { operation_id: None, queued: false });
        }

        let op = match active.factory.build(intent) {
            Ok(op) => op,
            Err(e) => {
                st.gate.forget(&sig);
                return Err(BrokerError::new(ErrorCode::ValidationError, e.to_string()));
            }
        };

        if st.queue.len() >= self.config.max_queue_size {
            st.queue.evict_terminal(self.config.max_queue_size, 1);
            if st.queue.len() >= self.config.max_queue_size {
                st.gate.forget(&sig);
                return Err(BrokerError::new(
                    ErrorCode::QueueFull,
                    format!("queue holds {} operations", st.queue.len()),
                ));
            }
        }

        let op_id = op.id.clone();
        let priority = op.priority;
        let now = self.clock.now_utc();

        let detected = if self.config.conflict_detection_enabled {
            let materializer = active.materializer.clone();
            active.detector.detect(
                &op,
                st.queue.state(),
                &move |spec_id| materializer.exists(spec_id),
                now,
            )
        } else {
            Vec::new()
        };

        st.queue.insert(op);

        let mut unresolved = Vec::new();
        let mut escalated = Vec::new();
        for mut conflict in detected {
            if !ConflictResolver::resolve(&mut conflict, st.queue.state_mut(), now) {
                unresolved.push(conflict.id.clone());
                escalated.push(conflict.clone());
            }
            tracing::warn!(
                conflict = %conflict.id,
                kind = %conflict.conflict_type,
                resolved = conflict.is_resolved(),
                "conflict detected at submission"
            );
            st.queue.state_mut().conflicts.push(conflict);
        }
        if !unresolved.is_empty() {
            if let Some(op) = st.queue.state_mut().get_mut(&op_id) {
                op.conflict_ids.extend(unresolved);
            }
        }
        // Duplicate auto-resolution may have cancelled the newcomer.
        if st.queue.state().get(&op_id).is_some_and(|op| op.is_terminal()) {
            st.gate.release(&sig, self.clock.now());
        }

        st.queue.state_mut().touch(now);
        active.store.store_queue(st.queue.state()).map_err(storage_err)?;
        {
            let BrokerState { queue, sync, .. } = &mut *st;
            sync.recompute(queue.state());
        }
        active.store.store_sync_state(&st.sync).map_err(storage_err)?;

        let immediate = priority >= OperationPriority::High
            && self.config.priority_processing_enabled;
        if immediate {
            st.scheduler.set_timer(PROCESS_TIMER, Duration::ZERO, self.clock.now());
        }
        drop(st);

        for conflict in &escalated {
            self.sink.on_conflict(conflict).await;
        }
        if immediate {
            self.wake.notify_one();
        }
        Ok(SubmitReceipt { operation_id: Some(op_id), queued: true })
    }

    // --- processing ---

    /// Run one guarded processing tick. Re-entrant calls while a tick
    /// is in flight return an empty outcome.
    pub async fn process_now(&self) -> Result<TickOutcome, BrokerError> {
        let active = self.active()?;
        if self.processing.swap(true, Ordering::SeqCst) {
            return Ok(TickOutcome::default());
        }

        let outcome = {
            let mut st = active.state.lock().await;
            let BrokerState { queue, gate, results, executor, sync, .. } = &mut *st;
            match executor.process(queue, gate, results, &active.store).await {
                Ok(outcome) => {
                    let now = self.clock.now_utc();
                    sync.performance.last_processing_duration_ms =
                        outcome.duration.as_millis() as u64;
                    let secs = outcome.duration.as_secs_f64().max(0.001);
                    let rate = outcome.processed as f64 / secs;
                    sync.performance.queue_processing_rate =
                        0.8 * sync.performance.queue_processing_rate + 0.2 * rate;
                    sync.recompute(queue.state());
                    sync.last_sync = Some(now);
                    if let Ok(manifests) = active.materializer.list() {
                        sync.specifications = manifests
                            .into_iter()
                            .map(|m| SpecSyncInfo {
                                spec_id: m.spec_id,
                                last_modified: m.updated_at,
                                version: m.version,
                                status: m.status.to_string(),
                            })
                            .collect();
                    }
                    active.store.store_sync_state(sync).map_err(storage_err)?;
                    Ok(outcome)
                }
                Err(e) => {
                    sync.push_error(e.to_string(), self.clock.now_utc());
                    let _ = active.store.store_sync_state(sync);
                    Err(storage_err(e))
                }
            }
        };

        self.processing.store(false, Ordering::SeqCst);
        outcome
    }

    /// Refresh `lastHeartbeat` and enqueue a `heartbeat` operation.
    pub async fn heartbeat(&self) -> Result<(), BrokerError> {
        let receipt = self
            .submit(
                OperationIntent::new(OperationPayload::Heartbeat)
                    .priority(OperationPriority::Low)
                    .source(OperationSource::Extension),
            )
            .await?;
        if !receipt.queued {
            tracing::debug!("previous heartbeat still in flight");
        }

        let active = self.active()?;
        let mut st = active.state.lock().await;
        st.sync.last_heartbeat = Some(self.clock.now_utc());
        active.store.store_sync_state(&st.sync).map_err(storage_err)?;
        Ok(())
    }

    /// Hourly cleanup: expired operations and conflicts, cache purge,
    /// orphaned temp files.
    pub async fn run_maintenance(&self) -> Result<(), BrokerError> {
        let active = self.active()?;
        let mut st = active.state.lock().await;
        let BrokerState { queue, executor, sync, .. } = &mut *st;
        executor.maintenance(queue, &active.store).map_err(storage_err)?;
        sync.recompute(queue.state());
        active.store.store_sync_state(sync).map_err(storage_err)?;
        Ok(())
    }

    // --- change handling (debounced watcher events land here) ---

    /// The peer rewrote `mcp-operations.json`: the on-disk queue is
    /// canonical. Reload it, rebuild the signature gate, and recompute
    /// counters.
    pub async fn reload_queue(&self) -> Result<(), BrokerError> {
        let active = self.active()?;
        let mut st = active.state.lock().await;
        let disk = match active.store.load_queue() {
            Ok(disk) => disk,
            Err(e) => {
                st.sync.push_error(e.to_string(), self.clock.now_utc());
                let _ = active.store.store_sync_state(&st.sync);
                return Err(storage_err(e));
            }
        };
        st.queue.replace(disk);
        st.queue
            .recover_stale_in_progress(self.clock.now_utc(), self.config.stale_in_progress_age);
        {
            let BrokerState { queue, gate, sync, .. } = &mut *st;
            gate.rebuild(&queue.state().operations);
            sync.recompute(queue.state());
        }
        active.store.store_sync_state(&st.sync).map_err(storage_err)?;
        tracing::debug!(version = st.queue.state().version, "queue reloaded from disk");
        Ok(())
    }

    /// The peer rewrote `specforge-sync.json`: adopt it, re-asserting
    /// our own liveness and recomputing the derivable counters.
    pub async fn reload_sync_state(&self) -> Result<(), BrokerError> {
        let active = self.active()?;
        let mut st = active.state.lock().await;
        let disk = active.store.load_sync_state().map_err(storage_err)?;
        let before = st.sync.clone();
        st.sync = disk;
        st.sync.extension_online = true;
        {
            let BrokerState { queue, sync, .. } = &mut *st;
            sync.recompute(queue.state());
        }
        st.sync.last_sync = before.last_sync.max(st.sync.last_sync);
        if st.sync != before {
            active.store.store_sync_state(&st.sync).map_err(storage_err)?;
        }
        Ok(())
    }

    /// The peer appended to `mcp-results.json`: fold matching results
    /// into the queue and keep only unreconciled entries on disk.
    pub async fn reconcile_results_file(&self) -> Result<usize, BrokerError> {
        let active = self.active()?;
        let mut st = active.state.lock().await;
        let mut disk = active.store.load_results().map_err(storage_err)?;
        let reconciled = reconcile_results(st.queue.state_mut(), &mut disk);
        if reconciled > 0 {
            st.results = disk.clone();
            st.queue.state_mut().touch(self.clock.now_utc());
            active.store.store_queue(st.queue.state()).map_err(storage_err)?;
            active.store.store_results(&disk).map_err(storage_err)?;
            st.sync.mcp_server_online = true;
            {
                let BrokerState { queue, sync, .. } = &mut *st;
                sync.recompute(queue.state());
            }
            active.store.store_sync_state(&st.sync).map_err(storage_err)?;
        } else {
            st.results = disk;
        }
        Ok(reconciled)
    }

    // --- introspection ---

    pub async fn sync_state(&self) -> Result<SyncState, BrokerError> {
        Ok(self.active()?.state.lock().await.sync.clone())
    }

    pub async fn operation_queue(&self) -> Result<QueueState, BrokerError> {
        Ok(self.active()?.state.lock().await.queue.state().clone())
    }

    pub async fn conflicts(&self) -> Result<Vec<Conflict>, BrokerError> {
        Ok(self.active()?.state.lock().await.queue.state().conflicts.clone())
    }

    pub fn list_specifications(&self) -> Result<Vec<SpecManifest>, BrokerError> {
        let active = self.active()?;
        active
            .materializer
            .list()
            .map_err(|e| BrokerError::new(e.code(), e.to_string()))
    }

    /// Resolve a conflict, either with an explicit strategy (recorded
    /// as resolved by the user) or by re-running the automatic
    /// resolver.
    pub async fn resolve_conflict(
        &self,
        conflict_id: &ConflictId,
        strategy: Option<ResolutionStrategy>,
    ) -> Result<bool, BrokerError> {
        let active = self.active()?;
        let mut st = active.state.lock().await;
        let now = self.clock.now_utc();

        let Some(index) =
            st.queue.state().conflicts.iter().position(|c| &c.id == conflict_id)
        else {
            return Err(BrokerError::new(
                ErrorCode::UnresolvedConflict,
                format!("no conflict {conflict_id}"),
            ));
        };
        let mut conflict = st.queue.state().conflicts[index].clone();

        let resolved = match strategy {
            Some(strategy) => {
                conflict.resolve(strategy, "user", now);
                true
            }
            None => ConflictResolver::resolve(&mut conflict, st.queue.state_mut(), now),
        };
        st.queue.state_mut().conflicts[index] = conflict;

        st.queue.state_mut().touch(now);
        active.store.store_queue(st.queue.state()).map_err(storage_err)?;
        {
            let BrokerState { queue, sync, .. } = &mut *st;
            sync.recompute(queue.state());
        }
        active.store.store_sync_state(&st.sync).map_err(storage_err)?;
        Ok(resolved)
    }

    /// Reload everything from disk, reconcile results, and run a tick.
    pub async fn force_sync(&self) -> Result<TickOutcome, BrokerError> {
        self.reload_queue().await?;
        self.reconcile_results_file().await?;
        self.process_now().await
    }

    // --- lifecycle ---

    /// Event loop: watcher events feed keyed debounce timers; the
    /// scheduler paces processing, heartbeats, and maintenance. Returns
    /// when [`Broker::dispose`] flips the flag.
    pub async fn run(&self) -> Result<(), BrokerError> {
        let active = self.active()?;
        let (watcher, mut events) = FileWatcher::start(&active.paths.vscode_dir())
            .map_err(|e| service_unavailable(&format!("file watcher failed: {e}")))?;

        {
            let mut st = active.state.lock().await;
            let now = self.clock.now();
            st.scheduler.set_timer(PROCESS_TIMER, self.config.processing_interval, now);
            st.scheduler.set_timer(HEARTBEAT_TIMER, self.config.heartbeat_interval, now);
            st.scheduler.set_timer(MAINTENANCE_TIMER, self.config.cleanup_interval, now);
        }

        while !self.disposed.load(Ordering::SeqCst) {
            let deadline = { active.state.lock().await.scheduler.next_deadline() };
            let sleep_for = deadline
                .map(|d| d.saturating_duration_since(self.clock.now()))
                .unwrap_or(Duration::from_secs(3600));

            tokio::select! {
                _ = self.wake.notified() => {}
                event = events.recv() => {
                    if let Some(key) = event {
                        self.debounce(active, key).await;
                    }
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }

            let fired = { active.state.lock().await.scheduler.fired_timers(self.clock.now()) };
            for key in fired {
                self.handle_timer(&key).await;
            }
        }

        drop(watcher);
        tracing::info!("broker run loop stopped");
        Ok(())
    }

    async fn debounce(&self, active: &Active<N, C>, key: WatchedFile) {
        let window = if self.config.performance.file_watcher_debouncing {
            self.config.debounce_window
        } else {
            Duration::ZERO
        };
        let mut st = active.state.lock().await;
        st.scheduler.set_timer(key.debounce_key(), window, self.clock.now());
    }

    async fn handle_timer(&self, key: &str) {
        let outcome: Result<(), BrokerError> = match key {
            PROCESS_TIMER => {
                let result = self.process_now().await.map(|_| ());
                self.rearm(PROCESS_TIMER, self.config.processing_interval).await;
                result
            }
            HEARTBEAT_TIMER => {
                let result = self.heartbeat().await;
                self.rearm(HEARTBEAT_TIMER, self.config.heartbeat_interval).await;
                result
            }
            MAINTENANCE_TIMER => {
                let result = self.run_maintenance().await;
                self.rearm(MAINTENANCE_TIMER, self.config.cleanup_interval).await;
                result
            }
            other => match WatchedFile::from_debounce_key(other) {
                Some(WatchedFile::Queue) => {
                    let result = self.reload_queue().await;
                    // Fresh external work may be eligible right away.
                    self.rearm(PROCESS_TIMER, Duration::ZERO).await;
                    result
                }
                Some(WatchedFile::State) => self.reload_sync_state().await,
                Some(WatchedFile::Results) => self.reconcile_results_file().await.map(|_| ()),
                None => Ok(()),
            },
        };
        if let Err(e) = outcome {
            tracing::warn!(timer = key, error = %e, "timer handler failed");
        }
    }

    async fn rearm(&self, key: &'static str, after: Duration) {
        if let Ok(active) = self.active() {
            let mut st = active.state.lock().await;
            st.scheduler.set_timer(key, after, self.clock.now());
        }
    }

    /// Stop accepting work, clear timers, and flush a final offline
    /// sync state. In-flight dispatch completes before the run loop
    /// exits.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.wake.notify_waiters();
        if let Some(active) = &self.active {
            let mut st = active.state.lock().await;
            st.scheduler.clear();
            st.sync.extension_online = false;
            {
                let BrokerState { queue, sync, .. } = &mut *st;
                sync.recompute(queue.state());
            }
            if let Err(e) = active.store.store_sync_state(&st.sync) {
                tracing::warn!(error = %e, "final sync-state flush failed");
            }
        }
        tracing::info!("broker disposed");
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
