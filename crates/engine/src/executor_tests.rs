// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::dispatch::LocalDispatcher;
use async_trait::async_trait;
use parking_lot::Mutex;
use specforge_adapters::{FakeNotifySink, FakeRemoteDispatcher, RemoteError, SinkCall};
use specforge_core::test_support::heartbeat_op;
use specforge_core::{
    FakeClock, OperationPayload, OperationPriority, QueueState, SeqIdGen,
};
use specforge_materializer::{SpecMaterializer, WorkspaceFs};
use specforge_storage::BrokerPaths;
use tempfile::{tempdir, TempDir};

/// Scripted dispatcher: pops outcomes per call, records dispatch order.
#[derive(Default)]
struct ScriptedDispatch {
    outcomes: Mutex<Vec<Result<serde_json::Value, DispatchError>>>,
    order: Mutex<Vec<String>>,
}

impl ScriptedDispatch {
    fn failing_times(n: usize, code: ErrorCode) -> Arc<Self> {
        let scripted = Self::default();
        let mut outcomes = Vec::new();
        for _ in 0..n {
            outcomes.push(Err(DispatchError::new(code, "induced failure")));
        }
        outcomes.reverse();
        *scripted.outcomes.lock() = outcomes;
        Arc::new(scripted)
    }

    fn order(&self) -> Vec<String> {
        self.order.lock().clone()
    }
}

#[async_trait]
impl Dispatch for ScriptedDispatch {
    async fn dispatch(&self, operation: &Operation) -> Result<serde_json::Value, DispatchError> {
        self.order.lock().push(operation.id.to_string());
        self.outcomes.lock().pop().unwrap_or(Ok(serde_json::json!({"ok": true})))
    }
}

struct Harness {
    _dir: TempDir,
    clock: FakeClock,
    queue: QueueCore,
    gate: SignatureGate,
    results: ResultsLog,
    store: ProtocolStore<FakeClock>,
    sink: FakeNotifySink,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let clock = FakeClock::new();
        let paths = BrokerPaths::new(dir.path()).unwrap();
        paths.ensure_layout().unwrap();
        let store =
            ProtocolStore::new(paths, &specforge_core::FileOpsConfig::default(), clock.clone());
        Self {
            _dir: dir,
            clock: clock.clone(),
            queue: QueueCore::new(QueueState::empty(clock.now_utc())),
            gate: SignatureGate::new(Duration::from_secs(10)),
            results: ResultsLog::empty(clock.now_utc()),
            store,
            sink: FakeNotifySink::new(),
        }
    }

    fn executor(&self, local: Arc<dyn Dispatch>) -> Executor<FakeNotifySink, FakeClock> {
        Executor::new(
            local,
            None,
            self.sink.clone(),
            self.clock.clone(),
            Arc::new(SeqIdGen::default()),
            BrokerConfig::default(),
        )
    }

    fn executor_with_remote(
        &self,
        local: Arc<dyn Dispatch>,
        remote: FakeRemoteDispatcher,
    ) -> Executor<FakeNotifySink, FakeClock> {
        Executor::new(
            local,
            Some(Arc::new(remote)),
            self.sink.clone(),
            self.clock.clone(),
            Arc::new(SeqIdGen::default()),
            BrokerConfig::default(),
        )
    }

    fn local_dispatcher(&self) -> Arc<dyn Dispatch> {
        let clock = self.clock.clone();
        let root = self._dir.path();
        Arc::new(LocalDispatcher::new(
            SpecMaterializer::new(root.join(".specifications"), clock),
            WorkspaceFs::new(root),
        ))
    }

    async fn tick(&mut self, executor: &mut Executor<FakeNotifySink, FakeClock>) -> TickOutcome {
        executor
            .process(&mut self.queue, &mut self.gate, &mut self.results, &self.store)
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn create_spec_completes_and_materializes() {
    let mut h = Harness::new();
    let mut executor = h.executor(h.local_dispatcher());

    h.queue.insert(specforge_core::test_support::create_spec_op("op_1", "User Auth"));
    let outcome = h.tick(&mut executor).await;

    assert_eq!(outcome.succeeded, 1);
    let op = h.queue.state().get(&OperationId::new("op_1")).unwrap();
    assert_eq!(op.status, OperationStatus::Completed);
    assert!(op.completed_at >= op.started_at);
    assert!(h._dir.path().join(".specifications/user-auth/spec.json").is_file());

    // Terminal result mirrored to the log with the spec id.
    assert_eq!(h.results.results.len(), 1);
    assert!(h.results.results[0].success);
    assert_eq!(h.results.results[0].data.as_ref().unwrap()["specId"], "user-auth");

    // Queue persisted with a bumped version.
    let on_disk = h.store.load_queue().unwrap();
    assert!(on_disk.version > 0);
    assert_eq!(h.sink.calls().iter().filter(|c| matches!(c, SinkCall::Success { .. })).count(), 1);
}

#[tokio::test]
async fn urgent_operations_dispatch_before_normal_ones() {
    let mut h = Harness::new();
    let scripted = Arc::new(ScriptedDispatch::default());
    let mut executor = h.executor(scripted.clone());

    let normal = Operation::builder()
        .id("op_normal")
        .payload(OperationPayload::FileDelete { path: "a.md".to_string() })
        .priority(OperationPriority::Normal)
        .build();
    let urgent = Operation::builder()
        .id("op_urgent")
        .payload(OperationPayload::FileDelete { path: "b.md".to_string() })
        .priority(OperationPriority::Urgent)
        .build();
    h.queue.insert(normal);
    h.queue.insert(urgent);

    h.tick(&mut executor).await;
    assert_eq!(scripted.order(), vec!["op_urgent", "op_normal"]);
}

#[tokio::test]
async fn retry_schedule_follows_exponential_backoff() {
    let mut h = Harness::new();
    let scripted = ScriptedDispatch::failing_times(4, ErrorCode::DiskFull);
    let mut executor = h.executor(scripted);

    h.queue.insert(heartbeat_op("op_retry", OperationPriority::Normal));

    let mut delays = Vec::new();
    for _ in 0..3 {
        let before = h.clock.now_utc();
        h.tick(&mut executor).await;
        let op = h.queue.state().get(&OperationId::new("op_retry")).unwrap().clone();
        assert_eq!(op.status, OperationStatus::Pending);
        let delay = (op.next_retry_at.unwrap() - before).num_milliseconds();
        delays.push(delay);
        h.clock.advance(Duration::from_millis(delay as u64 + 1));
    }

    // ~1s, ~2s, ~4s within the jitter bound.
    assert!((1_000..1_500).contains(&delays[0]), "first delay {}", delays[0]);
    assert!((2_000..2_500).contains(&delays[1]), "second delay {}", delays[1]);
    assert!((4_000..4_500).contains(&delays[2]), "third delay {}", delays[2]);
    assert!(delays.windows(2).all(|w| w[1] + 500 >= w[0]));

    // Fourth failure exhausts the budget.
    let outcome = h.tick(&mut executor).await;
    assert_eq!(outcome.failed, 1);
    let op = h.queue.state().get(&OperationId::new("op_retry")).unwrap();
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.retry_count, op.max_retries);
    assert!(h.results.results.iter().any(|r| !r.success));
}

#[tokio::test]
async fn non_retryable_failures_settle_immediately() {
    let mut h = Harness::new();
    let scripted = ScriptedDispatch::failing_times(1, ErrorCode::SpecExists);
    let mut executor = h.executor(scripted);

    h.queue.insert(specforge_core::test_support::create_spec_op("op_dup", "User Auth"));
    let outcome = h.tick(&mut executor).await;

    assert_eq!(outcome.failed, 1);
    let op = h.queue.state().get(&OperationId::new("op_dup")).unwrap();
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.retry_count, 0);
    assert_eq!(h.sink.failures().len(), 1);
}

#[tokio::test]
async fn permission_denied_records_an_escalated_conflict() {
    let mut h = Harness::new();
    let scripted = ScriptedDispatch::failing_times(1, ErrorCode::PermissionDenied);
    let mut executor = h.executor(scripted);

    h.queue.insert(Operation::builder()
        .id("op_locked")
        .payload(OperationPayload::FileWrite {
            path: "locked.md".to_string(),
            content: "x".to_string(),
        })
        .build());
    h.tick(&mut executor).await;

    let conflicts = &h.queue.state().conflicts;
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflict_type, ConflictType::PermissionDenied);
    assert!(!conflicts[0].is_resolved());
    assert_eq!(conflicts[0].resource_path, "file:locked.md");

    let op = h.queue.state().get(&OperationId::new("op_locked")).unwrap();
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.conflict_ids, vec![conflicts[0].id.clone()]);
    assert!(h.sink.calls().iter().any(|c| matches!(c, SinkCall::Conflict { .. })));
}

#[tokio::test]
async fn heartbeat_results_are_served_from_cache() {
    let mut h = Harness::new();
    let scripted = Arc::new(ScriptedDispatch::default());
    let mut executor = h.executor(scripted.clone());

    h.queue.insert(heartbeat_op("op_hb1", OperationPriority::Normal));
    h.tick(&mut executor).await;
    assert_eq!(scripted.order().len(), 1);

    // An identical heartbeat a moment later hits the cache.
    h.clock.advance(Duration::from_secs(15));
    h.gate.purge(h.clock.now());
    h.queue.insert(heartbeat_op("op_hb2", OperationPriority::Normal));
    h.tick(&mut executor).await;

    assert_eq!(scripted.order().len(), 1, "second heartbeat must not dispatch");
    let op = h.queue.state().get(&OperationId::new("op_hb2")).unwrap();
    assert_eq!(op.status, OperationStatus::Completed);
    assert_eq!(op.actual_duration_ms, Some(0));
}

#[tokio::test]
async fn liveness_operations_route_to_an_available_remote() {
    let mut h = Harness::new();
    let scripted = Arc::new(ScriptedDispatch::default());
    let remote = FakeRemoteDispatcher::new();
    let mut executor = h.executor_with_remote(scripted.clone(), remote.clone());

    h.queue.insert(heartbeat_op("op_hb", OperationPriority::Normal));
    h.tick(&mut executor).await;

    assert_eq!(remote.dispatched(), vec!["op_hb"]);
    assert!(scripted.order().is_empty());
}

#[tokio::test]
async fn unavailable_remote_falls_back_to_local() {
    let mut h = Harness::new();
    let scripted = Arc::new(ScriptedDispatch::default());
    let remote = FakeRemoteDispatcher::new();
    remote.set_available(false);
    let mut executor = h.executor_with_remote(scripted.clone(), remote.clone());

    h.queue.insert(heartbeat_op("op_hb", OperationPriority::Normal));
    h.tick(&mut executor).await;

    assert!(remote.dispatched().is_empty());
    assert_eq!(scripted.order(), vec!["op_hb"]);
}

#[tokio::test]
async fn remote_failures_are_retryable() {
    let mut h = Harness::new();
    let remote = FakeRemoteDispatcher::new();
    remote.push_outcome(Err(RemoteError::Failed("connection reset".to_string())));
    let scripted = Arc::new(ScriptedDispatch::default());
    let mut executor = h.executor_with_remote(scripted, remote);

    h.queue.insert(heartbeat_op("op_hb", OperationPriority::Normal));
    let outcome = h.tick(&mut executor).await;

    assert_eq!(outcome.retried, 1);
    let op = h.queue.state().get(&OperationId::new("op_hb")).unwrap();
    assert_eq!(op.status, OperationStatus::Pending);
    assert_eq!(op.retry_count, 1);
    assert!(op.next_retry_at.is_some());
}

#[tokio::test]
async fn processing_stats_accumulate_across_ticks() {
    let mut h = Harness::new();
    let scripted = Arc::new(ScriptedDispatch::default());
    let mut executor = h.executor(scripted);

    h.queue.insert(Operation::builder()
        .id("op_a")
        .payload(OperationPayload::FileDelete { path: "a.md".to_string() })
        .build());
    h.queue.insert(Operation::builder()
        .id("op_b")
        .payload(OperationPayload::FileDelete { path: "b.md".to_string() })
        .build());
    h.tick(&mut executor).await;

    let stats = &h.queue.state().processing_stats;
    assert_eq!(stats.total_processed, 2);
    assert_eq!(stats.success_count, 2);
    assert_eq!(stats.failure_count, 0);
}

#[tokio::test]
async fn maintenance_expires_old_terminal_operations() {
    let mut h = Harness::new();
    let mut executor = h.executor(Arc::new(ScriptedDispatch::default()));

    let mut old = heartbeat_op("op_old", OperationPriority::Normal);
    old.mark_started(h.clock.now_utc());
    old.mark_completed(serde_json::json!({}), h.clock.now_utc());
    h.queue.insert(old);

    h.clock.advance(Duration::from_secs(25 * 3600));
    executor.maintenance(&mut h.queue, &h.store).unwrap();

    assert!(h.queue.is_empty());
}
