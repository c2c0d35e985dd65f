// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry schedules and crash recovery.

use crate::specs::support::{create_spec, update_requirements, world, world_with_config};
use specforge_adapters::FakeNotifySink;
use specforge_broker::Broker;
use specforge_core::{
    BrokerConfig, Clock, FakeClock, OperationStatus, SeqIdGen,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn failed_spec_update_is_not_retried_when_non_retryable() {
    let w = world();
    // No spec exists and no creator is queued, so the conflict
    // escalates; resolve it manually to let the update run and fail.
    let receipt = w.broker.submit(update_requirements("ghost", "# R")).await.unwrap();
    let conflict_id = w.broker.conflicts().await.unwrap()[0].id.clone();
    w.broker
        .resolve_conflict(&conflict_id, Some(specforge_core::ResolutionStrategy::Escalate))
        .await
        .unwrap();

    w.broker.process_now().await.unwrap();

    let queue = w.broker.operation_queue().await.unwrap();
    let op = queue.get(receipt.operation_id.as_ref().unwrap()).unwrap();
    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.retry_count, 0);
    assert!(op.error.as_deref().unwrap_or_default().contains("SPEC_NOT_FOUND"));

    let results = w.read_json(".vscode/mcp-results.json");
    assert_eq!(results["results"][0]["success"], false);
}

#[tokio::test]
async fn stale_in_progress_operations_recover_on_restart() {
    let dir;
    let clock = FakeClock::new();
    {
        let w = world();
        w.broker.submit(create_spec("User Auth")).await.unwrap();

        // Simulate a crash mid-tick: rewrite the queue with the
        // operation stuck in_progress.
        let mut queue = w.broker.operation_queue().await.unwrap();
        queue.operations[0].status = OperationStatus::InProgress;
        queue.operations[0].started_at = Some(w.clock.now_utc());
        let paths = specforge_storage::BrokerPaths::new(w.dir.path()).unwrap();
        let store = specforge_storage::ProtocolStore::new(
            paths,
            &specforge_core::FileOpsConfig::default(),
            w.clock.clone(),
        );
        queue.touch(w.clock.now_utc());
        store.store_queue(&queue).unwrap();
        dir = w.dir;
    }

    // A fresh broker 11 minutes later reverts the orphan to pending.
    clock.advance(Duration::from_secs(11 * 60));
    let broker = Broker::initialize_with_idgen(
        dir.path(),
        BrokerConfig::default(),
        FakeNotifySink::new(),
        None,
        clock.clone(),
        Arc::new(SeqIdGen::default()),
    );

    let queue = broker.operation_queue().await.unwrap();
    assert_eq!(queue.operations[0].status, OperationStatus::Pending);
    assert_eq!(queue.operations[0].retry_count, 1);

    // And the recovered operation completes on the next tick.
    broker.process_now().await.unwrap();
    assert!(dir.path().join(".specifications/user-auth").is_dir());
}

#[tokio::test]
async fn heartbeat_keeps_flowing_while_a_conflict_blocks_one_operation() {
    let w = world();
    w.broker.submit(update_requirements("ghost", "# blocked")).await.unwrap();
    w.broker.heartbeat().await.unwrap();

    let outcome = w.broker.process_now().await.unwrap();
    // The blocked update is ineligible; the heartbeat still ran.
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.succeeded, 1);
}

#[tokio::test]
async fn maintenance_prunes_expired_work() {
    let mut config = BrokerConfig::default();
    config.performance.operation_caching = false;
    let w = world_with_config(config);

    w.broker.submit(create_spec("Old Spec")).await.unwrap();
    w.broker.process_now().await.unwrap();
    assert_eq!(w.broker.operation_queue().await.unwrap().operations.len(), 1);

    w.clock.advance(Duration::from_secs(25 * 3600));
    w.broker.run_maintenance().await.unwrap();

    assert!(w.broker.operation_queue().await.unwrap().operations.is_empty());
}
