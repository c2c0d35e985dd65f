// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec lifecycle through the full broker stack.

use crate::specs::support::{create_spec, update_requirements, world};
use specforge_core::{OperationIntent, OperationPayload, OperationStatus};

#[tokio::test]
async fn create_then_delete_leaves_a_clean_workspace() {
    let w = world();

    let receipt = w.broker.submit(create_spec("User Auth")).await.unwrap();
    assert!(receipt.queued);
    w.broker.process_now().await.unwrap();

    let spec_dir = w.dir.path().join(".specifications/user-auth");
    for file in ["spec.json", "requirements.md", "design.md", "tasks.md"] {
        assert!(spec_dir.join(file).is_file(), "{file} missing after create");
    }
    let results = w.read_json(".vscode/mcp-results.json");
    assert_eq!(results["results"][0]["success"], true);
    assert_eq!(results["results"][0]["data"]["specId"], "user-auth");

    w.broker
        .submit(OperationIntent::new(OperationPayload::DeleteSpec {
            spec_id: "user-auth".to_string(),
        }))
        .await
        .unwrap();
    w.broker.process_now().await.unwrap();

    assert!(!spec_dir.exists());
    assert!(w.broker.list_specifications().unwrap().is_empty());
    let results = w.read_json(".vscode/mcp-results.json");
    assert_eq!(results["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_update_within_the_window_is_suppressed() {
    let w = world();
    w.broker.submit(create_spec("User Auth")).await.unwrap();
    w.broker.process_now().await.unwrap();

    let first = w.broker.submit(update_requirements("user-auth", "# Same")).await.unwrap();
    let second = w.broker.submit(update_requirements("user-auth", "# Same")).await.unwrap();

    assert!(first.queued);
    assert!(!second.queued);

    let queue = w.broker.operation_queue().await.unwrap();
    let updates = queue
        .operations
        .iter()
        .filter(|op| {
            matches!(op.payload, OperationPayload::UpdateRequirements { .. })
        })
        .count();
    assert_eq!(updates, 1);
}

#[tokio::test]
async fn different_content_is_not_a_duplicate() {
    let w = world();
    w.broker.submit(create_spec("User Auth")).await.unwrap();
    w.broker.process_now().await.unwrap();

    assert!(w.broker.submit(update_requirements("user-auth", "# v1")).await.unwrap().queued);
    assert!(w.broker.submit(update_requirements("user-auth", "# v2")).await.unwrap().queued);
}

#[tokio::test]
async fn completed_operations_report_invariant_timestamps() {
    let w = world();
    w.broker.submit(create_spec("User Auth")).await.unwrap();
    w.broker.process_now().await.unwrap();

    let queue = w.broker.operation_queue().await.unwrap();
    for op in &queue.operations {
        assert_eq!(op.status, OperationStatus::Completed);
        assert!(op.started_at.is_some());
        assert!(op.completed_at >= op.started_at);
        assert!(op.retry_count <= op.max_retries);
        assert!(op.error.is_none());
    }
}

#[tokio::test]
async fn counters_always_sum_to_queue_size() {
    let w = world();
    w.broker.submit(create_spec("Alpha")).await.unwrap();
    w.broker.submit(create_spec("Beta")).await.unwrap();
    w.broker.submit(update_requirements("ghost", "# blocked")).await.unwrap();
    w.broker.process_now().await.unwrap();

    let sync = w.broker.sync_state().await.unwrap();
    let queue = w.broker.operation_queue().await.unwrap();
    let total = sync.pending_operations
        + sync.in_progress_operations
        + sync.completed_operations
        + sync.failed_operations
        + sync.cancelled_operations;
    assert_eq!(total, queue.operations.len());
}
