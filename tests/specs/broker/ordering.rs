// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority and dependency ordering guarantees.

use crate::specs::support::{create_spec, update_requirements, world};
use specforge_core::{OperationPriority, OperationStatus};

#[tokio::test]
async fn urgent_beats_earlier_normal_submissions() {
    let w = world();
    w.broker
        .submit(create_spec("Normal Spec").priority(OperationPriority::Normal))
        .await
        .unwrap();
    w.broker
        .submit(create_spec("Urgent Spec").priority(OperationPriority::Urgent))
        .await
        .unwrap();

    w.broker.process_now().await.unwrap();

    let results = w.read_json(".vscode/mcp-results.json");
    assert_eq!(results["results"][0]["data"]["specId"], "urgent-spec");
    assert_eq!(results["results"][1]["data"]["specId"], "normal-spec");
}

#[tokio::test]
async fn queue_document_orders_by_priority_then_age() {
    let w = world();
    w.broker
        .submit(create_spec("Low Spec").priority(OperationPriority::Low))
        .await
        .unwrap();
    w.clock.advance(std::time::Duration::from_secs(1));
    w.broker
        .submit(create_spec("High Spec").priority(OperationPriority::High))
        .await
        .unwrap();
    w.clock.advance(std::time::Duration::from_secs(1));
    w.broker
        .submit(create_spec("Second High").priority(OperationPriority::High))
        .await
        .unwrap();

    let queue = w.broker.operation_queue().await.unwrap();
    let names: Vec<_> = queue
        .operations
        .iter()
        .map(|op| match &op.payload {
            specforge_core::OperationPayload::CreateSpec { name, .. } => name.as_str(),
            _ => "?",
        })
        .collect();
    assert_eq!(names, vec!["High Spec", "Second High", "Low Spec"]);
}

#[tokio::test]
async fn dependent_update_waits_for_its_create() {
    let w = world();
    w.broker.submit(create_spec("Ghost")).await.unwrap();
    let receipt = w.broker.submit(update_requirements("ghost", "# Later")).await.unwrap();

    // First tick completes only the create; the update depends on it.
    w.broker.process_now().await.unwrap();
    let queue = w.broker.operation_queue().await.unwrap();
    let update = queue.get(receipt.operation_id.as_ref().unwrap()).unwrap();
    assert_eq!(update.status, OperationStatus::Pending);

    w.broker.process_now().await.unwrap();
    let queue = w.broker.operation_queue().await.unwrap();
    let update = queue.get(receipt.operation_id.as_ref().unwrap()).unwrap();
    assert_eq!(update.status, OperationStatus::Completed);
}
