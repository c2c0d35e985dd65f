// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use specforge_core::{FakeClock, Operation, TaskStatus};
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, LocalDispatcher<FakeClock>) {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let dispatcher = LocalDispatcher::new(
        SpecMaterializer::new(dir.path().join(".specifications"), clock.clone()),
        WorkspaceFs::new(dir.path()),
    );
    (dir, dispatcher)
}

fn op(payload: OperationPayload) -> Operation {
    Operation::builder().payload(payload).build()
}

#[tokio::test]
async fn create_spec_returns_the_derived_id() {
    let (_dir, dispatcher) = setup();
    let data = dispatcher
        .dispatch(&op(OperationPayload::CreateSpec {
            name: "User Auth".to_string(),
            description: String::new(),
            spec_id: None,
        }))
        .await
        .unwrap();

    assert_eq!(data["specId"], "user-auth");
    assert!(dispatcher.materializer().exists("user-auth"));
}

#[tokio::test]
async fn create_twice_surfaces_spec_exists() {
    let (_dir, dispatcher) = setup();
    let payload = OperationPayload::CreateSpec {
        name: "User Auth".to_string(),
        description: String::new(),
        spec_id: None,
    };
    dispatcher.dispatch(&op(payload.clone())).await.unwrap();
    let err = dispatcher.dispatch(&op(payload)).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::SpecExists);
    assert!(!err.retryable());
}

#[tokio::test]
async fn update_missing_spec_surfaces_spec_not_found() {
    let (_dir, dispatcher) = setup();
    let err = dispatcher
        .dispatch(&op(OperationPayload::UpdateDesign {
            spec_id: "ghost".to_string(),
            content: "# D".to_string(),
        }))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SpecNotFound);
}

#[tokio::test]
async fn full_spec_lifecycle_through_dispatch() {
    let (_dir, dispatcher) = setup();
    dispatcher
        .dispatch(&op(OperationPayload::CreateSpec {
            name: "User Auth".to_string(),
            description: String::new(),
            spec_id: None,
        }))
        .await
        .unwrap();

    let data = dispatcher
        .dispatch(&op(OperationPayload::UpdateRequirements {
            spec_id: "user-auth".to_string(),
            content: "# Requirements v2".to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(data["version"], 2);

    let data = dispatcher
        .dispatch(&op(OperationPayload::UpdateTaskStatus {
            spec_id: "user-auth".to_string(),
            task_number: "1".to_string(),
            status: TaskStatus::Completed,
        }))
        .await
        .unwrap();
    assert_eq!(data["status"], "completed");

    let data = dispatcher
        .dispatch(&op(OperationPayload::AddUserStory {
            spec_id: "user-auth".to_string(),
            as_a: "user".to_string(),
            i_want: "to log in".to_string(),
            so_that: "I can see my data".to_string(),
            requirements: vec![],
        }))
        .await
        .unwrap();
    assert_eq!(data["storyId"], "US-001");

    let data = dispatcher
        .dispatch(&op(OperationPayload::DeleteSpec { spec_id: "user-auth".to_string() }))
        .await
        .unwrap();
    assert_eq!(data["deleted"], true);
    assert!(!dispatcher.materializer().exists("user-auth"));
}

#[tokio::test]
async fn set_current_spec_is_wired() {
    let (_dir, dispatcher) = setup();
    dispatcher
        .dispatch(&op(OperationPayload::CreateSpec {
            name: "Alpha".to_string(),
            description: String::new(),
            spec_id: None,
        }))
        .await
        .unwrap();

    let data = dispatcher
        .dispatch(&op(OperationPayload::SetCurrentSpec { spec_id: "alpha".to_string() }))
        .await
        .unwrap();
    assert_eq!(data["isCurrent"], true);

    let err = dispatcher
        .dispatch(&op(OperationPayload::SetCurrentSpec { spec_id: "ghost".to_string() }))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SpecNotFound);
}

#[tokio::test]
async fn file_operations_round_trip(){
    let (dir, dispatcher) = setup();

    dispatcher
        .dispatch(&op(OperationPayload::FileCreate {
            path: "notes/todo.md".to_string(),
            content: "- [ ] item".to_string(),
        }))
        .await
        .unwrap();
    assert!(dir.path().join("notes/todo.md").is_file());

    dispatcher
        .dispatch(&op(OperationPayload::FileWrite {
            path: "notes/todo.md".to_string(),
            content: "- [x] item".to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes/todo.md")).unwrap(),
        "- [x] item"
    );

    let data = dispatcher
        .dispatch(&op(OperationPayload::FileDelete { path: "notes/todo.md".to_string() }))
        .await
        .unwrap();
    assert_eq!(data["deleted"], true);
}

#[tokio::test]
async fn liveness_operations_acknowledge() {
    let (_dir, dispatcher) = setup();
    let data = dispatcher.dispatch(&op(OperationPayload::Heartbeat)).await.unwrap();
    assert_eq!(data["acknowledged"], true);
}
