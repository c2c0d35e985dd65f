// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeDelta;
use yare::parameterized;

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[test]
fn payload_serializes_with_type_tag_and_camel_case_params() {
    let payload = OperationPayload::CreateSpec {
        name: "User Auth".to_string(),
        description: "login flows".to_string(),
        spec_id: None,
    };
    let json = serde_json::to_value(&payload).unwrap();

    assert_eq!(json["type"], "create_spec");
    assert_eq!(json["params"]["name"], "User Auth");
    assert_eq!(json["params"]["description"], "login flows");
    assert!(json["params"].get("specId").is_none());
}

#[test]
fn parameterless_payloads_omit_params() {
    let json = serde_json::to_value(OperationPayload::Heartbeat).unwrap();
    assert_eq!(json["type"], "heartbeat");
    assert!(json.get("params").is_none());

    let back: OperationPayload = serde_json::from_value(json).unwrap();
    assert_eq!(back, OperationPayload::Heartbeat);
}

#[test]
fn task_status_params_use_camel_case_keys() {
    let payload = OperationPayload::UpdateTaskStatus {
        spec_id: "user-auth".to_string(),
        task_number: "2.1".to_string(),
        status: TaskStatus::Completed,
    };
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["params"]["specId"], "user-auth");
    assert_eq!(json["params"]["taskNumber"], "2.1");
    assert_eq!(json["params"]["status"], "completed");
}

#[test]
fn operation_round_trips_through_json() {
    let op = Operation::builder()
        .id("op_round")
        .payload(OperationPayload::UpdateRequirements {
            spec_id: "user-auth".to_string(),
            content: "# Requirements".to_string(),
        })
        .priority(OperationPriority::High)
        .build();

    let json = serde_json::to_string_pretty(&op).unwrap();
    let back: Operation = serde_json::from_str(&json).unwrap();
    assert_eq!(back, op);
}

#[test]
fn operation_wire_format_flattens_payload() {
    let op = Operation::builder().build();
    let json = serde_json::to_value(&op).unwrap();

    // Payload tag and record fields live side by side.
    assert_eq!(json["type"], "heartbeat");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["priority"], 1);
    assert_eq!(json["source"], "extension");
    assert_eq!(json["maxRetries"], 3);
    // Empty optionals stay off the wire.
    assert!(json.get("startedAt").is_none());
    assert!(json.get("dependencies").is_none());
}

#[parameterized(
    low = { OperationPriority::Low, 0 },
    normal = { OperationPriority::Normal, 1 },
    high = { OperationPriority::High, 2 },
    urgent = { OperationPriority::Urgent, 3 },
)]
fn priority_codes(priority: OperationPriority, code: u8) {
    assert_eq!(priority.code(), code);
    assert_eq!(OperationPriority::from_code(code), Some(priority));
    let json = serde_json::to_string(&priority).unwrap();
    assert_eq!(json, code.to_string());
}

#[test]
fn priority_rejects_unknown_codes() {
    assert_eq!(OperationPriority::from_code(4), None);
    assert!(serde_json::from_str::<OperationPriority>("7").is_err());
}

#[test]
fn priorities_order_low_to_urgent() {
    assert!(OperationPriority::Urgent > OperationPriority::High);
    assert!(OperationPriority::High > OperationPriority::Normal);
    assert!(OperationPriority::Normal > OperationPriority::Low);
}

#[parameterized(
    pending = { OperationStatus::Pending, false },
    in_progress = { OperationStatus::InProgress, false },
    completed = { OperationStatus::Completed, true },
    failed = { OperationStatus::Failed, true },
    cancelled = { OperationStatus::Cancelled, true },
)]
fn terminal_statuses(status: OperationStatus, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn mark_completed_records_timing_and_clears_error() {
    let mut op = Operation::builder().error("previous attempt").build();
    op.mark_started(epoch());
    op.mark_completed(serde_json::json!({"specId": "user-auth"}), epoch() + TimeDelta::milliseconds(250));

    assert_eq!(op.status, OperationStatus::Completed);
    assert_eq!(op.actual_duration_ms, Some(250));
    assert_eq!(op.completed_at, Some(epoch() + TimeDelta::milliseconds(250)));
    assert!(op.error.is_none());
    assert!(op.completed_at >= op.started_at);
}

#[test]
fn revert_for_retry_returns_to_pending_with_window() {
    let mut op = Operation::builder().build();
    op.mark_started(epoch());
    op.revert_for_retry("disk full", epoch() + TimeDelta::seconds(1));

    assert_eq!(op.status, OperationStatus::Pending);
    assert_eq!(op.retry_count, 1);
    assert!(op.started_at.is_none());
    assert!(!op.retry_window_open(epoch()));
    assert!(op.retry_window_open(epoch() + TimeDelta::seconds(1)));
}

#[test]
fn retries_remaining_respects_max() {
    let mut op = Operation::builder().max_retries(2).build();
    assert!(op.retries_remaining());
    op.retry_count = 2;
    assert!(!op.retries_remaining());
}

#[test]
fn spec_and_file_scoping() {
    let spec = OperationPayload::DeleteSpec { spec_id: "user-auth".to_string() };
    assert_eq!(spec.spec_id(), Some("user-auth"));
    assert_eq!(spec.file_path(), None);

    let file = OperationPayload::FileWrite {
        path: "notes/todo.md".to_string(),
        content: String::new(),
    };
    assert_eq!(file.spec_id(), None);
    assert_eq!(file.file_path(), Some("notes/todo.md"));

    assert_eq!(OperationPayload::Heartbeat.spec_id(), None);
    assert!(!OperationPayload::Heartbeat.mutates_target());
}
