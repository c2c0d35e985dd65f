// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation record and state machine.
//!
//! An operation is a typed mutation intent exchanged between the editor
//! extension and the MCP server through `mcp-operations.json`. The wire
//! format is camelCase JSON with a snake_case `type` tag and a
//! type-discriminated `params` object, matching what the out-of-process
//! peer writes.

use crate::id::{ConflictId, OperationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of a task line inside `tasks.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
}

/// Lifecycle status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl OperationStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::Completed | OperationStatus::Failed | OperationStatus::Cancelled
        )
    }
}

crate::simple_display! {
    OperationStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Processing priority. Serialized as its numeric code (`0`–`3`) for
/// compatibility with the peer's wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl OperationPriority {
    pub fn code(self) -> u8 {
        match self {
            OperationPriority::Low => 0,
            OperationPriority::Normal => 1,
            OperationPriority::High => 2,
            OperationPriority::Urgent => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(OperationPriority::Low),
            1 => Some(OperationPriority::Normal),
            2 => Some(OperationPriority::High),
            3 => Some(OperationPriority::Urgent),
            _ => None,
        }
    }
}

impl Serialize for OperationPriority {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for OperationPriority {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        OperationPriority::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid priority code {code}")))
    }
}

crate::simple_display! {
    OperationPriority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

/// Which peer submitted the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationSource {
    Mcp,
    Extension,
}

crate::simple_display! {
    OperationSource {
        Mcp => "mcp",
        Extension => "extension",
    }
}

/// Tag-only view of [`OperationPayload`] (strips the params).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CreateSpec,
    UpdateRequirements,
    UpdateDesign,
    UpdateTasks,
    AddUserStory,
    UpdateTaskStatus,
    DeleteSpec,
    SetCurrentSpec,
    FileCreate,
    FileWrite,
    FileDelete,
    DirectoryCreate,
    SyncStatus,
    Heartbeat,
}

crate::simple_display! {
    OperationType {
        CreateSpec => "create_spec",
        UpdateRequirements => "update_requirements",
        UpdateDesign => "update_design",
        UpdateTasks => "update_tasks",
        AddUserStory => "add_user_story",
        UpdateTaskStatus => "update_task_status",
        DeleteSpec => "delete_spec",
        SetCurrentSpec => "set_current_spec",
        FileCreate => "file_create",
        FileWrite => "file_write",
        FileDelete => "file_delete",
        DirectoryCreate => "directory_create",
        SyncStatus => "sync_status",
        Heartbeat => "heartbeat",
    }
}

/// Typed operation payload: the `type` tag plus its `params` object.
///
/// Serializes as `{"type": "create_spec", "params": {...}}`; parameterless
/// operations omit the `params` key entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OperationPayload {
    CreateSpec {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spec_id: Option<String>,
    },
    UpdateRequirements {
        spec_id: String,
        content: String,
    },
    UpdateDesign {
        spec_id: String,
        content: String,
    },
    UpdateTasks {
        spec_id: String,
        content: String,
    },
    AddUserStory {
        spec_id: String,
        as_a: String,
        i_want: String,
        so_that: String,
        #[serde(default)]
        requirements: Vec<String>,
    },
    UpdateTaskStatus {
        spec_id: String,
        task_number: String,
        status: TaskStatus,
    },
    DeleteSpec {
        spec_id: String,
    },
    SetCurrentSpec {
        spec_id: String,
    },
    FileCreate {
        path: String,
        #[serde(default)]
        content: String,
    },
    FileWrite {
        path: String,
        content: String,
    },
    FileDelete {
        path: String,
    },
    DirectoryCreate {
        path: String,
    },
    SyncStatus,
    Heartbeat,
}

impl OperationPayload {
    /// The tag-only operation type.
    pub fn op_type(&self) -> OperationType {
        match self {
            OperationPayload::CreateSpec { .. } => OperationType::CreateSpec,
            OperationPayload::UpdateRequirements { .. } => OperationType::UpdateRequirements,
            OperationPayload::UpdateDesign { .. } => OperationType::UpdateDesign,
            OperationPayload::UpdateTasks { .. } => OperationType::UpdateTasks,
            OperationPayload::AddUserStory { .. } => OperationType::AddUserStory,
            OperationPayload::UpdateTaskStatus { .. } => OperationType::UpdateTaskStatus,
            OperationPayload::DeleteSpec { .. } => OperationType::DeleteSpec,
            OperationPayload::SetCurrentSpec { .. } => OperationType::SetCurrentSpec,
            OperationPayload::FileCreate { .. } => OperationType::FileCreate,
            OperationPayload::FileWrite { .. } => OperationType::FileWrite,
            OperationPayload::FileDelete { .. } => OperationType::FileDelete,
            OperationPayload::DirectoryCreate { .. } => OperationType::DirectoryCreate,
            OperationPayload::SyncStatus => OperationType::SyncStatus,
            OperationPayload::Heartbeat => OperationType::Heartbeat,
        }
    }

    /// The spec id this payload targets, if it is spec-scoped.
    pub fn spec_id(&self) -> Option<&str> {
        match self {
            OperationPayload::CreateSpec { spec_id, .. } => spec_id.as_deref(),
            OperationPayload::UpdateRequirements { spec_id, .. }
            | OperationPayload::UpdateDesign { spec_id, .. }
            | OperationPayload::UpdateTasks { spec_id, .. }
            | OperationPayload::AddUserStory { spec_id, .. }
            | OperationPayload::UpdateTaskStatus { spec_id, .. }
            | OperationPayload::DeleteSpec { spec_id }
            | OperationPayload::SetCurrentSpec { spec_id } => Some(spec_id),
            _ => None,
        }
    }

    /// The workspace-relative path this payload targets, if file-scoped.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            OperationPayload::FileCreate { path, .. }
            | OperationPayload::FileWrite { path, .. }
            | OperationPayload::FileDelete { path }
            | OperationPayload::DirectoryCreate { path } => Some(path),
            _ => None,
        }
    }

    /// Whether executing this payload changes content under the target
    /// spec or file. Used by the concurrent-modification detector.
    pub fn mutates_target(&self) -> bool {
        !matches!(self, OperationPayload::SyncStatus | OperationPayload::Heartbeat)
    }
}

/// A queued mutation operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    #[serde(flatten)]
    pub payload: OperationPayload,
    pub status: OperationStatus,
    pub priority: OperationPriority,
    pub source: OperationSource,
    /// Creation wall-clock stamp.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retry_count: u32,
    pub max_retries: u32,
    /// Earliest wall-clock time the next attempt may start. Set on
    /// retryable failure using the exponential backoff schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration_ms: Option<u64>,
    /// Ids of operations that must complete before this one is eligible.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<OperationId>,
    /// Outstanding conflicts blocking eligibility.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflict_ids: Vec<ConflictId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Default number of retries before an operation fails terminally.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

impl Operation {
    pub fn op_type(&self) -> OperationType {
        self.payload.op_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the retry window permits an attempt at `now`.
    pub fn retry_window_open(&self, now: DateTime<Utc>) -> bool {
        self.next_retry_at.is_none_or(|at| at <= now)
    }

    /// Whether another retry attempt is allowed after a failure.
    pub fn retries_remaining(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Transition `pending → in_progress`.
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.status = OperationStatus::InProgress;
        self.started_at = Some(now);
    }

    /// Transition to terminal `completed`, recording result and timing.
    pub fn mark_completed(&mut self, result: serde_json::Value, now: DateTime<Utc>) {
        self.status = OperationStatus::Completed;
        self.completed_at = Some(now);
        self.actual_duration_ms = self
            .started_at
            .map(|s| (now - s).num_milliseconds().max(0) as u64);
        self.result = Some(result);
        self.error = None;
        self.next_retry_at = None;
    }

    /// Transition to terminal `failed`.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = OperationStatus::Failed;
        self.completed_at = Some(now);
        self.actual_duration_ms = self
            .started_at
            .map(|s| (now - s).num_milliseconds().max(0) as u64);
        self.error = Some(error.into());
    }

    /// Transition to terminal `cancelled`.
    pub fn mark_cancelled(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = OperationStatus::Cancelled;
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.completed_at = Some(now);
        self.error = Some(reason.into());
    }

    /// Revert `in_progress → pending` for another attempt, recording the
    /// failure and the earliest time the retry may run.
    pub fn revert_for_retry(&mut self, error: impl Into<String>, next_retry_at: DateTime<Utc>) {
        self.status = OperationStatus::Pending;
        self.retry_count += 1;
        self.next_retry_at = Some(next_retry_at);
        self.error = Some(error.into());
        self.started_at = None;
    }
}

crate::builder! {
    pub struct OperationBuilder => Operation {
        into {
            id: OperationId = "op_test1",
        }
        set {
            payload: OperationPayload = OperationPayload::Heartbeat,
            status: OperationStatus = OperationStatus::Pending,
            priority: OperationPriority = OperationPriority::Normal,
            source: OperationSource = OperationSource::Extension,
            timestamp: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH,
            retry_count: u32 = 0,
            max_retries: u32 = DEFAULT_MAX_RETRIES,
            dependencies: Vec<OperationId> = Vec::new(),
            conflict_ids: Vec<ConflictId> = Vec::new(),
            metadata: BTreeMap<String, serde_json::Value> = BTreeMap::new(),
        }
        option {
            started_at: DateTime<Utc> = None,
            completed_at: DateTime<Utc> = None,
            next_retry_at: DateTime<Utc> = None,
            estimated_duration_ms: u64 = None,
            actual_duration_ms: u64 = None,
            result: serde_json::Value = None,
            error: String = None,
        }
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
