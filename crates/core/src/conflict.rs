// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict records.
//!
//! A conflict names two or more queued operations contending for the
//! same resource. Conflicts and operations reference each other by id
//! only; the queue resolves the references, so persistence never chases
//! pointers.

use crate::id::{ConflictId, OperationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of contention detected among queued operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    DuplicateOperation,
    ConcurrentModification,
    DependencyCycle,
    ResourceNotFound,
    PermissionDenied,
}

crate::simple_display! {
    ConflictType {
        DuplicateOperation => "duplicate_operation",
        ConcurrentModification => "concurrent_modification",
        DependencyCycle => "dependency_cycle",
        ResourceNotFound => "resource_not_found",
        PermissionDenied => "permission_denied",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

crate::simple_display! {
    ConflictSeverity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// How a conflict was (or should be) resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Drop the newer of two hash-equal duplicates.
    DropDuplicate,
    /// Let the higher-priority operation proceed; the other gains a
    /// dependency on it.
    SequenceByPriority,
    /// Fail the operation that closes a dependency cycle.
    RejectCycleMember,
    /// Wait for a queued `create_spec` to supply the missing resource.
    DeferUntilCreated,
    /// Leave unresolved and notify; referenced operations stay blocked.
    Escalate,
}

crate::simple_display! {
    ResolutionStrategy {
        DropDuplicate => "drop_duplicate",
        SequenceByPriority => "sequence_by_priority",
        RejectCycleMember => "reject_cycle_member",
        DeferUntilCreated => "defer_until_created",
        Escalate => "escalate",
    }
}

/// A recorded contention between queued operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: ConflictId,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub operation_ids: Vec<OperationId>,
    pub resource_path: String,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub severity: ConflictSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_strategy: Option<ResolutionStrategy>,
}

impl Conflict {
    pub fn new(
        id: ConflictId,
        conflict_type: ConflictType,
        operation_ids: Vec<OperationId>,
        resource_path: impl Into<String>,
        description: impl Into<String>,
        severity: ConflictSeverity,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            conflict_type,
            operation_ids,
            resource_path: resource_path.into(),
            description: description.into(),
            detected_at,
            severity,
            resolved_at: None,
            resolved_by: None,
            resolution_strategy: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Record resolution. A second call is a no-op so the resolver stays
    /// idempotent.
    pub fn resolve(
        &mut self,
        strategy: ResolutionStrategy,
        resolved_by: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        if self.resolved_at.is_some() {
            return;
        }
        self.resolved_at = Some(now);
        self.resolved_by = Some(resolved_by.into());
        self.resolution_strategy = Some(strategy);
    }

    pub fn involves(&self, operation_id: &OperationId) -> bool {
        self.operation_ids.contains(operation_id)
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
