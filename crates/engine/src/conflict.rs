// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conflict detection and resolution.
//!
//! Detection runs against a candidate operation before it is inserted;
//! resolution applies the first applicable strategy in the fixed
//! preference order and is idempotent. Operations and conflicts refer
//! to each other by id only and are always resolved through the queue.

use chrono::{DateTime, Utc};
use specforge_core::signature::{resource_path, signature};
use specforge_core::{
    Conflict, ConflictId, ConflictSeverity, ConflictType, IdGen, Operation, OperationPayload,
    OperationStatus, OperationType, QueueState, ResolutionStrategy,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Resolver identity recorded on auto-resolved conflicts.
const AUTO_RESOLVER: &str = "auto";

/// Finds contention between a candidate operation and the queue.
pub struct ConflictDetector {
    idgen: Arc<dyn IdGen>,
}

impl ConflictDetector {
    pub fn new(idgen: Arc<dyn IdGen>) -> Self {
        Self { idgen }
    }

    /// Detect every conflict the candidate raises against the current
    /// queue. `spec_exists` answers whether a spec id is materialized
    /// on disk.
    pub fn detect(
        &self,
        candidate: &Operation,
        queue: &QueueState,
        spec_exists: &dyn Fn(&str) -> bool,
        now: DateTime<Utc>,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        if let Some(dup) = self.detect_duplicate(candidate, queue, now) {
            conflicts.push(dup);
        }
        if let Some(concurrent) = self.detect_concurrent(candidate, queue, now) {
            conflicts.push(concurrent);
        }
        if let Some(cycle) = self.detect_cycle(candidate, queue, now) {
            conflicts.push(cycle);
        }
        if let Some(missing) = self.detect_missing_resource(candidate, queue, spec_exists, now) {
            conflicts.push(missing);
        }
        conflicts
    }

    fn conflict(
        &self,
        conflict_type: ConflictType,
        operation_ids: Vec<specforge_core::OperationId>,
        resource: String,
        description: String,
        severity: ConflictSeverity,
        now: DateTime<Utc>,
    ) -> Conflict {
        Conflict::new(
            ConflictId::generate(self.idgen.as_ref()),
            conflict_type,
            operation_ids,
            resource,
            description,
            severity,
            now,
        )
    }

    fn detect_duplicate(
        &self,
        candidate: &Operation,
        queue: &QueueState,
        now: DateTime<Utc>,
    ) -> Option<Conflict> {
        let sig = signature(&candidate.payload);
        let twin = queue
            .operations
            .iter()
            .find(|op| !op.is_terminal() && op.id != candidate.id && signature(&op.payload) == sig)?;
        Some(self.conflict(
            ConflictType::DuplicateOperation,
            vec![twin.id.clone(), candidate.id.clone()],
            resource_path(&candidate.payload),
            format!("operation {} duplicates queued operation {}", candidate.id, twin.id),
            ConflictSeverity::Medium,
            now,
        ))
    }

    fn detect_concurrent(
        &self,
        candidate: &Operation,
        queue: &QueueState,
        now: DateTime<Utc>,
    ) -> Option<Conflict> {
        if !candidate.payload.mutates_target() {
            return None;
        }
        let resource = resource_path(&candidate.payload);
        let active = queue.operations.iter().find(|op| {
            op.status == OperationStatus::InProgress
                && op.id != candidate.id
                && op.payload.mutates_target()
                && resource_path(&op.payload) == resource
        })?;
        Some(self.conflict(
            ConflictType::ConcurrentModification,
            vec![active.id.clone(), candidate.id.clone()],
            resource,
            format!(
                "operation {} modifies a resource that {} is currently changing",
                candidate.id, active.id
            ),
            ConflictSeverity::High,
            now,
        ))
    }

    /// Whether following `candidate`'s dependencies through the queue
    /// leads back to the candidate.
    fn detect_cycle(
        &self,
        candidate: &Operation,
        queue: &QueueState,
        now: DateTime<Utc>,
    ) -> Option<Conflict> {
        let mut visited = HashSet::new();
        let mut stack: Vec<&specforge_core::OperationId> = candidate.dependencies.iter().collect();
        while let Some(id) = stack.pop() {
            if *id == candidate.id {
                return Some(self.conflict(
                    ConflictType::DependencyCycle,
                    vec![candidate.id.clone()],
                    format!("operation:{}", candidate.id),
                    format!("operation {} closes a dependency cycle", candidate.id),
                    ConflictSeverity::Critical,
                    now,
                ));
            }
            if !visited.insert(id.clone()) {
                continue;
            }
            if let Some(op) = queue.get(id) {
                stack.extend(op.dependencies.iter());
            }
        }
        None
    }

    fn detect_missing_resource(
        &self,
        candidate: &Operation,
        queue: &QueueState,
        spec_exists: &dyn Fn(&str) -> bool,
        now: DateTime<Utc>,
    ) -> Option<Conflict> {
        if !requires_existing_spec(candidate.op_type()) {
            return None;
        }
        let spec_id = candidate.payload.spec_id()?;
        if spec_exists(spec_id) {
            return None;
        }
        // A queued create for the same spec makes this deferrable; the
        // resolver will add the dependency.
        let mut ids = vec![candidate.id.clone()];
        if let Some(creator) = pending_creator(queue, spec_id) {
            ids.insert(0, creator.id.clone());
        }
        Some(self.conflict(
            ConflictType::ResourceNotFound,
            ids,
            format!("spec:{spec_id}"),
            format!("operation {} targets spec '{spec_id}' which is not materialized", candidate.id),
            ConflictSeverity::High,
            now,
        ))
    }
}

/// Operation types that need their spec directory to already exist.
fn requires_existing_spec(op_type: OperationType) -> bool {
    matches!(
        op_type,
        OperationType::UpdateRequirements
            | OperationType::UpdateDesign
            | OperationType::UpdateTasks
            | OperationType::AddUserStory
            | OperationType::UpdateTaskStatus
            | OperationType::SetCurrentSpec
    )
}

/// A queued, non-terminal `create_spec` that will materialize
/// `spec_id`.
fn pending_creator<'q>(queue: &'q QueueState, spec_id: &str) -> Option<&'q Operation> {
    queue.operations.iter().find(|op| {
        if op.is_terminal() {
            return false;
        }
        match &op.payload {
            OperationPayload::CreateSpec { spec_id: Some(id), .. } => id == spec_id,
            OperationPayload::CreateSpec { name, spec_id: None, .. } => {
                matches!(specforge_materializer::derive_spec_id(name), Ok(id) if id == spec_id)
            }
            _ => false,
        }
    })
}

/// Applies resolution strategies in preference order.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Try to resolve `conflict` against the queue. Returns `true` when
    /// a strategy applied; `false` leaves the conflict escalated and
    /// unresolved. Re-running on a resolved conflict is a no-op.
    pub fn resolve(conflict: &mut Conflict, queue: &mut QueueState, now: DateTime<Utc>) -> bool {
        if conflict.is_resolved() {
            return true;
        }
        match conflict.conflict_type {
            ConflictType::DuplicateOperation => Self::drop_newer_duplicate(conflict, queue, now),
            ConflictType::ConcurrentModification => {
                Self::sequence_by_priority(conflict, queue, now)
            }
            ConflictType::DependencyCycle => Self::reject_cycle_member(conflict, queue, now),
            ConflictType::ResourceNotFound => Self::defer_until_created(conflict, queue, now),
            // Escalate: stays unresolved; eligibility keeps the
            // referenced operations out of the running.
            ConflictType::PermissionDenied => false,
        }
    }

    fn drop_newer_duplicate(
        conflict: &mut Conflict,
        queue: &mut QueueState,
        now: DateTime<Utc>,
    ) -> bool {
        let [older_id, newer_id] = match conflict.operation_ids.as_slice() {
            [a, b] => [a.clone(), b.clone()],
            _ => return false,
        };
        let (Some(older), Some(newer)) = (queue.get(&older_id), queue.get(&newer_id)) else {
            return false;
        };
        // Hash-equal payloads only; a duplicate signature with a
        // diverging payload escalates instead.
        if older.payload != newer.payload {
            return false;
        }
        let drop_id = if newer.timestamp >= older.timestamp { newer_id } else { older_id };
        let keep_id = conflict
            .operation_ids
            .iter()
            .find(|id| **id != drop_id)
            .cloned()
            .unwrap_or_else(|| drop_id.clone());
        if let Some(op) = queue.get_mut(&drop_id) {
            op.mark_cancelled(format!("duplicate of {keep_id}"), now);
        }
        conflict.resolve(ResolutionStrategy::DropDuplicate, AUTO_RESOLVER, now);
        true
    }

    fn sequence_by_priority(
        conflict: &mut Conflict,
        queue: &mut QueueState,
        now: DateTime<Utc>,
    ) -> bool {
        let [first_id, second_id] = match conflict.operation_ids.as_slice() {
            [a, b] => [a.clone(), b.clone()],
            _ => return false,
        };
        let (Some(first), Some(second)) = (queue.get(&first_id), queue.get(&second_id)) else {
            return false;
        };
        // The in-progress operation keeps running regardless of
        // priority; otherwise the higher priority goes first.
        let (winner_id, loser_id) = if first.status == OperationStatus::InProgress {
            (first_id, second_id)
        } else if second.status == OperationStatus::InProgress
            || second.priority > first.priority
        {
            (second_id, first_id)
        } else {
            (first_id, second_id)
        };
        if let Some(loser) = queue.get_mut(&loser_id) {
            if !loser.dependencies.contains(&winner_id) {
                loser.dependencies.push(winner_id);
            }
        }
        conflict.resolve(ResolutionStrategy::SequenceByPriority, AUTO_RESOLVER, now);
        true
    }

    fn reject_cycle_member(
        conflict: &mut Conflict,
        queue: &mut QueueState,
        now: DateTime<Utc>,
    ) -> bool {
        // The closing member is the last id recorded on the conflict.
        let Some(member_id) = conflict.operation_ids.last().cloned() else {
            return false;
        };
        if let Some(op) = queue.get_mut(&member_id) {
            op.retry_count = op.max_retries;
            op.mark_failed("dependency cycle detected", now);
        }
        conflict.resolve(ResolutionStrategy::RejectCycleMember, AUTO_RESOLVER, now);
        true
    }

    fn defer_until_created(
        conflict: &mut Conflict,
        queue: &mut QueueState,
        now: DateTime<Utc>,
    ) -> bool {
        // Deferrable only when detection found a pending creator.
        let [creator_id, blocked_id] = match conflict.operation_ids.as_slice() {
            [c, b] => [c.clone(), b.clone()],
            _ => return false,
        };
        if queue.get(&creator_id).is_none() {
            return false;
        }
        if let Some(blocked) = queue.get_mut(&blocked_id) {
            if !blocked.dependencies.contains(&creator_id) {
                blocked.dependencies.push(creator_id);
            }
        }
        conflict.resolve(ResolutionStrategy::DeferUntilCreated, AUTO_RESOLVER, now);
        true
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
