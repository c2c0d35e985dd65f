// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation construction.
//!
//! The factory is the only way a payload becomes a queued [`Operation`]:
//! it validates the params, mints an id, and stamps the record. Callers
//! describe what they want with an [`OperationIntent`].

use crate::clock::Clock;
use crate::id::{IdGen, OperationId};
use crate::operation::{
    Operation, OperationPayload, OperationPriority, OperationSource, OperationStatus,
    DEFAULT_MAX_RETRIES,
};
use crate::validate::{validate, ValidationError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A request to enqueue an operation.
#[derive(Debug, Clone)]
pub struct OperationIntent {
    pub payload: OperationPayload,
    pub priority: OperationPriority,
    pub source: OperationSource,
    pub dependencies: Vec<OperationId>,
    pub max_retries: u32,
    pub estimated_duration_ms: Option<u64>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl OperationIntent {
    pub fn new(payload: OperationPayload) -> Self {
        Self {
            payload,
            priority: OperationPriority::Normal,
            source: OperationSource::Extension,
            dependencies: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            estimated_duration_ms: None,
            metadata: BTreeMap::new(),
        }
    }

    crate::setters! {
        set {
            priority: OperationPriority,
            source: OperationSource,
            dependencies: Vec<OperationId>,
            max_retries: u32,
            metadata: BTreeMap<String, serde_json::Value>,
        }
        option {
            estimated_duration_ms: u64,
        }
    }
}

/// Builds validated operations.
#[derive(Clone)]
pub struct OperationFactory<C: Clock> {
    idgen: Arc<dyn IdGen>,
    clock: C,
}

impl<C: Clock> OperationFactory<C> {
    pub fn new(idgen: Arc<dyn IdGen>, clock: C) -> Self {
        Self { idgen, clock }
    }

    /// Validate the intent and mint a pending operation.
    pub fn build(&self, intent: OperationIntent) -> Result<Operation, ValidationError> {
        validate(&intent.payload)?;
        Ok(Operation {
            id: OperationId::generate(self.idgen.as_ref()),
            payload: intent.payload,
            status: OperationStatus::Pending,
            priority: intent.priority,
            source: intent.source,
            timestamp: self.clock.now_utc(),
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries: intent.max_retries,
            next_retry_at: None,
            estimated_duration_ms: intent.estimated_duration_ms,
            actual_duration_ms: None,
            dependencies: intent.dependencies,
            conflict_ids: Vec::new(),
            result: None,
            error: None,
            metadata: intent.metadata,
        })
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
