// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for other crates' tests.

use crate::operation::{Operation, OperationPayload, OperationPriority};

/// A pending `create_spec` operation for the given name.
pub fn create_spec_op(id: &str, name: &str) -> Operation {
    Operation::builder()
        .id(id)
        .payload(OperationPayload::CreateSpec {
            name: name.to_string(),
            description: String::new(),
            spec_id: None,
        })
        .build()
}

/// A pending `update_requirements` operation.
pub fn update_requirements_op(id: &str, spec_id: &str, content: &str) -> Operation {
    Operation::builder()
        .id(id)
        .payload(OperationPayload::UpdateRequirements {
            spec_id: spec_id.to_string(),
            content: content.to_string(),
        })
        .build()
}

/// A pending heartbeat with the given priority.
pub fn heartbeat_op(id: &str, priority: OperationPriority) -> Operation {
    Operation::builder().id(id).payload(OperationPayload::Heartbeat).priority(priority).build()
}
