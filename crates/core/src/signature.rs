// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation signatures for duplicate detection.
//!
//! A signature is a deterministic string derived from the operation
//! type, the resource it targets, and its distinguishing parameters.
//! Two logically-equivalent submissions produce the same signature, so
//! the queue can refuse the second one. Large content fields enter the
//! signature as a 32-bit hash rather than verbatim.

use crate::operation::OperationPayload;
use sha2::{Digest, Sha256};

/// 32-bit content hash, hex-encoded. The first four bytes of the
/// SHA-256 digest are enough to distinguish payloads inside the dedup
/// window.
pub fn content_hash32(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("{:02x}{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2], digest[3])
}

/// The resource path a payload contends on: `spec:<id>` for spec-scoped
/// operations, `file:<path>` for file-scoped ones, `operation:<type>`
/// otherwise.
pub fn resource_path(payload: &OperationPayload) -> String {
    if let Some(spec_id) = payload.spec_id() {
        format!("spec:{spec_id}")
    } else if let Some(path) = payload.file_path() {
        format!("file:{path}")
    } else {
        format!("operation:{}", payload.op_type())
    }
}

/// Deterministic dedup signature for a payload.
pub fn signature(payload: &OperationPayload) -> String {
    let base = format!("{}:{}", payload.op_type(), resource_path(payload));
    match payload {
        OperationPayload::CreateSpec { name, spec_id, .. } => match spec_id {
            // Unnamed create operations contend on the name instead.
            Some(_) => base,
            None => format!("{base}:{}", content_hash32(name)),
        },
        OperationPayload::UpdateRequirements { content, .. }
        | OperationPayload::UpdateDesign { content, .. }
        | OperationPayload::UpdateTasks { content, .. }
        | OperationPayload::FileCreate { content, .. }
        | OperationPayload::FileWrite { content, .. } => {
            format!("{base}:{}", content_hash32(content))
        }
        OperationPayload::AddUserStory { as_a, i_want, so_that, requirements, .. } => {
            let story = format!("{as_a}\n{i_want}\n{so_that}\n{}", requirements.join("\n"));
            format!("{base}:{}", content_hash32(&story))
        }
        OperationPayload::UpdateTaskStatus { task_number, status, .. } => {
            format!("{base}:{task_number}:{status}")
        }
        OperationPayload::DeleteSpec { .. }
        | OperationPayload::SetCurrentSpec { .. }
        | OperationPayload::FileDelete { .. }
        | OperationPayload::DirectoryCreate { .. }
        | OperationPayload::SyncStatus
        | OperationPayload::Heartbeat => base,
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
