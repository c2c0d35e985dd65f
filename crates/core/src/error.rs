// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol-level error codes shared by every component.
//!
//! Errors travel as tagged values through the result log and the
//! submission API; the code decides whether the executor may retry the
//! operation that produced it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error codes surfaced through the protocol files and
/// the submission API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation
    ValidationError,
    // Resource
    NoWorkspace,
    WorkspaceInvalid,
    SpecNotFound,
    SpecExists,
    TaskNotFound,
    // I/O
    FileNotFound,
    PermissionDenied,
    DiskFull,
    CorruptFile,
    LockTimeout,
    ChecksumMismatch,
    // Queue
    QueueFull,
    DuplicateOperation,
    ServiceUnavailable,
    DependencyCycle,
    // Conflict
    UnresolvedConflict,
    // Remote dispatch
    RemoteUnavailable,
    RemoteFailed,
}

impl ErrorCode {
    /// Whether the executor may schedule another attempt after an error
    /// with this code.
    ///
    /// I/O errors are transient except permission and corruption
    /// failures; validation, resource, and queue errors never retry.
    /// `UNRESOLVED_CONFLICT` is not a failure at all; the operation
    /// stays pending but ineligible.
    pub fn retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::FileNotFound
                | ErrorCode::DiskFull
                | ErrorCode::LockTimeout
                | ErrorCode::ChecksumMismatch
                | ErrorCode::RemoteUnavailable
                | ErrorCode::RemoteFailed
        )
    }
}

crate::simple_display! {
    ErrorCode {
        ValidationError => "VALIDATION_ERROR",
        NoWorkspace => "NO_WORKSPACE",
        WorkspaceInvalid => "WORKSPACE_INVALID",
        SpecNotFound => "SPEC_NOT_FOUND",
        SpecExists => "SPEC_EXISTS",
        TaskNotFound => "TASK_NOT_FOUND",
        FileNotFound => "FILE_NOT_FOUND",
        PermissionDenied => "PERMISSION_DENIED",
        DiskFull => "DISK_FULL",
        CorruptFile => "CORRUPT_FILE",
        LockTimeout => "LOCK_TIMEOUT",
        ChecksumMismatch => "CHECKSUM_MISMATCH",
        QueueFull => "QUEUE_FULL",
        DuplicateOperation => "DUPLICATE_OPERATION",
        ServiceUnavailable => "SERVICE_UNAVAILABLE",
        DependencyCycle => "DEPENDENCY_CYCLE",
        UnresolvedConflict => "UNRESOLVED_CONFLICT",
        RemoteUnavailable => "REMOTE_UNAVAILABLE",
        RemoteFailed => "REMOTE_FAILED",
    }
}

/// A coded error with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct BrokerError {
    pub code: ErrorCode,
    pub message: String,
}

impl BrokerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn retryable(&self) -> bool {
        self.code.retryable()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
