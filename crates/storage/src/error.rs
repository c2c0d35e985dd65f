// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error taxonomy.

use specforge_core::ErrorCode;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the atomic file layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("workspace root is not usable: {0}")]
    WorkspaceInvalid(String),
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("disk full writing {}", .0.display())]
    DiskFull(PathBuf),
    #[error("corrupt file {}: {detail}{}", path.display(), backup_hint(backup))]
    Corrupt { path: PathBuf, detail: String, backup: Option<PathBuf> },
    #[error("timed out waiting for write lock on {}", .0.display())]
    LockTimeout(PathBuf),
    #[error("checksum mismatch in {}: expected {expected}, found {found}", path.display())]
    ChecksumMismatch { path: PathBuf, expected: String, found: String },
    #[error("path {} escapes the workspace", .0.display())]
    PathEscapesWorkspace(PathBuf),
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error on {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

fn backup_hint(backup: &Option<PathBuf>) -> String {
    match backup {
        Some(p) => format!(" (backup available at {})", p.display()),
        None => String::new(),
    }
}

impl StorageError {
    /// Classify an io error against the path it occurred on.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                StorageError::PermissionDenied(path.to_path_buf())
            }
            _ if source.raw_os_error() == Some(28) => StorageError::DiskFull(path.to_path_buf()),
            _ => StorageError::Io { path: path.to_path_buf(), source },
        }
    }

    /// Protocol-level error code for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            StorageError::WorkspaceInvalid(_) => ErrorCode::WorkspaceInvalid,
            StorageError::NotFound(_) => ErrorCode::FileNotFound,
            StorageError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            StorageError::DiskFull(_) => ErrorCode::DiskFull,
            StorageError::Corrupt { .. } => ErrorCode::CorruptFile,
            StorageError::LockTimeout(_) => ErrorCode::LockTimeout,
            StorageError::ChecksumMismatch { .. } => ErrorCode::ChecksumMismatch,
            StorageError::PathEscapesWorkspace(_) => ErrorCode::WorkspaceInvalid,
            StorageError::Json(_) => ErrorCode::CorruptFile,
            StorageError::Io { .. } => ErrorCode::FileNotFound,
        }
    }

    pub fn retryable(&self) -> bool {
        self.code().retryable()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
