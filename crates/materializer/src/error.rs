// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use specforge_core::ErrorCode;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from spec-tree and workspace file operations.
#[derive(Debug, Error)]
pub enum MaterializerError {
    #[error("spec '{0}' already exists")]
    SpecExists(String),
    #[error("spec '{0}' not found")]
    SpecNotFound(String),
    #[error("task {task} not found in spec '{spec_id}'")]
    TaskNotFound { spec_id: String, task: String },
    #[error("'{0}' is not a valid spec id")]
    InvalidSpecId(String),
    #[error("path {} escapes the workspace", .0.display())]
    PathEscapesWorkspace(PathBuf),
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("disk full writing {}", .0.display())]
    DiskFull(PathBuf),
    #[error("malformed manifest {}: {detail}", path.display())]
    MalformedManifest { path: PathBuf, detail: String },
    #[error("io error on {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

impl MaterializerError {
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => MaterializerError::FileNotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                MaterializerError::PermissionDenied(path.to_path_buf())
            }
            _ if source.raw_os_error() == Some(28) => {
                MaterializerError::DiskFull(path.to_path_buf())
            }
            _ => MaterializerError::Io { path: path.to_path_buf(), source },
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MaterializerError::SpecExists(_) => ErrorCode::SpecExists,
            MaterializerError::SpecNotFound(_) => ErrorCode::SpecNotFound,
            MaterializerError::TaskNotFound { .. } => ErrorCode::TaskNotFound,
            MaterializerError::InvalidSpecId(_) => ErrorCode::ValidationError,
            MaterializerError::PathEscapesWorkspace(_) => ErrorCode::WorkspaceInvalid,
            MaterializerError::FileNotFound(_) => ErrorCode::FileNotFound,
            MaterializerError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            MaterializerError::DiskFull(_) => ErrorCode::DiskFull,
            MaterializerError::MalformedManifest { .. } => ErrorCode::CorruptFile,
            MaterializerError::Io { .. } => ErrorCode::FileNotFound,
        }
    }

    pub fn retryable(&self) -> bool {
        self.code().retryable()
    }
}
