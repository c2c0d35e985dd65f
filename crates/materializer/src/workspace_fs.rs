// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-relative file operations.
//!
//! Backs the `file_create`, `file_write`, `file_delete`, and
//! `directory_create` operation types. Every path is resolved against
//! the workspace root and refused if it escapes it.

use crate::error::MaterializerError;
use specforge_core::validate::is_safe_relative_path;
use std::fs;
use std::path::{Path, PathBuf};

/// File operations scoped to one workspace root.
#[derive(Debug, Clone)]
pub struct WorkspaceFs {
    root: PathBuf,
}

impl WorkspaceFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, MaterializerError> {
        if !is_safe_relative_path(relative) {
            return Err(MaterializerError::PathEscapesWorkspace(PathBuf::from(relative)));
        }
        Ok(self.root.join(relative))
    }

    /// Create a file with the given content. Creating over an existing
    /// file is an overwrite; parent directories are created as needed.
    pub fn create_file(&self, relative: &str, content: &str) -> Result<PathBuf, MaterializerError> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MaterializerError::from_io(parent, e))?;
        }
        fs::write(&path, content).map_err(|e| MaterializerError::from_io(&path, e))?;
        tracing::debug!(path = %path.display(), "created file");
        Ok(path)
    }

    /// Overwrite an existing file's content.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<PathBuf, MaterializerError> {
        let path = self.resolve(relative)?;
        if !path.is_file() {
            return Err(MaterializerError::FileNotFound(path));
        }
        fs::write(&path, content).map_err(|e| MaterializerError::from_io(&path, e))?;
        Ok(path)
    }

    /// Delete a file. Deleting a missing file is a success: returns
    /// whether anything was removed.
    pub fn delete_file(&self, relative: &str) -> Result<bool, MaterializerError> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MaterializerError::from_io(&path, e)),
        }
    }

    /// Create a directory and any missing parents.
    pub fn create_dir(&self, relative: &str) -> Result<PathBuf, MaterializerError> {
        let path = self.resolve(relative)?;
        fs::create_dir_all(&path).map_err(|e| MaterializerError::from_io(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
#[path = "workspace_fs_tests.rs"]
mod tests;
