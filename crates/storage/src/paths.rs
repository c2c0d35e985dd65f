// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Well-known workspace paths.
//!
//! ```text
//! <workspace>/
//!   .vscode/
//!     mcp-operations.json
//!     specforge-sync.json
//!     mcp-results.json
//!   .specifications/
//!     <specId>/{spec.json, requirements.md, design.md, tasks.md}
//! ```

use crate::error::StorageError;
use specforge_core::validate::is_safe_relative_path;
use std::fs;
use std::path::{Path, PathBuf};

pub const OPERATIONS_FILE: &str = "mcp-operations.json";
pub const SYNC_FILE: &str = "specforge-sync.json";
pub const RESULTS_FILE: &str = "mcp-results.json";
pub const SPECIFICATIONS_DIR: &str = ".specifications";

/// Resolved locations of the protocol files for one workspace.
#[derive(Debug, Clone)]
pub struct BrokerPaths {
    root: PathBuf,
}

impl BrokerPaths {
    /// Bind to a workspace root. The root must exist and be a
    /// directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StorageError::WorkspaceInvalid(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vscode_dir(&self) -> PathBuf {
        self.root.join(".vscode")
    }

    pub fn operations_file(&self) -> PathBuf {
        self.vscode_dir().join(OPERATIONS_FILE)
    }

    pub fn sync_file(&self) -> PathBuf {
        self.vscode_dir().join(SYNC_FILE)
    }

    pub fn results_file(&self) -> PathBuf {
        self.vscode_dir().join(RESULTS_FILE)
    }

    pub fn specifications_dir(&self) -> PathBuf {
        self.root.join(SPECIFICATIONS_DIR)
    }

    pub fn spec_dir(&self, spec_id: &str) -> PathBuf {
        self.specifications_dir().join(spec_id)
    }

    /// Create the `.vscode/` and `.specifications/` directories.
    pub fn ensure_layout(&self) -> Result<(), StorageError> {
        for dir in [self.vscode_dir(), self.specifications_dir()] {
            fs::create_dir_all(&dir).map_err(|e| StorageError::from_io(&dir, e))?;
        }
        Ok(())
    }

    /// Resolve a workspace-relative path, refusing traversal outside
    /// the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_relative_path(relative) {
            return Err(StorageError::PathEscapesWorkspace(PathBuf::from(relative)));
        }
        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
