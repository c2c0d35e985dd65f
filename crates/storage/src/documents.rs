// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed access to the three protocol files.

use crate::atomic::AtomicFileStore;
use crate::error::StorageError;
use crate::paths::BrokerPaths;
use specforge_core::{Clock, FileOpsConfig, QueueState, ResultsLog, SyncState};

pub const OPERATIONS_SCHEMA: &str = "specforge/operations";
pub const SYNC_SCHEMA: &str = "specforge/sync";
pub const RESULTS_SCHEMA: &str = "specforge/results";

/// Current envelope version for all three documents.
const SCHEMA_VERSION: u32 = 1;

/// Loads and persists the protocol documents for one workspace.
pub struct ProtocolStore<C: Clock> {
    files: AtomicFileStore,
    paths: BrokerPaths,
    clock: C,
}

impl<C: Clock> ProtocolStore<C> {
    pub fn new(paths: BrokerPaths, file_ops: &FileOpsConfig, clock: C) -> Self {
        Self {
            files: AtomicFileStore::new(
                file_ops.lock_timeout,
                file_ops.backup_enabled,
                file_ops.max_backups,
            ),
            paths,
            clock,
        }
    }

    pub fn paths(&self) -> &BrokerPaths {
        &self.paths
    }

    /// Load the queue document; a missing file is an empty queue.
    pub fn load_queue(&self) -> Result<QueueState, StorageError> {
        Ok(self
            .files
            .read_json(&self.paths.operations_file())?
            .unwrap_or_else(|| QueueState::empty(self.clock.now_utc())))
    }

    pub fn store_queue(&self, queue: &QueueState) -> Result<(), StorageError> {
        self.files.write_json(
            &self.paths.operations_file(),
            queue,
            OPERATIONS_SCHEMA,
            SCHEMA_VERSION,
        )
    }

    /// Load the sync-state document; a missing file is the offline
    /// state.
    pub fn load_sync_state(&self) -> Result<SyncState, StorageError> {
        Ok(self.files.read_json(&self.paths.sync_file())?.unwrap_or_else(SyncState::offline))
    }

    pub fn store_sync_state(&self, state: &SyncState) -> Result<(), StorageError> {
        self.files.write_json(&self.paths.sync_file(), state, SYNC_SCHEMA, SCHEMA_VERSION)
    }

    /// Load the results log; a missing file is an empty log.
    pub fn load_results(&self) -> Result<ResultsLog, StorageError> {
        Ok(self
            .files
            .read_json(&self.paths.results_file())?
            .unwrap_or_else(|| ResultsLog::empty(self.clock.now_utc())))
    }

    pub fn store_results(&self, results: &ResultsLog) -> Result<(), StorageError> {
        self.files.write_json(&self.paths.results_file(), results, RESULTS_SCHEMA, SCHEMA_VERSION)
    }

    /// Remove orphaned temp files next to the protocol documents.
    pub fn cleanup_temp_files(&self) -> usize {
        self.files.cleanup_temp_files(&self.paths.vscode_dir())
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
