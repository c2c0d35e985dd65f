// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation dispatch.
//!
//! The executor routes each eligible operation by type: spec and file
//! mutations always run locally against the materializer; `heartbeat`
//! and `sync_status` may go to a remote endpoint when one is available.

use async_trait::async_trait;
use serde_json::json;
use specforge_adapters::RemoteError;
use specforge_core::{Clock, ErrorCode, Operation, OperationPayload};
use specforge_materializer::{
    MaterializerError, SpecDocument, SpecMaterializer, UserStory, WorkspaceFs,
};
use thiserror::Error;

/// A dispatch failure with its protocol code.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct DispatchError {
    pub code: ErrorCode,
    pub message: String,
}

impl DispatchError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn retryable(&self) -> bool {
        self.code.retryable()
    }
}

impl From<MaterializerError> for DispatchError {
    fn from(e: MaterializerError) -> Self {
        Self { code: e.code(), message: e.to_string() }
    }
}

impl From<RemoteError> for DispatchError {
    fn from(e: RemoteError) -> Self {
        Self { code: e.code(), message: e.to_string() }
    }
}

/// Executes one operation against local state.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    async fn dispatch(&self, operation: &Operation) -> Result<serde_json::Value, DispatchError>;
}

/// Local dispatcher over the spec materializer and workspace fs.
pub struct LocalDispatcher<C: Clock> {
    materializer: SpecMaterializer<C>,
    workspace: WorkspaceFs,
}

impl<C: Clock> LocalDispatcher<C> {
    pub fn new(materializer: SpecMaterializer<C>, workspace: WorkspaceFs) -> Self {
        Self { materializer, workspace }
    }

    pub fn materializer(&self) -> &SpecMaterializer<C> {
        &self.materializer
    }
}

#[async_trait]
impl<C: Clock> Dispatch for LocalDispatcher<C> {
    async fn dispatch(&self, operation: &Operation) -> Result<serde_json::Value, DispatchError> {
        match &operation.payload {
            OperationPayload::CreateSpec { name, description, spec_id } => {
                let manifest =
                    self.materializer.create_spec(name, description, spec_id.as_deref())?;
                Ok(json!({"specId": manifest.spec_id, "version": manifest.version}))
            }

            OperationPayload::UpdateRequirements { spec_id, content } => {
                let manifest = self.materializer.update_document(
                    spec_id,
                    SpecDocument::Requirements,
                    content,
                )?;
                Ok(json!({"specId": spec_id, "document": "requirements", "version": manifest.version}))
            }
            OperationPayload::UpdateDesign { spec_id, content } => {
                let manifest =
                    self.materializer.update_document(spec_id, SpecDocument::Design, content)?;
                Ok(json!({"specId": spec_id, "document": "design", "version": manifest.version}))
            }
            OperationPayload::UpdateTasks { spec_id, content } => {
                let manifest =
                    self.materializer.update_document(spec_id, SpecDocument::Tasks, content)?;
                Ok(json!({"specId": spec_id, "document": "tasks", "version": manifest.version}))
            }

            OperationPayload::AddUserStory { spec_id, as_a, i_want, so_that, requirements } => {
                let story = UserStory {
                    as_a: as_a.clone(),
                    i_want: i_want.clone(),
                    so_that: so_that.clone(),
                    requirements: requirements.clone(),
                };
                let story_id = self.materializer.add_user_story(spec_id, &story)?;
                Ok(json!({"specId": spec_id, "storyId": story_id}))
            }

            OperationPayload::UpdateTaskStatus { spec_id, task_number, status } => {
                self.materializer.update_task_status(spec_id, task_number, *status)?;
                Ok(json!({"specId": spec_id, "taskNumber": task_number, "status": status}))
            }

            OperationPayload::DeleteSpec { spec_id } => {
                let deleted = self.materializer.delete_spec(spec_id)?;
                Ok(json!({"specId": spec_id, "deleted": deleted}))
            }

            OperationPayload::SetCurrentSpec { spec_id } => {
                self.materializer.set_current(spec_id)?;
                Ok(json!({"specId": spec_id, "isCurrent": true}))
            }

            OperationPayload::FileCreate { path, content } => {
                self.workspace.create_file(path, content)?;
                Ok(json!({"path": path, "created": true}))
            }
            OperationPayload::FileWrite { path, content } => {
                self.workspace.write_file(path, content)?;
                Ok(json!({"path": path, "bytes": content.len()}))
            }
            OperationPayload::FileDelete { path } => {
                let deleted = self.workspace.delete_file(path)?;
                Ok(json!({"path": path, "deleted": deleted}))
            }
            OperationPayload::DirectoryCreate { path } => {
                self.workspace.create_dir(path)?;
                Ok(json!({"path": path, "created": true}))
            }

            // Liveness operations have no local side effect beyond the
            // sync-state refresh the executor already performs.
            OperationPayload::SyncStatus | OperationPayload::Heartbeat => {
                Ok(json!({"acknowledged": true}))
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
