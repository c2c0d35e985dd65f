// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Payload validation.
//!
//! Validation collects every offending field before rejecting, so a
//! caller sees all problems at once instead of fixing them one round
//! trip at a time.

use crate::operation::OperationPayload;

/// Upper bound for spec names.
pub const MAX_NAME_LEN: usize = 100;
/// Upper bound for spec descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Upper bound for markdown content in update operations.
pub const MAX_CONTENT_LEN: usize = 100_000;

/// One failed field with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Validation failure listing every offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed:")?;
        for e in &self.errors {
            write!(f, " {}: {};", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Whether `id` is a well-formed spec id (lowercase, digits, hyphens).
pub fn is_valid_spec_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Whether `path` is a well-formed workspace-relative path: non-empty,
/// relative, and free of `..` segments.
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    !path.split(['/', '\\']).any(|seg| seg == "..")
}

fn push(errors: &mut Vec<FieldError>, field: &'static str, message: String) {
    errors.push(FieldError { field, message });
}

fn check_spec_id(errors: &mut Vec<FieldError>, field: &'static str, id: &str) {
    if id.is_empty() {
        push(errors, field, "must not be empty".to_string());
    } else if !is_valid_spec_id(id) {
        push(
            errors,
            field,
            format!("'{id}' must contain only lowercase letters, digits, and hyphens"),
        );
    }
}

fn check_content(errors: &mut Vec<FieldError>, content: &str) {
    if content.is_empty() {
        push(errors, "content", "must not be empty".to_string());
    } else if content.chars().count() > MAX_CONTENT_LEN {
        push(errors, "content", format!("must be at most {MAX_CONTENT_LEN} characters"));
    }
}

/// Validate a payload, reporting every failed field.
pub fn validate(payload: &OperationPayload) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    match payload {
        OperationPayload::CreateSpec { name, description, spec_id } => {
            if name.trim().is_empty() {
                push(&mut errors, "name", "must not be empty".to_string());
            } else if name.chars().count() > MAX_NAME_LEN {
                push(&mut errors, "name", format!("must be at most {MAX_NAME_LEN} characters"));
            }
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                push(
                    &mut errors,
                    "description",
                    format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
                );
            }
            if let Some(id) = spec_id {
                check_spec_id(&mut errors, "specId", id);
            }
        }

        OperationPayload::UpdateRequirements { spec_id, content }
        | OperationPayload::UpdateDesign { spec_id, content }
        | OperationPayload::UpdateTasks { spec_id, content } => {
            check_spec_id(&mut errors, "specId", spec_id);
            check_content(&mut errors, content);
        }

        OperationPayload::AddUserStory { spec_id, as_a, i_want, so_that, .. } => {
            check_spec_id(&mut errors, "specId", spec_id);
            for (field, value) in [("asA", as_a), ("iWant", i_want), ("soThat", so_that)] {
                if value.trim().is_empty() {
                    push(&mut errors, field, "must not be empty".to_string());
                }
            }
        }

        OperationPayload::UpdateTaskStatus { spec_id, task_number, .. } => {
            check_spec_id(&mut errors, "specId", spec_id);
            if task_number.trim().is_empty() {
                push(&mut errors, "taskNumber", "must not be empty".to_string());
            }
        }

        OperationPayload::DeleteSpec { spec_id } | OperationPayload::SetCurrentSpec { spec_id } => {
            check_spec_id(&mut errors, "specId", spec_id);
        }

        OperationPayload::FileCreate { path, .. }
        | OperationPayload::FileWrite { path, .. }
        | OperationPayload::FileDelete { path }
        | OperationPayload::DirectoryCreate { path } => {
            if !is_safe_relative_path(path) {
                push(
                    &mut errors,
                    "path",
                    format!("'{path}' must be a non-empty workspace-relative path without '..'"),
                );
            }
        }

        OperationPayload::SyncStatus | OperationPayload::Heartbeat => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
