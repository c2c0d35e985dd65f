// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! specforge-materializer: logical spec mutations as file-tree changes.
//!
//! A specification lives at `.specifications/<specId>/` as four files:
//! `spec.json`, `requirements.md`, `design.md`, `tasks.md`. This crate
//! turns the executor's logical operations (create spec, update a
//! document, flip a task checkbox, append a user story, delete) into
//! idempotent edits of that tree, plus the narrow workspace-relative
//! file operations the file-scoped operation types need.

mod error;
mod manifest;
mod materializer;
mod spec_id;
mod stories;
mod tasks;
mod templates;
mod workspace_fs;

pub use error::MaterializerError;
pub use manifest::{SpecManifest, SpecStatus};
pub use materializer::{SpecDocument, SpecMaterializer};
pub use spec_id::derive_spec_id;
pub use stories::UserStory;
pub use workspace_fs::WorkspaceFs;
