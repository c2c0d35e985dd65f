// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `spec.json` manifest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecStatus {
    #[default]
    Draft,
    InProgress,
    Complete,
}

specforge_core::simple_display! {
    SpecStatus {
        Draft => "draft",
        InProgress => "in_progress",
        Complete => "complete",
    }
}

/// Contents of `spec.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecManifest {
    pub spec_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Bumped on every mutation of the spec's files.
    pub version: u32,
    #[serde(default)]
    pub status: SpecStatus,
    #[serde(default)]
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpecManifest {
    pub fn new(
        spec_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            spec_id: spec_id.into(),
            name: name.into(),
            description: description.into(),
            version: 1,
            status: SpecStatus::Draft,
            is_current: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a mutation: bump the version and stamp the time.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}
