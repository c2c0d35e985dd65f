// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec-tree operations.

use crate::error::MaterializerError;
use crate::manifest::SpecManifest;
use crate::spec_id::{check_spec_id, derive_spec_id};
use crate::stories::{append_story, UserStory};
use crate::tasks::set_task_status;
use crate::templates;
use specforge_core::{Clock, TaskStatus};
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "spec.json";

/// The three markdown documents of a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecDocument {
    Requirements,
    Design,
    Tasks,
}

impl SpecDocument {
    pub fn file_name(self) -> &'static str {
        match self {
            SpecDocument::Requirements => "requirements.md",
            SpecDocument::Design => "design.md",
            SpecDocument::Tasks => "tasks.md",
        }
    }
}

specforge_core::simple_display! {
    SpecDocument {
        Requirements => "requirements",
        Design => "design",
        Tasks => "tasks",
    }
}

/// Maps logical spec mutations onto `.specifications/<specId>/`.
#[derive(Clone)]
pub struct SpecMaterializer<C: Clock> {
    root: PathBuf,
    clock: C,
}

impl<C: Clock> SpecMaterializer<C> {
    /// `root` is the `.specifications/` directory.
    pub fn new(root: impl Into<PathBuf>, clock: C) -> Self {
        Self { root: root.into(), clock }
    }

    pub fn spec_dir(&self, spec_id: &str) -> PathBuf {
        self.root.join(spec_id)
    }

    pub fn exists(&self, spec_id: &str) -> bool {
        self.spec_dir(spec_id).join(MANIFEST_FILE).is_file()
    }

    /// Create a spec directory with the four template files.
    /// Creating an id that already exists is an error, not a clobber.
    pub fn create_spec(
        &self,
        name: &str,
        description: &str,
        spec_id: Option<&str>,
    ) -> Result<SpecManifest, MaterializerError> {
        let spec_id = match spec_id {
            Some(id) => {
                check_spec_id(id)?;
                id.to_string()
            }
            None => derive_spec_id(name)?,
        };
        if self.exists(&spec_id) {
            return Err(MaterializerError::SpecExists(spec_id));
        }

        let dir = self.spec_dir(&spec_id);
        fs::create_dir_all(&dir).map_err(|e| MaterializerError::from_io(&dir, e))?;

        let manifest = SpecManifest::new(&spec_id, name, description, self.clock.now_utc());
        self.write_manifest(&manifest)?;
        write_file(&dir.join("requirements.md"), &templates::requirements(name, description))?;
        write_file(&dir.join("design.md"), &templates::design(name))?;
        write_file(&dir.join("tasks.md"), &templates::tasks(name))?;

        tracing::info!(spec_id = %spec_id, "created spec");
        Ok(manifest)
    }

    /// Overwrite one of the spec's markdown documents.
    pub fn update_document(
        &self,
        spec_id: &str,
        document: SpecDocument,
        content: &str,
    ) -> Result<SpecManifest, MaterializerError> {
        let mut manifest = self.load_manifest(spec_id)?;
        write_file(&self.spec_dir(spec_id).join(document.file_name()), content)?;
        manifest.touch(self.clock.now_utc());
        self.write_manifest(&manifest)?;
        tracing::debug!(spec_id = %spec_id, document = %document, "updated spec document");
        Ok(manifest)
    }

    /// Flip a task checkbox in `tasks.md`.
    pub fn update_task_status(
        &self,
        spec_id: &str,
        task_number: &str,
        status: TaskStatus,
    ) -> Result<SpecManifest, MaterializerError> {
        let mut manifest = self.load_manifest(spec_id)?;
        let path = self.spec_dir(spec_id).join(SpecDocument::Tasks.file_name());
        let content = read_file(&path)?;
        let updated = set_task_status(spec_id, &content, task_number, status)?;
        write_file(&path, &updated)?;
        manifest.touch(self.clock.now_utc());
        self.write_manifest(&manifest)?;
        Ok(manifest)
    }

    /// Append a user story to `requirements.md`, returning the assigned
    /// `US-<NNN>` id.
    pub fn add_user_story(
        &self,
        spec_id: &str,
        story: &UserStory,
    ) -> Result<String, MaterializerError> {
        let mut manifest = self.load_manifest(spec_id)?;
        let path = self.spec_dir(spec_id).join(SpecDocument::Requirements.file_name());
        let content = read_file(&path)?;
        let (updated, story_id) = append_story(&content, story);
        write_file(&path, &updated)?;
        manifest.touch(self.clock.now_utc());
        self.write_manifest(&manifest)?;
        tracing::debug!(spec_id = %spec_id, story_id = %story_id, "appended user story");
        Ok(story_id)
    }

    /// Recursively delete a spec directory. Deleting a missing spec is
    /// a success: returns whether anything was removed.
    pub fn delete_spec(&self, spec_id: &str) -> Result<bool, MaterializerError> {
        check_spec_id(spec_id)?;
        let dir = self.spec_dir(spec_id);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(|e| MaterializerError::from_io(&dir, e))?;
        tracing::info!(spec_id = %spec_id, "deleted spec");
        Ok(true)
    }

    /// Mark one spec as current, clearing the flag on every sibling.
    pub fn set_current(&self, spec_id: &str) -> Result<SpecManifest, MaterializerError> {
        let mut target = self.load_manifest(spec_id)?;
        for mut other in self.list()? {
            if other.spec_id != spec_id && other.is_current {
                other.is_current = false;
                self.write_manifest(&other)?;
            }
        }
        target.is_current = true;
        target.updated_at = self.clock.now_utc();
        self.write_manifest(&target)?;
        Ok(target)
    }

    /// All materialized spec manifests, sorted by spec id.
    pub fn list(&self) -> Result<Vec<SpecManifest>, MaterializerError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MaterializerError::from_io(&self.root, e)),
        };

        let mut manifests = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let spec_id = entry.file_name().to_string_lossy().to_string();
            match self.load_manifest(&spec_id) {
                Ok(manifest) => manifests.push(manifest),
                // Directories without a readable manifest are skipped,
                // not fatal: the peer may be mid-create.
                Err(e) => {
                    tracing::warn!(spec_id = %spec_id, error = %e, "skipping unreadable spec")
                }
            }
        }
        manifests.sort_by(|a, b| a.spec_id.cmp(&b.spec_id));
        Ok(manifests)
    }

    pub fn load_manifest(&self, spec_id: &str) -> Result<SpecManifest, MaterializerError> {
        check_spec_id(spec_id)?;
        let path = self.spec_dir(spec_id).join(MANIFEST_FILE);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MaterializerError::SpecNotFound(spec_id.to_string()))
            }
            Err(e) => return Err(MaterializerError::from_io(&path, e)),
        };
        serde_json::from_str(&body).map_err(|e| MaterializerError::MalformedManifest {
            path,
            detail: e.to_string(),
        })
    }

    fn write_manifest(&self, manifest: &SpecManifest) -> Result<(), MaterializerError> {
        let path = self.spec_dir(&manifest.spec_id).join(MANIFEST_FILE);
        let body = serde_json::to_string_pretty(manifest).map_err(|e| {
            MaterializerError::MalformedManifest { path: path.clone(), detail: e.to_string() }
        })?;
        write_file(&path, &body)
    }
}

fn read_file(path: &Path) -> Result<String, MaterializerError> {
    fs::read_to_string(path).map_err(|e| MaterializerError::from_io(path, e))
}

fn write_file(path: &Path, content: &str) -> Result<(), MaterializerError> {
    let mut body = content.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    fs::write(path, body).map_err(|e| MaterializerError::from_io(path, e))
}

#[cfg(test)]
#[path = "materializer_tests.rs"]
mod tests;
