// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file store.
//!
//! Writes go to a temp file in the same directory and are renamed over
//! the target, so a reader sees either the previous document or the new
//! one, never a partial write. The out-of-process peer follows the same
//! rename-swap discipline; the in-process lock only serializes our own
//! writers.

use crate::checksum::{embed_checksum, verify_checksum};
use crate::error::StorageError;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Temp files older than this are considered orphaned by a crashed
/// writer and removed during cleanup.
pub const ORPHAN_TMP_AGE: Duration = Duration::from_secs(300);

/// Atomic reader/writer for checksummed JSON documents.
pub struct AtomicFileStore {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    lock_timeout: Duration,
    backups_enabled: bool,
    max_backups: u32,
    tmp_seq: AtomicU64,
}

impl AtomicFileStore {
    pub fn new(lock_timeout: Duration, backups_enabled: bool, max_backups: u32) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            lock_timeout,
            backups_enabled,
            max_backups,
            tmp_seq: AtomicU64::new(0),
        }
    }

    /// Run `f` while holding the advisory write lock for `path`.
    fn with_lock<T>(
        &self,
        path: &Path,
        f: impl FnOnce() -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let file_lock = {
            let mut locks = self.locks.lock();
            locks.entry(path.to_path_buf()).or_default().clone()
        };
        let Some(_guard) = file_lock.try_lock_for(self.lock_timeout) else {
            return Err(StorageError::LockTimeout(path.to_path_buf()));
        };
        f()
    }

    fn tmp_path(&self, path: &Path) -> PathBuf {
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        path.with_file_name(format!("{name}.tmp-{}-{seq}", std::process::id()))
    }

    /// Serialize `value`, stamp the checksum envelope, and swap it into
    /// place.
    pub fn write_json<T: Serialize>(
        &self,
        path: &Path,
        value: &T,
        schema: &str,
        schema_version: u32,
    ) -> Result<(), StorageError> {
        self.with_lock(path, || {
            let doc = embed_checksum(serde_json::to_value(value)?, schema, schema_version)?;
            let mut body = serde_json::to_string_pretty(&doc)?;
            body.push('\n');

            let tmp = self.tmp_path(path);
            let written = (|| {
                let mut file =
                    fs::File::create(&tmp).map_err(|e| StorageError::from_io(&tmp, e))?;
                file.write_all(body.as_bytes()).map_err(|e| StorageError::from_io(&tmp, e))?;
                file.sync_all().map_err(|e| StorageError::from_io(&tmp, e))?;
                Ok(())
            })();
            if let Err(e) = written {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }

            if self.backups_enabled && path.exists() {
                let bak = rotate_bak_path(path, self.max_backups);
                if let Err(e) = fs::copy(path, &bak) {
                    tracing::warn!(path = %path.display(), error = %e, "backup copy failed");
                }
            }

            fs::rename(&tmp, path).map_err(|e| {
                let _ = fs::remove_file(&tmp);
                StorageError::from_io(path, e)
            })?;
            tracing::debug!(path = %path.display(), bytes = body.len(), "wrote protocol file");
            Ok(())
        })
    }

    /// Read and verify a document. A missing file is `Ok(None)`; parse
    /// failures surface as `Corrupt` carrying the newest backup path.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StorageError> {
        let body = match fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from_io(path, e)),
        };

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            StorageError::Corrupt {
                path: path.to_path_buf(),
                detail: e.to_string(),
                backup: newest_backup(path),
            }
        })?;
        let value = verify_checksum(value, path)?;
        let parsed = serde_json::from_value(value).map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            detail: e.to_string(),
            backup: newest_backup(path),
        })?;
        Ok(Some(parsed))
    }

    /// Remove orphaned temp files in `dir` older than
    /// [`ORPHAN_TMP_AGE`]. Returns how many were deleted.
    pub fn cleanup_temp_files(&self, dir: &Path) -> usize {
        let Ok(entries) = fs::read_dir(dir) else {
            return 0;
        };
        let cutoff = SystemTime::now() - ORPHAN_TMP_AGE;
        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().contains(".tmp-") {
                continue;
            }
            let stale = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(|mtime| mtime < cutoff)
                .unwrap_or(false);
            if stale && fs::remove_file(entry.path()).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(dir = %dir.display(), removed, "cleaned orphaned temp files");
        }
        removed
    }
}

/// Pick the next backup path, rotating older backups out.
///
/// Keeps up to `max_backups` backups: `.bak`, `.bak.2`, … `.bak.N`.
/// The oldest backup is removed when the limit is reached.
fn rotate_bak_path(path: &Path, max_backups: u32) -> PathBuf {
    let bak = |n: u32| {
        let name = path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
        if n == 1 {
            path.with_file_name(format!("{name}.bak"))
        } else {
            path.with_file_name(format!("{name}.bak.{n}"))
        }
    };

    // Remove the oldest if at capacity
    let oldest = bak(max_backups.max(1));
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    // Shift existing backups up by one
    for n in (1..max_backups.max(1)).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

/// Newest existing backup for `path`, if any.
fn newest_backup(path: &Path) -> Option<PathBuf> {
    let name = path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
    let bak = path.with_file_name(format!("{name}.bak"));
    bak.exists().then_some(bak)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
