// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksum envelope for the protocol files.
//!
//! Each persisted document carries `__checksum`, `__version`, and
//! `__schema` keys. The checksum is the SHA-256 hex digest of the
//! document serialized without the `__checksum` key; serde_json's
//! default map is ordered, so the serialization is canonical.

use crate::error::StorageError;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

pub const CHECKSUM_KEY: &str = "__checksum";
pub const VERSION_KEY: &str = "__version";
pub const SCHEMA_KEY: &str = "__schema";

fn digest_of(value: &Value) -> Result<String, StorageError> {
    let canonical = serde_json::to_string(value)?;
    Ok(format!("{:x}", Sha256::digest(canonical.as_bytes())))
}

/// Stamp schema/version metadata and the content checksum onto a
/// document. The value must be a JSON object.
pub fn embed_checksum(
    mut value: Value,
    schema: &str,
    schema_version: u32,
) -> Result<Value, StorageError> {
    let Some(map) = value.as_object_mut() else {
        return Err(StorageError::Json(serde::ser::Error::custom(
            "protocol documents must serialize to JSON objects",
        )));
    };
    map.insert(SCHEMA_KEY.to_string(), Value::String(schema.to_string()));
    map.insert(VERSION_KEY.to_string(), Value::from(schema_version));
    map.remove(CHECKSUM_KEY);
    let digest = digest_of(&value)?;
    if let Some(map) = value.as_object_mut() {
        map.insert(CHECKSUM_KEY.to_string(), Value::String(digest));
    }
    Ok(value)
}

/// Verify and strip the embedded checksum. Documents without a
/// `__checksum` key are accepted as-is (the peer may predate the
/// envelope); a present-but-wrong checksum is an error.
pub fn verify_checksum(mut value: Value, path: &Path) -> Result<Value, StorageError> {
    let Some(map) = value.as_object_mut() else {
        return Err(StorageError::Corrupt {
            path: path.to_path_buf(),
            detail: "expected a JSON object".to_string(),
            backup: None,
        });
    };

    let Some(found) = map.remove(CHECKSUM_KEY) else {
        return Ok(value);
    };
    let found = found.as_str().unwrap_or_default().to_string();
    let expected = digest_of(&value)?;
    if found != expected {
        return Err(StorageError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod tests;
