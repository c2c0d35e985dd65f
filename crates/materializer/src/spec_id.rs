// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec id derivation.

use crate::error::MaterializerError;
use specforge_core::validate::is_valid_spec_id;

/// Derive a spec id from a display name: lowercase, drop everything but
/// alphanumerics, spaces, and hyphens, collapse runs of whitespace and
/// hyphens into single hyphens, and trim hyphens at the ends.
pub fn derive_spec_id(name: &str) -> Result<String, MaterializerError> {
    let mut id = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !id.is_empty() {
                id.push('-');
            }
            pending_hyphen = false;
            id.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }

    if id.is_empty() {
        return Err(MaterializerError::InvalidSpecId(name.to_string()));
    }
    Ok(id)
}

/// Validate a caller-supplied spec id.
pub fn check_spec_id(id: &str) -> Result<(), MaterializerError> {
    if is_valid_spec_id(id) {
        Ok(())
    } else {
        Err(MaterializerError::InvalidSpecId(id.to_string()))
    }
}

#[cfg(test)]
#[path = "spec_id_tests.rs"]
mod tests;
