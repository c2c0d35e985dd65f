// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seed content for a freshly-created spec.

/// Initial `requirements.md`.
pub fn requirements(name: &str, description: &str) -> String {
    let mut doc = format!("# Requirements: {name}\n\n");
    if !description.is_empty() {
        doc.push_str(description);
        doc.push_str("\n\n");
    }
    doc.push_str("## Overview\n\nDescribe the problem this specification solves.\n");
    doc
}

/// Initial `design.md`.
pub fn design(name: &str) -> String {
    format!(
        "# Design: {name}\n\n## Architecture\n\nOutline the approach, its components, \
         and how they interact.\n\n## Decisions\n\nRecord choices and their trade-offs here.\n"
    )
}

/// Initial `tasks.md` with a starter checklist.
pub fn tasks(name: &str) -> String {
    format!(
        "# Tasks: {name}\n\n\
         - [ ] 1. Capture requirements\n\
         - [ ] 2. Draft the design\n\
         - [ ] 3. Break down implementation tasks\n"
    )
}

#[cfg(test)]
#[path = "templates_tests.rs"]
mod tests;
