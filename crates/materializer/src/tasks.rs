// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tasks.md` checkbox editing.
//!
//! Task lines look like `- [ ] 2.1. Write the parser` (possibly
//! indented). Completed tasks carry `[x]`. The task number is matched
//! up to its trailing dot, so `2.1` never matches `2.11`.

use crate::error::MaterializerError;
use specforge_core::TaskStatus;

/// Flip the checkbox for `task_number` according to `status`.
/// `completed` checks the box; `pending` and `in_progress` uncheck it.
/// Returns the rewritten document.
pub fn set_task_status(
    spec_id: &str,
    content: &str,
    task_number: &str,
    status: TaskStatus,
) -> Result<String, MaterializerError> {
    let marker = if status == TaskStatus::Completed { "[x]" } else { "[ ]" };
    let mut found = false;

    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            if !found && matches_task(line, task_number) {
                found = true;
                rewrite_checkbox(line, marker)
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        return Err(MaterializerError::TaskNotFound {
            spec_id: spec_id.to_string(),
            task: task_number.to_string(),
        });
    }

    let mut doc = lines.join("\n");
    if content.ends_with('\n') {
        doc.push('\n');
    }
    Ok(doc)
}

/// Whether `line` is a checkbox item for exactly `task_number`.
fn matches_task(line: &str, task_number: &str) -> bool {
    let trimmed = line.trim_start();
    let rest = match trimmed.strip_prefix("- [ ]").or_else(|| trimmed.strip_prefix("- [x]")) {
        Some(rest) => rest.trim_start(),
        None => return false,
    };
    match rest.strip_prefix(task_number) {
        Some(after) => after.starts_with('.') || after.starts_with(' ') || after.is_empty(),
        None => false,
    }
}

fn rewrite_checkbox(line: &str, marker: &str) -> String {
    if let Some(pos) = line.find("- [") {
        let (head, tail) = line.split_at(pos);
        // tail starts with "- [?]"
        format!("{head}- {marker}{}", &tail[5..])
    } else {
        line.to_string()
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
