// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-story blocks in `requirements.md`.
//!
//! Stories are appended as `## User Story US-<NNN>` sections, numbered
//! from the count already present in the document. Acceptance criteria
//! use EARS phrasing: entries that already start with an EARS keyword
//! (`WHEN`, `IF`, `WHILE`, `WHERE`) are kept verbatim; bare responses
//! get a generic event condition.

const STORY_HEADING: &str = "## User Story US-";

const EARS_KEYWORDS: [&str; 4] = ["WHEN ", "IF ", "WHILE ", "WHERE "];

/// A user story with its acceptance criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStory {
    pub as_a: String,
    pub i_want: String,
    pub so_that: String,
    pub requirements: Vec<String>,
}

/// Number of stories already present in the document.
pub fn story_count(content: &str) -> usize {
    content.lines().filter(|l| l.trim_start().starts_with(STORY_HEADING)).count()
}

fn criterion_line(story_id: &str, index: usize, requirement: &str) -> String {
    let tag = format!("[{story_id}-R{:02}]", index + 1);
    let req = requirement.trim();
    if EARS_KEYWORDS.iter().any(|k| req.starts_with(k)) {
        format!("- {tag} {req}")
    } else {
        format!("- {tag} WHEN the story is exercised, THE SYSTEM SHALL {req}")
    }
}

/// Append `story` to the document, returning the new content and the
/// assigned story id (`US-<NNN>`).
pub fn append_story(content: &str, story: &UserStory) -> (String, String) {
    let story_id = format!("US-{:03}", story_count(content) + 1);

    let mut doc = content.to_string();
    if !doc.is_empty() && !doc.ends_with('\n') {
        doc.push('\n');
    }
    if !doc.is_empty() {
        doc.push('\n');
    }

    doc.push_str(&format!("{STORY_HEADING}{}\n\n", &story_id[3..]));
    doc.push_str(&format!(
        "**As a** {}, **I want** {}, **so that** {}.\n",
        story.as_a.trim(),
        story.i_want.trim(),
        story.so_that.trim()
    ));

    if !story.requirements.is_empty() {
        doc.push_str("\n### Acceptance Criteria\n\n");
        for (i, req) in story.requirements.iter().enumerate() {
            doc.push_str(&criterion_line(&story_id, i, req));
            doc.push('\n');
        }
    }

    (doc, story_id)
}

#[cfg(test)]
#[path = "stories_tests.rs"]
mod tests;
