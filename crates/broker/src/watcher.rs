// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-system watcher over the three protocol files.
//!
//! Raw notify events are mapped to a [`WatchedFile`] key and forwarded
//! into the broker's run loop, where each key gets its own debounce
//! window. The watcher thread never touches broker state.

use specforge_storage::paths::{OPERATIONS_FILE, RESULTS_FILE, SYNC_FILE};
use std::path::Path;
use tokio::sync::mpsc;

/// Which protocol file changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchedFile {
    Queue,
    State,
    Results,
}

impl WatchedFile {
    /// Debounce timer key for this file.
    pub fn debounce_key(self) -> &'static str {
        match self {
            WatchedFile::Queue => "debounce:queue",
            WatchedFile::State => "debounce:state",
            WatchedFile::Results => "debounce:results",
        }
    }

    pub fn from_debounce_key(key: &str) -> Option<Self> {
        match key {
            "debounce:queue" => Some(WatchedFile::Queue),
            "debounce:state" => Some(WatchedFile::State),
            "debounce:results" => Some(WatchedFile::Results),
            _ => None,
        }
    }

    fn classify(path: &Path) -> Option<Self> {
        match path.file_name()?.to_str()? {
            OPERATIONS_FILE => Some(WatchedFile::Queue),
            SYNC_FILE => Some(WatchedFile::State),
            RESULTS_FILE => Some(WatchedFile::Results),
            _ => None,
        }
    }
}

/// Running watcher over a `.vscode/` directory. Dropping it stops the
/// underlying notify watcher.
pub struct FileWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `vscode_dir` for changes to the protocol files. Events
    /// arrive on the returned channel already keyed; rename-swap writes
    /// surface as create/modify events on the final path.
    pub fn start(
        vscode_dir: &Path,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchedFile>), notify::Error> {
        use notify::Watcher;

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher =
            notify::recommended_watcher(move |event: Result<notify::Event, notify::Error>| {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "file watcher error");
                        return;
                    }
                };
                if !matches!(
                    event.kind,
                    notify::EventKind::Create(_)
                        | notify::EventKind::Modify(_)
                        | notify::EventKind::Remove(_)
                ) {
                    return;
                }
                for path in &event.paths {
                    if let Some(key) = WatchedFile::classify(path) {
                        // Receiver gone means the broker is disposing.
                        let _ = tx.send(key);
                    }
                }
            })?;
        watcher.watch(vscode_dir, notify::RecursiveMode::NonRecursive)?;
        Ok((Self { _watcher: watcher }, rx))
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
