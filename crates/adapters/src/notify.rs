// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification sink.
//!
//! The executor reports progress, terminal outcomes, and escalated
//! conflicts through this trait. Delivery preferences (kind toggles,
//! quiet hours, minimum priority) belong to the sink, not to the
//! broker's state.

use async_trait::async_trait;
use specforge_core::{Conflict, Operation, OperationPriority, OperationResult};
use specforge_core::{Clock, SystemClock};

/// Sink for user-facing notifications. A null sink is acceptable.
#[async_trait]
pub trait NotifySink: Clone + Send + Sync + 'static {
    async fn on_progress(&self, operation: &Operation, percent: u8, message: &str);
    async fn on_success(&self, operation: &Operation, result: &OperationResult);
    async fn on_failure(&self, operation: &Operation, error: &str);
    async fn on_conflict(&self, conflict: &Conflict);
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifySink;

#[async_trait]
impl NotifySink for NullNotifySink {
    async fn on_progress(&self, _operation: &Operation, _percent: u8, _message: &str) {}
    async fn on_success(&self, _operation: &Operation, _result: &OperationResult) {}
    async fn on_failure(&self, _operation: &Operation, _error: &str) {}
    async fn on_conflict(&self, _conflict: &Conflict) {}
}

/// Delivery preferences for the desktop sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyPreferences {
    pub success_enabled: bool,
    pub failure_enabled: bool,
    pub conflict_enabled: bool,
    pub progress_enabled: bool,
    /// Suppress everything below this priority.
    pub min_priority: OperationPriority,
    /// Local hours `[start, end)` during which nothing is shown.
    /// A wrapped range like `(22, 7)` spans midnight.
    pub quiet_hours: Option<(u8, u8)>,
}

impl Default for NotifyPreferences {
    fn default() -> Self {
        Self {
            success_enabled: true,
            failure_enabled: true,
            conflict_enabled: true,
            progress_enabled: false,
            min_priority: OperationPriority::Low,
            quiet_hours: None,
        }
    }
}

impl NotifyPreferences {
    fn quiet_at(&self, hour: u8) -> bool {
        match self.quiet_hours {
            None => false,
            Some((start, end)) if start <= end => hour >= start && hour < end,
            Some((start, end)) => hour >= start || hour < end,
        }
    }
}

/// Desktop notification sink using notify-rust.
///
/// On macOS, `notify-rust` uses `mac-notification-sys` (Cocoa bindings)
/// to send notifications via the Notification Center. The first
/// notification triggers `ensure_application_set()` which runs an
/// AppleScript to look up a bundle identifier; in an extension-host
/// context without Automation permissions that lookup blocks forever,
/// so the bundle identifier is pre-set at construction time.
#[derive(Clone)]
pub struct DesktopNotifySink<C: Clock = SystemClock> {
    prefs: NotifyPreferences,
    clock: C,
}

impl DesktopNotifySink<SystemClock> {
    pub fn new(prefs: NotifyPreferences) -> Self {
        Self::with_clock(prefs, SystemClock)
    }
}

impl<C: Clock> DesktopNotifySink<C> {
    pub fn with_clock(prefs: NotifyPreferences, clock: C) -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self { prefs, clock }
    }

    fn suppressed(&self, priority: OperationPriority) -> bool {
        if priority < self.prefs.min_priority {
            return true;
        }
        // Quiet hours are interpreted in UTC; the hosting layer owns
        // timezone mapping if it needs local time.
        let hour = chrono::Timelike::hour(&self.clock.now_utc()) as u8;
        self.prefs.quiet_at(hour)
    }

    fn deliver(&self, title: String, message: String) {
        // notify_rust::Notification::show() is synchronous on some
        // platforms. Fire-and-forget on tokio's bounded blocking pool so
        // the processing loop never waits on the notification daemon.
        tokio::task::spawn_blocking(move || {
            match notify_rust::Notification::new().summary(&title).body(&message).show() {
                Ok(_) => tracing::debug!(%title, "desktop notification sent"),
                Err(e) => tracing::warn!(%title, error = %e, "desktop notification failed"),
            }
        });
    }
}

#[async_trait]
impl<C: Clock> NotifySink for DesktopNotifySink<C> {
    async fn on_progress(&self, operation: &Operation, percent: u8, message: &str) {
        if !self.prefs.progress_enabled || self.suppressed(operation.priority) {
            return;
        }
        self.deliver(
            format!("{} {percent}%", operation.op_type()),
            message.to_string(),
        );
    }

    async fn on_success(&self, operation: &Operation, result: &OperationResult) {
        if !self.prefs.success_enabled || self.suppressed(operation.priority) {
            return;
        }
        let detail = result
            .duration_ms
            .map(|ms| format!("completed in {ms} ms"))
            .unwrap_or_else(|| "completed".to_string());
        self.deliver(format!("{} succeeded", operation.op_type()), detail);
    }

    async fn on_failure(&self, operation: &Operation, error: &str) {
        if !self.prefs.failure_enabled || self.suppressed(operation.priority) {
            return;
        }
        let retry_hint = if operation.retries_remaining() {
            format!(" (will retry, attempt {}/{})", operation.retry_count, operation.max_retries)
        } else {
            String::new()
        };
        self.deliver(format!("{} failed", operation.op_type()), format!("{error}{retry_hint}"));
    }

    async fn on_conflict(&self, conflict: &Conflict) {
        if !self.prefs.conflict_enabled {
            return;
        }
        self.deliver(
            format!("conflict: {}", conflict.conflict_type),
            format!("{} ({} operations affected)", conflict.description, conflict.operation_ids.len()),
        );
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{async_trait, Conflict, NotifySink, Operation, OperationResult};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// One recorded sink invocation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SinkCall {
        Progress { operation_id: String, percent: u8, message: String },
        Success { operation_id: String },
        Failure { operation_id: String, error: String },
        Conflict { conflict_id: String, description: String },
    }

    /// Records every call for assertions.
    #[derive(Clone, Default)]
    pub struct FakeNotifySink {
        calls: Arc<Mutex<Vec<SinkCall>>>,
    }

    impl FakeNotifySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().clone()
        }

        pub fn failures(&self) -> Vec<SinkCall> {
            self.calls
                .lock()
                .iter()
                .filter(|c| matches!(c, SinkCall::Failure { .. }))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl NotifySink for FakeNotifySink {
        async fn on_progress(&self, operation: &Operation, percent: u8, message: &str) {
            self.calls.lock().push(SinkCall::Progress {
                operation_id: operation.id.to_string(),
                percent,
                message: message.to_string(),
            });
        }

        async fn on_success(&self, operation: &Operation, _result: &OperationResult) {
            self.calls.lock().push(SinkCall::Success { operation_id: operation.id.to_string() });
        }

        async fn on_failure(&self, operation: &Operation, error: &str) {
            self.calls.lock().push(SinkCall::Failure {
                operation_id: operation.id.to_string(),
                error: error.to_string(),
            });
        }

        async fn on_conflict(&self, conflict: &Conflict) {
            self.calls.lock().push(SinkCall::Conflict {
                conflict_id: conflict.id.to_string(),
                description: conflict.description.clone(),
            });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifySink, SinkCall};

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
