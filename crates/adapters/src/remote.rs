// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional remote dispatch seam.
//!
//! Spec and file mutations always execute locally; `heartbeat` and
//! `sync_status` operations may instead be routed to a remote MCP
//! endpoint when one is configured. Remote failures are retryable.

use async_trait::async_trait;
use specforge_core::{ErrorCode, Operation};
use thiserror::Error;

/// Errors from remote dispatch.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("remote endpoint unavailable")]
    Unavailable,
    #[error("remote dispatch failed: {0}")]
    Failed(String),
}

impl RemoteError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RemoteError::Unavailable => ErrorCode::RemoteUnavailable,
            RemoteError::Failed(_) => ErrorCode::RemoteFailed,
        }
    }
}

/// Outbound transport to a remote MCP endpoint.
#[async_trait]
pub trait RemoteDispatcher: Send + Sync + 'static {
    /// Whether the endpoint is currently reachable. The executor falls
    /// back to local handling when this is false.
    fn is_available(&self) -> bool;

    async fn dispatch(&self, operation: &Operation) -> Result<serde_json::Value, RemoteError>;
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{async_trait, Operation, RemoteDispatcher, RemoteError};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Scripted remote endpoint for tests.
    #[derive(Clone, Default)]
    pub struct FakeRemoteDispatcher {
        inner: Arc<Mutex<FakeRemoteState>>,
    }

    #[derive(Default)]
    struct FakeRemoteState {
        available: bool,
        outcomes: VecDeque<Result<serde_json::Value, RemoteError>>,
        dispatched: Vec<String>,
    }

    impl FakeRemoteDispatcher {
        pub fn new() -> Self {
            let fake = Self::default();
            fake.inner.lock().available = true;
            fake
        }

        pub fn set_available(&self, available: bool) {
            self.inner.lock().available = available;
        }

        /// Queue the outcome for the next dispatch call.
        pub fn push_outcome(&self, outcome: Result<serde_json::Value, RemoteError>) {
            self.inner.lock().outcomes.push_back(outcome);
        }

        /// Ids of operations dispatched so far.
        pub fn dispatched(&self) -> Vec<String> {
            self.inner.lock().dispatched.clone()
        }
    }

    #[async_trait]
    impl RemoteDispatcher for FakeRemoteDispatcher {
        fn is_available(&self) -> bool {
            self.inner.lock().available
        }

        async fn dispatch(
            &self,
            operation: &Operation,
        ) -> Result<serde_json::Value, RemoteError> {
            let mut state = self.inner.lock();
            state.dispatched.push(operation.id.to_string());
            state.outcomes.pop_front().unwrap_or(Ok(serde_json::json!({"ack": true})))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRemoteDispatcher;

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
