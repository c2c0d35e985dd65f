// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! specforge-broker: the workspace-local operation broker.
//!
//! Owns the sync state, watches the three protocol files, paces the
//! executor with timers and debounced watcher events, and exposes the
//! in-process submission and introspection API. One broker instance per
//! workspace; its lifetime is bounded by the hosting process.

pub mod env;
pub mod reconcile;
pub mod service;
pub mod watcher;

pub use service::{Broker, SubmitReceipt};
pub use watcher::{FileWatcher, WatchedFile};
