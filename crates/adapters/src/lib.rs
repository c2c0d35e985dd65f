// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! specforge-adapters: seams to the outside world.
//!
//! The executor talks to users through [`NotifySink`] and to an
//! optional remote MCP endpoint through [`RemoteDispatcher`]. Both are
//! traits with shipped defaults and in-memory fakes for tests; the core
//! never depends on a concrete surface.

pub mod notify;
pub mod remote;

pub use notify::{DesktopNotifySink, NotifyPreferences, NotifySink, NullNotifySink};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifySink, SinkCall};
pub use remote::{RemoteDispatcher, RemoteError};
#[cfg(any(test, feature = "test-support"))]
pub use remote::FakeRemoteDispatcher;
