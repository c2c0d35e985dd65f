// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! specforge-storage: the atomic file protocol.
//!
//! The three shared JSON files (`mcp-operations.json`,
//! `specforge-sync.json`, `mcp-results.json`) are the only channel
//! between the editor extension and the MCP server. Everything here
//! exists to guarantee a reader of those files never observes a torn
//! write and a crashed writer never loses the last-good content.

mod atomic;
mod checksum;
mod documents;
mod error;
pub mod paths;

pub use atomic::AtomicFileStore;
pub use checksum::{embed_checksum, verify_checksum};
pub use documents::{ProtocolStore, OPERATIONS_SCHEMA, RESULTS_SCHEMA, SYNC_SCHEMA};
pub use error::StorageError;
pub use paths::BrokerPaths;
