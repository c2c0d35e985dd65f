// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! specforge-core: data model for the SpecForge operation broker.
//!
//! Everything that is persisted into the three protocol files lives here:
//! operations, conflicts, the queue document, the sync-state record, and
//! the results log, plus the validation, signature, and retry-timing rules
//! that govern them.

pub mod macros;

pub mod clock;
pub mod config;
pub mod conflict;
pub mod error;
pub mod factory;
pub mod id;
pub mod operation;
pub mod queue_state;
pub mod retry;
pub mod signature;
pub mod sync_state;
pub mod validate;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{BrokerConfig, FileOpsConfig, PerformanceToggles};
pub use conflict::{Conflict, ConflictSeverity, ConflictType, ResolutionStrategy};
pub use error::{BrokerError, ErrorCode};
pub use factory::{OperationFactory, OperationIntent};
pub use id::{ConflictId, IdGen, NanoIdGen, OperationId};
#[cfg(any(test, feature = "test-support"))]
pub use id::SeqIdGen;
pub use operation::{
    Operation, OperationPayload, OperationPriority, OperationSource, OperationStatus,
    OperationType, TaskStatus,
};
pub use queue_state::{OperationResult, ProcessingStats, QueueState, ResultsLog};
pub use signature::{content_hash32, signature};
pub use sync_state::{PerformanceMetrics, SpecSyncInfo, SyncErrorEntry, SyncState};
pub use validate::{FieldError, ValidationError};
