// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ID generation for operations and conflicts.
//!
//! Generated ids are `<prefix>_<21-char nanoid>` over a lowercase
//! alphanumeric alphabet, so they sort and grep cleanly in the JSON
//! protocol files.

/// Alphabet for generated ids. Lowercase alphanumerics only, so ids are
/// safe inside file names and shell arguments.
const ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Length of the random portion of a generated id.
const ID_LEN: usize = 21;

/// Source of fresh ids.
///
/// Production uses [`NanoIdGen`]; tests inject [`SeqIdGen`] for
/// deterministic, readable ids.
pub trait IdGen: Send + Sync {
    fn next(&self, prefix: &str) -> String;
}

/// Random ids backed by nanoid.
#[derive(Clone, Copy, Debug, Default)]
pub struct NanoIdGen;

impl IdGen for NanoIdGen {
    fn next(&self, prefix: &str) -> String {
        format!("{prefix}_{}", nanoid::nanoid!(ID_LEN, &ALPHABET))
    }
}

/// Sequential ids for tests: `op_0001`, `op_0002`, …
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct SeqIdGen {
    counter: std::sync::atomic::AtomicU64,
}

#[cfg(any(test, feature = "test-support"))]
impl IdGen for SeqIdGen {
    fn next(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        format!("{prefix}_{n:04}")
    }
}

/// Define a string-backed id newtype with a fixed generation prefix.
macro_rules! define_id {
    ($(#[$meta:meta])* pub struct $name:ident, prefix = $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Default,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix used by [`IdGen`] when minting this id kind.
            pub const PREFIX: &'static str = $prefix;

            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Mint a fresh id from the given generator.
            pub fn generate(idgen: &dyn IdGen) -> Self {
                Self(idgen.next(Self::PREFIX))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_id! {
    /// Unique identifier for a queued operation.
    pub struct OperationId, prefix = "op"
}

define_id! {
    /// Unique identifier for a recorded conflict.
    pub struct ConflictId, prefix = "cf"
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
