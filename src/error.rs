//! Error types for PatternCraft operations.
//!
//! This module provides structured error handling for the whole crate.
//! Configuration mistakes, malformed input and capacity violations are all
//! reported through [`PatternCraftError`]; expected mining events (such as a
//! failed first-parent test) are *not* errors and never surface here.
//!
//! # Error Propagation
//!
//! ```
//! use patterncraft::{Result, PatternCraftError};
//! use patterncraft::core::params::validate_min_support;
//!
//! fn configure(min_support: u32) -> Result<u32> {
//!     validate_min_support(min_support)?;
//!     Ok(min_support)
//! }
//! # assert!(configure(2).is_ok());
//! # assert!(configure(0).is_err());
//! ```

use std::fmt;

/// Result type alias for PatternCraft operations.
///
/// All fallible operations in this crate return [`Result<T>`] where the
/// error type is [`PatternCraftError`].
pub type Result<T> = std::result::Result<T, PatternCraftError>;

/// Errors that can occur while configuring or running a miner.
///
/// # Design Notes
/// - `Clone` + `PartialEq` enable testing and error comparison
/// - I/O failures are carried as rendered messages so the enum stays `Clone`
/// - Variants include enough context to diagnose the failing call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternCraftError {
    /// Minimum support must be at least 1 transaction.
    InvalidMinimumSupport {
        /// The rejected threshold.
        support: u32,
    },

    /// Top-k size must be at least 1 entry per item.
    InvalidK {
        /// The rejected k.
        k: usize,
    },

    /// A ratio or length threshold is outside its valid range.
    InvalidThreshold {
        /// Name of the configuration knob.
        name: &'static str,
        /// Human-readable description of the valid range.
        expected: &'static str,
    },

    /// Worker pool size must be at least 1 thread.
    InvalidThreadCount {
        /// The rejected count.
        count: usize,
    },

    /// A transaction id does not fit the chosen tid-list encoding, even
    /// after the sign-biased fold.
    ///
    /// This is an invariant violation: the dataset factory sizes encodings
    /// from the known maximum tid, so a correctly built dataset never
    /// triggers it.
    TidOverflow {
        /// The offending transaction id.
        tid: usize,
        /// Largest id the encoding can represent.
        capacity: usize,
    },

    /// An occurrence list was requested for an item the index never saw.
    UnknownItem {
        /// The item id with no tid-list.
        item: usize,
    },

    /// A partition descriptor is inconsistent (empty group space, or a
    /// group id outside it).
    InvalidPartition {
        /// Requested group id.
        group_id: usize,
        /// Total number of groups.
        group_count: usize,
    },

    /// An input line could not be parsed as a transaction.
    MalformedInput {
        /// 1-based line number in the source.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// An underlying I/O operation failed.
    Io {
        /// Rendered `std::io::Error` message.
        message: String,
    },

    /// Internal invariant violated; indicates a bug in PatternCraft itself.
    Internal {
        /// Description of the broken invariant.
        message: String,
    },
}

impl fmt::Display for PatternCraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMinimumSupport { support } => {
                write!(
                    f,
                    "Invalid minimum support: {}. Must be at least 1.",
                    support
                )
            }
            Self::InvalidK { k } => {
                write!(f, "Invalid top-k size: {}. Must be at least 1.", k)
            }
            Self::InvalidThreshold { name, expected } => {
                write!(f, "Invalid value for '{}': expected {}.", name, expected)
            }
            Self::InvalidThreadCount { count } => {
                write!(
                    f,
                    "Invalid worker thread count: {}. Must be at least 1.",
                    count
                )
            }
            Self::TidOverflow { tid, capacity } => {
                write!(
                    f,
                    "Transaction id {} exceeds encoding capacity {} (dataset factory bug).",
                    tid, capacity
                )
            }
            Self::UnknownItem { item } => {
                write!(f, "Item {} has no occurrence list.", item)
            }
            Self::InvalidPartition {
                group_id,
                group_count,
            } => {
                write!(
                    f,
                    "Invalid partition: group {} of {} groups.",
                    group_id, group_count
                )
            }
            Self::MalformedInput { line, message } => {
                write!(f, "Malformed transaction on line {}: {}.", line, message)
            }
            Self::Io { message } => {
                write!(f, "I/O error: {}.", message)
            }
            Self::Internal { message } => {
                write!(
                    f,
                    "Internal error (this is a bug in PatternCraft): {}.",
                    message
                )
            }
        }
    }
}

impl std::error::Error for PatternCraftError {}

impl From<std::io::Error> for PatternCraftError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl PatternCraftError {
    /// Create an `InvalidMinimumSupport` error.
    #[must_use]
    pub fn invalid_minimum_support(support: u32) -> Self {
        Self::InvalidMinimumSupport { support }
    }

    /// Create an `InvalidK` error.
    #[must_use]
    pub fn invalid_k(k: usize) -> Self {
        Self::InvalidK { k }
    }

    /// Create an `InvalidThreshold` error.
    #[must_use]
    pub fn invalid_threshold(name: &'static str, expected: &'static str) -> Self {
        Self::InvalidThreshold { name, expected }
    }

    /// Create an `InvalidThreadCount` error.
    #[must_use]
    pub fn invalid_thread_count(count: usize) -> Self {
        Self::InvalidThreadCount { count }
    }

    /// Create a `TidOverflow` error.
    #[must_use]
    pub fn tid_overflow(tid: usize, capacity: usize) -> Self {
        Self::TidOverflow { tid, capacity }
    }

    /// Create an `UnknownItem` error.
    #[must_use]
    pub fn unknown_item(item: usize) -> Self {
        Self::UnknownItem { item }
    }

    /// Create an `InvalidPartition` error.
    #[must_use]
    pub fn invalid_partition(group_id: usize, group_count: usize) -> Self {
        Self::InvalidPartition {
            group_id,
            group_count,
        }
    }

    /// Create a `MalformedInput` error.
    #[must_use]
    pub fn malformed_input(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            message: message.into(),
        }
    }

    /// Create an `Internal` error.
    ///
    /// Only for conditions that indicate bugs in PatternCraft.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
