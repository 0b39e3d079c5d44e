//! Miner configuration and parameter validation.
//!
//! All tunables live in [`MinerConfig`]; free validation functions mirror the
//! checks performed by [`MinerConfig::validated`] so callers can validate
//! individual knobs before building a full configuration.
//!
//! # Defaults
//!
//! | Knob | Default | Meaning |
//! |------|---------|---------|
//! | `view_support_threshold` | 0.15 | projections keeping more than 15% of transactions become views |
//! | `long_transaction_threshold` | 2000 | average transaction length above which counting is pre-filtered |
//! | `threads` | `num_cpus::get()` | worker pool size |
//! | `sparse_counters_from` | `usize::MAX` | first starter id counted with the sparse accumulator |
//! | `strategy` | `DepthFirst` | traversal strategy |
//!
//! # Examples
//!
//! ```
//! use patterncraft::core::params::MinerConfig;
//!
//! let config = MinerConfig::new(2, 10)
//!     .with_threads(4)
//!     .validated()
//!     .unwrap();
//! assert_eq!(config.min_support, 2);
//! assert_eq!(config.k, 10);
//! ```

use crate::error::{PatternCraftError, Result};

/// Default transaction-count ratio above which a projection becomes a view.
pub const DEFAULT_VIEW_SUPPORT_THRESHOLD: f64 = 0.15;

/// Default average transaction length separating "long transaction" mode.
pub const DEFAULT_LONG_TRANSACTION_THRESHOLD: usize = 2000;

/// Traversal strategy for [`ExplorationStep`](crate::core::step::ExplorationStep).
///
/// Both strategies enumerate exactly the same closed itemsets; they differ in
/// when projections are paid for and how early the collector bound tightens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExplorationStrategy {
    /// Expand each accepted candidate immediately, depth first.
    DepthFirst,
    /// Screen every candidate of a node first (counting, first-parent test,
    /// collection), queue the survivors, then instantiate children one at a
    /// time, re-deriving counters whose support floor went stale.
    PreScreen,
}

/// Validated miner configuration.
///
/// Construct with [`MinerConfig::new`], adjust with the `with_*` setters and
/// finish with [`MinerConfig::validated`]. The mining entry points take the
/// configuration by value and never mutate it afterwards.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Minimum support threshold (inclusive, weighted transaction count).
    pub min_support: u32,
    /// Top-k entries retained per item.
    pub k: usize,
    /// Projection ratio above which a dataset view is preferred over a
    /// materialized copy.
    pub view_support_threshold: f64,
    /// Average transaction length above which the first-parent pre-test
    /// selector is carried instead of relying on projection closures alone.
    pub long_transaction_threshold: usize,
    /// Worker pool size.
    pub threads: usize,
    /// Starter id (in the root's internal base) from which the sparse
    /// counters accumulator replaces the dense array.
    pub sparse_counters_from: usize,
    /// Traversal strategy.
    pub strategy: ExplorationStrategy,
    /// Eagerly offer unclosed extension patterns of well-supported starters
    /// to the collector, tightening bounds before descending.
    pub insert_unclosed: bool,
    /// Offer patterns observed during failed first-parent tests to the
    /// collector when their true first parent is tracked.
    pub early_collection: bool,
}

impl MinerConfig {
    /// Create a configuration with the given support threshold and top-k
    /// size, all other knobs at their defaults.
    #[must_use]
    pub fn new(min_support: u32, k: usize) -> Self {
        Self {
            min_support,
            k,
            view_support_threshold: DEFAULT_VIEW_SUPPORT_THRESHOLD,
            long_transaction_threshold: DEFAULT_LONG_TRANSACTION_THRESHOLD,
            threads: num_cpus::get(),
            sparse_counters_from: usize::MAX,
            strategy: ExplorationStrategy::DepthFirst,
            insert_unclosed: true,
            early_collection: true,
        }
    }

    /// Set the dataset-view density threshold.
    #[must_use]
    pub fn with_view_support_threshold(mut self, threshold: f64) -> Self {
        self.view_support_threshold = threshold;
        self
    }

    /// Set the long-transaction length threshold.
    #[must_use]
    pub fn with_long_transaction_threshold(mut self, threshold: usize) -> Self {
        self.long_transaction_threshold = threshold;
        self
    }

    /// Set the worker pool size.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the starter id from which sparse counters are used.
    #[must_use]
    pub fn with_sparse_counters_from(mut self, starter: usize) -> Self {
        self.sparse_counters_from = starter;
        self
    }

    /// Set the traversal strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ExplorationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Toggle eager unclosed-pattern insertion.
    #[must_use]
    pub fn with_insert_unclosed(mut self, enabled: bool) -> Self {
        self.insert_unclosed = enabled;
        self
    }

    /// Toggle early collection on failed first-parent tests.
    #[must_use]
    pub fn with_early_collection(mut self, enabled: bool) -> Self {
        self.early_collection = enabled;
        self
    }

    /// Validate every knob, returning the configuration on success.
    ///
    /// # Errors
    ///
    /// Returns the first failing validation, see the free `validate_*`
    /// functions for individual conditions.
    pub fn validated(self) -> Result<Self> {
        validate_min_support(self.min_support)?;
        validate_k(self.k)?;
        validate_view_support_threshold(self.view_support_threshold)?;
        validate_thread_count(self.threads)?;
        if self.long_transaction_threshold == 0 {
            return Err(PatternCraftError::invalid_threshold(
                "long_transaction_threshold",
                "a length of at least 1",
            ));
        }
        Ok(self)
    }
}

/// Validate a minimum support threshold.
///
/// # Errors
///
/// Fails when `min_support` is zero: a zero threshold would report every
/// subset of every transaction.
pub fn validate_min_support(min_support: u32) -> Result<()> {
    if min_support == 0 {
        return Err(PatternCraftError::invalid_minimum_support(min_support));
    }
    Ok(())
}

/// Validate a top-k size.
///
/// # Errors
///
/// Fails when `k` is zero.
pub fn validate_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(PatternCraftError::invalid_k(k));
    }
    Ok(())
}

/// Validate the dataset-view density threshold.
///
/// # Errors
///
/// Fails unless the threshold lies in `(0, 1]`.
pub fn validate_view_support_threshold(threshold: f64) -> Result<()> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(PatternCraftError::invalid_threshold(
            "view_support_threshold",
            "a ratio in (0, 1]",
        ));
    }
    Ok(())
}

/// Validate a worker pool size.
///
/// # Errors
///
/// Fails when `threads` is zero.
pub fn validate_thread_count(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(PatternCraftError::invalid_thread_count(threads));
    }
    Ok(())
}
