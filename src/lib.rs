//! PatternCraft: closed frequent itemset mining with per-item top-k pruning.
//!
//! PatternCraft enumerates the closed frequent itemsets of a transactional
//! dataset and maintains, for every item, the k best-supported closed
//! patterns containing it. The per-item top-k sets are not just the output:
//! their weakest entries form live support bounds that feed back into the
//! search and prune it as results accumulate.
//!
//! # What is a closed itemset?
//!
//! An itemset is **closed** when no strict superset has the same support.
//! Closed itemsets carry exactly the same information as the full frequent
//! itemset lattice in a fraction of the volume, which makes them the right
//! currency for dense, non-redundant pattern summaries at scale.
//!
//! # Quick Start
//!
//! ```
//! use patterncraft::prelude::*;
//!
//! let transactions = vec![
//!     (vec![1, 2, 3], 1),
//!     (vec![1, 2], 1),
//!     (vec![2, 3], 1),
//!     (vec![2], 1),
//! ];
//!
//! // top-5 patterns per item, minimum support 2
//! let config = MinerConfig::new(2, 5).with_threads(1);
//! let collector = PerItemTopKCollector::new(5, 1..=3);
//! let miner = Miner::new(config).unwrap();
//! miner.mine(&transactions, &collector).unwrap();
//!
//! // item 2 occurs everywhere: {2} is closed with support 4
//! assert!(collector
//!     .patterns_for(2)
//!     .contains(&(4, vec![2])));
//! ```
//!
//! # Architecture
//!
//! The search engine is a depth-first traversal of the closed-itemset
//! lattice built from a handful of cooperating pieces:
//!
//! | Piece | Module | Role |
//! |-------|--------|------|
//! | `TidList` | `core::tidlist` | item → transaction ids, in capacity-picked encodings |
//! | `Dataset` | `core::dataset` | transaction store, projections (view or materialized) |
//! | `Counters` | `core::counters` | support counting, closures, dense renaming |
//! | `SelectorChain` | `core::selector` | pre-projection candidate filtering |
//! | `ExplorationStep` | `core::step` | the recursion node and first-parent test |
//! | `PerItemTopKCollector` | `topk::collector` | bounded per-item results, live pruning bounds |
//! | `Miner` / `SharedJob` | `sync` | fixed worker pool over a shared search tree |
//!
//! Duplicate elimination is *first-parent* based: a candidate extension is
//! expanded only from its canonical parent node, which the projected
//! closure decides locally; there is no global duplicate table and no post-hoc
//! deduplication pass.
//!
//! # Parallelism
//!
//! A fixed pool of workers drains the root's candidate stream from a shared
//! job; each expanded child is explored on the claiming worker's private
//! stack. The shared structures (candidate cursor, failed first-parent map,
//! explore cursor, invalidation multimap, top-k sets) are each guarded by
//! their own lock or atomic, scoped to single operations. No lock is held
//! across a node expansion.
//!
//! # Distributed batch execution
//!
//! For runs partitioned across processes, [`Partition`] restricts which
//! items seed root exploration, and [`io::bounds`] exchanges per-item
//! support bounds so later rounds start pre-pruned. See
//! `PerItemTopKCollector::preload_bounds` and
//! `PerItemTopKCollector::bounds_snapshot`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_range_loop)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Core mining engine
pub mod core;

/// Error types and result alias
pub mod error;

/// Input, output and bound exchange
pub mod io;

/// Mining event counters
pub mod metrics;

/// Parallel work distribution
pub mod sync;

/// Per-item top-k collection
pub mod topk;

// Re-export commonly used types at the crate root
pub use error::{PatternCraftError, Result};

pub use crate::core::params::{ExplorationStrategy, MinerConfig};
pub use crate::core::selector::Partition;
pub use crate::core::step::{ExplorationStep, StepState};
pub use metrics::{MetricsSnapshot, MinerMetrics};
pub use sync::{Miner, MiningOutcome, SharedJob};
pub use topk::collector::PerItemTopKCollector;

/// Prelude module for convenient imports.
///
/// # Examples
///
/// ```
/// use patterncraft::prelude::*;
///
/// let config = MinerConfig::new(2, 10);
/// let miner = Miner::new(config).unwrap();
/// assert_eq!(miner.config().min_support, 2);
/// ```
pub mod prelude {
    pub use crate::core::params::{ExplorationStrategy, MinerConfig};
    pub use crate::core::selector::Partition;
    pub use crate::core::step::ExplorationStep;
    pub use crate::error::{PatternCraftError, Result};
    pub use crate::io::{read_transactions, read_transactions_path, PatternSink};
    pub use crate::sync::{Miner, MiningOutcome};
    pub use crate::topk::collector::PerItemTopKCollector;
}
