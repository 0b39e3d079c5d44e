//! Core mining engine: datasets, counters, selectors and the recursion.
//!
//! # Module Organization
//!
//! ```text
//! core/
//! ├── params.rs       - Miner configuration and validation
//! ├── tidlist.rs      - Per-item occurrence indexes (interchangeable encodings)
//! ├── transactions.rs - Flat transaction storage
//! ├── counters.rs     - Support counting, closures, renaming
//! ├── dataset.rs      - Transaction datasets and projections
//! ├── selector.rs     - Candidate selector chain
//! └── step.rs         - The recursion engine
//! ```
//!
//! The dependency order is top to bottom: each file only builds on the ones
//! above it, mirroring how a recursion node is assembled: configuration
//! first, storage encodings next, then the per-node computations, and
//! finally the step that ties them together.

pub mod counters;
pub mod dataset;
pub mod params;
pub mod selector;
pub mod step;
pub mod tidlist;
pub mod transactions;

pub use counters::{Counters, FrequentsIterator, NO_ITEM};
pub use dataset::Dataset;
pub use params::{ExplorationStrategy, MinerConfig};
pub use selector::{Partition, Selector, SelectorChain, SelectorKind};
pub use step::{ExplorationStep, MineContext, StepState};
pub use tidlist::TidList;
pub use transactions::TransactionsList;
