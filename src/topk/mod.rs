//! Per-item top-k pattern collection.

pub mod collector;

pub use collector::{Pattern, PerItemTopKCollector};
