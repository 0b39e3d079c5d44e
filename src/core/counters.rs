//! Single-pass support counting, closure extraction and item renaming.
//!
//! A [`Counters`] instance captures everything one recursion node learns from
//! one pass over its transaction stream:
//!
//! - per-item support counts,
//! - the **closure**: items present in every transaction of the node, which
//!   are folded into the pattern and never re-enter candidate spaces,
//! - the compression renaming that maps the parent level's item space onto
//!   this node's dense child space.
//!
//! # Child id space
//!
//! Surviving frequent items are renamed to contiguous ids `[0, nb_frequents)`
//! in two segments:
//!
//! ```text
//! [0 .............. first_parent_bound) [first_parent_bound .. nb_frequents)
//!  candidates: parent id below the          retained items: counted for
//!  extension's, ascending projected         closure detection only, never
//!  support (rarest first)                   enumerated as extensions
//! ```
//!
//! Within each segment ids ascend with projected support, ties toward the
//! higher parent id, so ascending-id candidate iteration visits rarer items
//! first. The candidate prefix together with the first-parent closure test
//! (see [`crate::core::step`]) yields each closed itemset exactly once.
//!
//! Two accumulator variants exist: a dense array sized by the parent item
//! space, and a sparse map for very large, weakly supported spaces where the
//! dense allocation itself would be the bottleneck.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::dataset::Dataset;
use crate::error::Result;
use crate::topk::collector::PerItemTopKCollector;

/// Sentinel for "item absent at this level" in renaming arrays, and for the
/// root step's `core_item`.
pub const NO_ITEM: usize = usize::MAX;

/// Support accumulator: dense array or sparse map.
enum Accumulator {
    Dense(Vec<u32>),
    Sparse(HashMap<usize, u32>),
}

impl Accumulator {
    fn new(max_item: usize, sparse: bool) -> Self {
        if sparse {
            Self::Sparse(HashMap::new())
        } else {
            Self::Dense(vec![0; max_item + 1])
        }
    }

    #[inline]
    fn add(&mut self, item: usize, weight: u32) {
        match self {
            Self::Dense(counts) => counts[item] += weight,
            Self::Sparse(counts) => *counts.entry(item).or_insert(0) += weight,
        }
    }

    /// Visit every `(item, support)` pair with a non-zero count.
    fn for_each(&self, mut f: impl FnMut(usize, u32)) {
        match self {
            Self::Dense(counts) => {
                for (item, &support) in counts.iter().enumerate() {
                    if support > 0 {
                        f(item, support);
                    }
                }
            }
            Self::Sparse(counts) => {
                for (&item, &support) in counts {
                    f(item, support);
                }
            }
        }
    }
}

/// Per-node counting results and renaming arrays.
///
/// Immutable once built, except for [`raise_min_support`](Self::raise_min_support)
/// which only tightens the node's effective support floor.
#[derive(Debug)]
pub struct Counters {
    min_support: u32,
    /// Weighted transaction count at this node.
    transactions_count: u32,
    /// Stored (unweighted) transaction count at this node.
    distinct_transactions_count: usize,
    /// Summed stored transaction lengths, for the projection decision.
    distinct_lengths_sum: usize,
    /// Closure of this node, in parent-level ids (extension excluded).
    closure_parent_ids: Vec<usize>,
    /// Child-space supports, indexed by child id.
    supports: Vec<u32>,
    /// Parent id to child id; [`NO_ITEM`] marks dropped items.
    rename: Vec<usize>,
    /// Child id to original input id.
    reverse: Vec<u32>,
    /// Child id to parent id.
    reverse_parent: Vec<usize>,
    /// Candidate prefix bound: candidates are child ids `[0, bound)`.
    first_parent_bound: usize,
    /// Full pattern at this node, in sorted original ids.
    pattern: Vec<u32>,
}

impl Counters {
    /// Count the root node from raw weighted transactions in original ids.
    ///
    /// `max_item` is the largest original item id present.
    #[must_use]
    pub fn count_root(
        min_support: u32,
        transactions: &[(Vec<u32>, u32)],
        max_item: usize,
    ) -> Self {
        let mut accumulator = Accumulator::new(max_item, false);
        let mut transactions_count = 0u32;
        let mut distinct = 0usize;
        let mut lengths = 0usize;
        for (items, weight) in transactions {
            if *weight == 0 {
                continue;
            }
            transactions_count += weight;
            distinct += 1;
            lengths += items.len();
            for &item in items {
                accumulator.add(item as usize, *weight);
            }
        }
        Self::finish(
            min_support,
            accumulator,
            transactions_count,
            distinct,
            lengths,
            NO_ITEM,
            max_item + 1,
            &[],
            &[],
        )
    }

    /// Count a candidate extension from the parent's dataset.
    ///
    /// The stream is the parent dataset's occurrence delivery for
    /// `extension`; items arrive in the parent node's id space. `sparse`
    /// selects the map-based accumulator.
    ///
    /// # Errors
    ///
    /// Propagates occurrence-delivery failures from the dataset.
    pub fn count_extension(
        parent: &Counters,
        dataset: &Dataset,
        extension: usize,
        sparse: bool,
    ) -> Result<Self> {
        Self::count_extension_with_floor(parent, dataset, extension, sparse, parent.min_support)
    }

    /// Count a candidate extension against an explicit support floor.
    ///
    /// The redo path of the pre-screening strategy re-derives counters here
    /// when the collector bound rose past the floor the original counting
    /// pass used.
    ///
    /// # Errors
    ///
    /// Propagates occurrence-delivery failures from the dataset.
    pub fn count_extension_with_floor(
        parent: &Counters,
        dataset: &Dataset,
        extension: usize,
        sparse: bool,
        min_support: u32,
    ) -> Result<Self> {
        let mut accumulator = Accumulator::new(parent.nb_frequents(), sparse);
        let mut transactions_count = 0u32;
        let mut distinct = 0usize;
        let mut lengths = 0usize;
        dataset.for_each_transaction_of(extension, |items, weight| {
            transactions_count += weight;
            distinct += 1;
            for item in items {
                let item = item as usize;
                if item == extension {
                    continue;
                }
                lengths += 1;
                accumulator.add(item, weight);
            }
        })?;
        Ok(Self::finish(
            min_support,
            accumulator,
            transactions_count,
            distinct,
            lengths,
            extension,
            parent.nb_frequents(),
            &parent.reverse,
            &parent.pattern,
        ))
    }

    /// Classify counted items and build the two-segment child renaming.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        min_support: u32,
        accumulator: Accumulator,
        transactions_count: u32,
        distinct_transactions_count: usize,
        distinct_lengths_sum: usize,
        extension: usize,
        parent_space: usize,
        parent_reverse: &[u32],
        parent_pattern: &[u32],
    ) -> Self {
        // parent id -> original id; the root counts in original ids directly
        let to_original = |parent_id: usize| -> u32 {
            if parent_reverse.is_empty() {
                parent_id as u32
            } else {
                parent_reverse[parent_id]
            }
        };

        let mut closure_parent_ids = Vec::new();
        let mut frequent: Vec<(usize, u32)> = Vec::new();
        accumulator.for_each(|item, support| {
            if transactions_count > 0 && support == transactions_count {
                closure_parent_ids.push(item);
            } else if support >= min_support {
                frequent.push((item, support));
            }
        });
        closure_parent_ids.sort_unstable();

        // Two segments: candidates sit below the extension's parent id,
        // retained items above. Root (sentinel extension) keeps everything
        // in the candidate segment.
        let mut candidates: Vec<(usize, u32)> = Vec::new();
        let mut retained: Vec<(usize, u32)> = Vec::new();
        for &(item, support) in &frequent {
            if extension == NO_ITEM || item < extension {
                candidates.push((item, support));
            } else {
                retained.push((item, support));
            }
        }
        // ascending projected support, ties toward the higher parent id
        let rarest_first =
            |a: &(usize, u32), b: &(usize, u32)| a.1.cmp(&b.1).then(b.0.cmp(&a.0));
        candidates.sort_unstable_by(rarest_first);
        retained.sort_unstable_by(rarest_first);

        let first_parent_bound = candidates.len();
        let nb_frequents = candidates.len() + retained.len();
        let mut supports = Vec::with_capacity(nb_frequents);
        let mut rename = vec![NO_ITEM; parent_space];
        let mut reverse = Vec::with_capacity(nb_frequents);
        let mut reverse_parent = Vec::with_capacity(nb_frequents);
        for &(item, support) in candidates.iter().chain(retained.iter()) {
            let child_id = supports.len();
            rename[item] = child_id;
            supports.push(support);
            reverse.push(to_original(item));
            reverse_parent.push(item);
        }

        let mut pattern = parent_pattern.to_vec();
        if extension != NO_ITEM {
            pattern.push(to_original(extension));
        }
        for &item in &closure_parent_ids {
            pattern.push(to_original(item));
        }
        pattern.sort_unstable();

        Self {
            min_support,
            transactions_count,
            distinct_transactions_count,
            distinct_lengths_sum,
            closure_parent_ids,
            supports,
            rename,
            reverse,
            reverse_parent,
            first_parent_bound,
            pattern,
        }
    }

    /// Effective minimum support at this node.
    #[must_use]
    pub fn min_support(&self) -> u32 {
        self.min_support
    }

    /// Weighted transaction count, which is the support of this node's pattern.
    #[must_use]
    pub fn transactions_count(&self) -> u32 {
        self.transactions_count
    }

    /// Stored transaction count at this node.
    #[must_use]
    pub fn distinct_transactions_count(&self) -> usize {
        self.distinct_transactions_count
    }

    /// Average stored transaction length, zero on an empty node.
    #[must_use]
    pub fn average_transaction_length(&self) -> usize {
        if self.distinct_transactions_count == 0 {
            0
        } else {
            self.distinct_lengths_sum / self.distinct_transactions_count
        }
    }

    /// Number of surviving frequent items (candidates plus retained).
    #[must_use]
    pub fn nb_frequents(&self) -> usize {
        self.supports.len()
    }

    /// Candidate prefix bound: candidates are child ids `[0, bound)`.
    #[must_use]
    pub fn first_parent_bound(&self) -> usize {
        self.first_parent_bound
    }

    /// This node's closure in parent-level ids, extension excluded.
    #[must_use]
    pub fn closure(&self) -> &[usize] {
        &self.closure_parent_ids
    }

    /// Greatest parent-level id in the closure, if any.
    ///
    /// This is the witness consulted by the first-parent test: a candidate
    /// whose projection closes over a higher parent id than itself is not
    /// reached through its canonical parent.
    #[must_use]
    pub fn greatest_closure_item(&self) -> Option<usize> {
        self.closure_parent_ids.last().copied()
    }

    /// Support of a child-space item.
    #[must_use]
    pub fn support_of(&self, child_id: usize) -> u32 {
        self.supports[child_id]
    }

    /// Child-space supports, indexed by child id.
    #[must_use]
    pub fn supports(&self) -> &[u32] {
        &self.supports
    }

    /// Parent-to-child renaming; [`NO_ITEM`] marks dropped items.
    #[must_use]
    pub fn rename(&self) -> &[usize] {
        &self.rename
    }

    /// Child-to-original renaming.
    #[must_use]
    pub fn reverse(&self) -> &[u32] {
        &self.reverse
    }

    /// Child-to-parent renaming.
    #[must_use]
    pub fn reverse_parent(&self) -> &[usize] {
        &self.reverse_parent
    }

    /// Full pattern at this node, in sorted original ids.
    #[must_use]
    pub fn pattern(&self) -> &[u32] {
        &self.pattern
    }

    /// Support floor implied by the collector's live bounds.
    ///
    /// Every deeper pattern extends this node's pattern with items drawn
    /// from its frequent set, so the support below which no such pattern
    /// can enter any top-k is the smallest bound across the pattern items
    /// and the surviving frequent items. Never below the node's current
    /// minimum support.
    #[must_use]
    pub fn current_floor(&self, collector: &PerItemTopKCollector) -> u32 {
        let mut floor = u32::MAX;
        for &item in self.pattern.iter().chain(self.reverse.iter()) {
            floor = floor.min(collector.bound(item));
        }
        if floor == u32::MAX {
            self.min_support
        } else {
            floor.max(self.min_support)
        }
    }

    /// Raise this node's effective minimum support from the collector's
    /// live bounds.
    pub fn raise_min_support(&mut self, collector: &PerItemTopKCollector) {
        self.min_support = self.current_floor(collector);
    }

    /// Eagerly offer each frequent extension as a provisional (unclosed)
    /// pattern to its item's top-k set, then return the refreshed support
    /// floor for this node.
    ///
    /// Tightens the collector's bounds using cheap support-only information
    /// before any projection is paid for. When `for_future_extensions` is
    /// false only tracked items receive insertions.
    pub fn insert_unclosed_patterns(
        &self,
        collector: &PerItemTopKCollector,
        for_future_extensions: bool,
    ) -> u32 {
        let mut unclosed = Vec::with_capacity(self.pattern.len() + 1);
        unclosed.extend_from_slice(&self.pattern);
        for child_id in 0..self.supports.len() {
            let item = self.reverse[child_id];
            if !for_future_extensions && !collector.is_collected(item) {
                continue;
            }
            unclosed.push(item);
            collector.insert_pattern_in_top(self.supports[child_id], &unclosed, item);
            unclosed.pop();
        }
        self.current_floor(collector)
    }
}

/// Lock-free ascending candidate cursor, shareable between workers.
///
/// `next()` hands out each candidate id of `[start, end)` exactly once
/// across all callers.
#[derive(Debug)]
pub struct FrequentsIterator {
    cursor: AtomicUsize,
    end: usize,
}

impl FrequentsIterator {
    /// Create a cursor over `[start, end)`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(start),
            end,
        }
    }

    /// Claim the next candidate, or `None` once exhausted.
    pub fn next(&self) -> Option<usize> {
        let claimed = self.cursor.fetch_add(1, Ordering::Relaxed);
        if claimed < self.end {
            Some(claimed)
        } else {
            None
        }
    }

    /// Whether every candidate has been handed out.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor.load(Ordering::Relaxed) >= self.end
    }
}
