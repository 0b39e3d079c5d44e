//! Per-item top-k pattern collection.
//!
//! The collector tracks, for every item of a fixed universe, the k
//! best-supported closed patterns containing it. Its per-item minimum
//! supports double as live pruning bounds: once an item's set is full,
//! patterns at or below its weakest entry can be skipped anywhere in the
//! search, and the smallest bound across all tracked items is a global
//! support floor.
//!
//! # Sharing and consistency
//!
//! A pattern accepted into several items' sets is stored once behind an
//! [`Arc`]; eviction from the last set releases it. The tracked universe is
//! frozen at construction, so concurrent collection only ever takes the
//! per-item mutex of the sets it touches: no global lock, and within one
//! item's set no partial insert is observable.
//!
//! # Examples
//!
//! ```
//! use patterncraft::topk::collector::PerItemTopKCollector;
//!
//! let collector = PerItemTopKCollector::new(2, 0..=9);
//! collector.collect(4, &[1, 3]);
//! collector.collect(6, &[3, 7]);
//! collector.collect(5, &[2, 3]);
//!
//! // item 3 keeps its two strongest patterns
//! let top = collector.patterns_for(3);
//! assert_eq!(top.len(), 2);
//! assert_eq!(top[0].0, 6);
//! assert_eq!(top[1].0, 5);
//! // a full set exposes its weakest support as the pruning bound
//! assert_eq!(collector.bound(3), 5);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// A collected pattern: its support and its items in original ids.
#[derive(Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Weighted support of the pattern.
    pub support: u32,
    /// Items, sorted ascending.
    pub items: Box<[u32]>,
}

#[derive(Debug)]
struct TopEntry {
    support: u32,
    pattern: Arc<Pattern>,
}

#[derive(Debug, Default)]
struct ItemTops {
    /// Pre-seeded support bound from an earlier mining round.
    preloaded: u32,
    /// Entries ordered by descending support; equal supports newest first,
    /// so the tail holds the weakest entry and, among ties, the oldest.
    entries: Vec<TopEntry>,
}

impl ItemTops {
    fn bound(&self, k: usize) -> u32 {
        if self.entries.len() == k {
            self.entries.last().map_or(self.preloaded, |e| e.support)
        } else {
            self.preloaded
        }
    }

    /// Insert if `support` beats the current bound; evict the tail (the
    /// oldest of the weakest ties) when overflowing k.
    ///
    /// An incumbent tied with a newcomer keeps its seat: entry requires
    /// strictly exceeding the bound, so boundary ties resolve toward the
    /// first-discovered pattern. A pattern already present (same support,
    /// same items, as when a rejected extension is collected early and later reached
    /// through its canonical parent) is not inserted twice.
    fn offer(&mut self, k: usize, support: u32, pattern: &Arc<Pattern>) -> bool {
        if support <= self.bound(k) {
            return false;
        }
        let position = self.entries.partition_point(|e| e.support > support);
        let duplicate = self.entries[position..]
            .iter()
            .take_while(|e| e.support == support)
            .any(|e| e.pattern.items == pattern.items);
        if duplicate {
            return false;
        }
        self.entries.insert(
            position,
            TopEntry {
                support,
                pattern: Arc::clone(pattern),
            },
        );
        if self.entries.len() > k {
            self.entries.pop();
        }
        true
    }
}

/// Concurrent per-item top-k collector with live pruning bounds.
#[derive(Debug)]
pub struct PerItemTopKCollector {
    k: usize,
    tops: HashMap<u32, Mutex<ItemTops>>,
}

impl PerItemTopKCollector {
    /// Create a collector for a fixed universe of tracked items.
    ///
    /// Patterns are only retained for items of the universe; everything
    /// else is passed over silently.
    #[must_use]
    pub fn new(k: usize, tracked_items: impl IntoIterator<Item = u32>) -> Self {
        let tops = tracked_items
            .into_iter()
            .map(|item| (item, Mutex::new(ItemTops::default())))
            .collect();
        Self { k, tops }
    }

    /// Configured top-k size.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Whether `item` belongs to the tracked universe.
    #[must_use]
    pub fn is_collected(&self, item: u32) -> bool {
        self.tops.contains_key(&item)
    }

    /// Offer a closed pattern to the top-k set of every tracked item it
    /// contains.
    ///
    /// The pattern is materialized (and reference-counted) only when at
    /// least one set takes it.
    pub fn collect(&self, support: u32, pattern: &[u32]) {
        let mut shared: Option<Arc<Pattern>> = None;
        for &item in pattern {
            let Some(tops) = self.tops.get(&item) else {
                continue;
            };
            let mut tops = tops.lock();
            if tops.bound(self.k) >= support {
                continue;
            }
            let entry = shared.get_or_insert_with(|| {
                let mut items = pattern.to_vec();
                items.sort_unstable();
                Arc::new(Pattern {
                    support,
                    items: items.into_boxed_slice(),
                })
            });
            tops.offer(self.k, support, entry);
        }
    }

    /// Offer a (possibly unclosed) pattern to one item's set only.
    ///
    /// Used by the eager unclosed-insertion pass, which knows the support
    /// of `pattern ∪ {item}` without having projected on `item`.
    pub fn insert_pattern_in_top(&self, support: u32, pattern: &[u32], item: u32) {
        let Some(tops) = self.tops.get(&item) else {
            return;
        };
        let mut tops = tops.lock();
        if tops.bound(self.k) >= support {
            return;
        }
        let mut items = pattern.to_vec();
        items.sort_unstable();
        let entry = Arc::new(Pattern {
            support,
            items: items.into_boxed_slice(),
        });
        tops.offer(self.k, support, &entry);
    }

    /// Live pruning bound for `item`: the support a new pattern must exceed
    /// to enter its top-k. Untracked items never accept anything and bound
    /// at `u32::MAX`.
    #[must_use]
    pub fn bound(&self, item: u32) -> u32 {
        match self.tops.get(&item) {
            Some(tops) => tops.lock().bound(self.k),
            None => u32::MAX,
        }
    }

    /// Smallest live bound across the tracked universe: the support below
    /// which no pattern can enter any top-k anymore.
    #[must_use]
    pub fn lowest_bound(&self) -> u32 {
        self.tops
            .values()
            .map(|tops| tops.lock().bound(self.k))
            .min()
            .unwrap_or(u32::MAX)
    }

    /// Pre-seed per-item bounds from an earlier mining round.
    ///
    /// Unknown items are ignored; a preloaded bound never lowers an
    /// existing one.
    pub fn preload_bounds(&self, bounds: impl IntoIterator<Item = (u32, u32)>) {
        for (item, bound) in bounds {
            if let Some(tops) = self.tops.get(&item) {
                let mut tops = tops.lock();
                tops.preloaded = tops.preloaded.max(bound);
            }
        }
    }

    /// Snapshot of every tracked item's current bound, for the batch
    /// collaborator's write-back.
    #[must_use]
    pub fn bounds_snapshot(&self) -> Vec<(u32, u32)> {
        let mut snapshot: Vec<(u32, u32)> = self
            .tops
            .iter()
            .map(|(&item, tops)| (item, tops.lock().bound(self.k)))
            .collect();
        snapshot.sort_unstable();
        snapshot
    }

    /// Snapshot of one item's top-k, strongest first.
    #[must_use]
    pub fn patterns_for(&self, item: u32) -> Vec<(u32, Vec<u32>)> {
        match self.tops.get(&item) {
            Some(tops) => tops
                .lock()
                .entries
                .iter()
                .map(|e| (e.support, e.pattern.items.to_vec()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every distinct collected pattern, each reported once.
    #[must_use]
    pub fn distinct_patterns(&self) -> Vec<(u32, Vec<u32>)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for tops in self.tops.values() {
            let tops = tops.lock();
            for entry in &tops.entries {
                if seen.insert(Arc::as_ptr(&entry.pattern) as usize) {
                    out.push((entry.support, entry.pattern.items.to_vec()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_filled_set_accepts_anything() {
        let collector = PerItemTopKCollector::new(3, [1, 2]);
        collector.collect(1, &[1]);
        collector.collect(2, &[1, 2]);
        assert_eq!(collector.patterns_for(1).len(), 2);
        assert_eq!(collector.bound(1), 0);
    }

    #[test]
    fn test_eviction_keeps_k_strongest() {
        let collector = PerItemTopKCollector::new(2, [7]);
        collector.collect(3, &[7]);
        collector.collect(5, &[7, 8]);
        collector.collect(4, &[7, 9]);

        let top = collector.patterns_for(7);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], (5, vec![7, 8]));
        assert_eq!(top[1], (4, vec![7, 9]));
        assert_eq!(collector.bound(7), 4);
    }

    #[test]
    fn test_equal_support_does_not_enter_full_set() {
        let collector = PerItemTopKCollector::new(1, [1]);
        collector.collect(5, &[1, 2]);
        collector.collect(5, &[1, 3]);
        // first-discovered wins the tie
        assert_eq!(collector.patterns_for(1), vec![(5, vec![1, 2])]);
    }

    #[test]
    fn test_tie_eviction_drops_oldest() {
        let collector = PerItemTopKCollector::new(2, [1]);
        collector.collect(5, &[1, 2]);
        collector.collect(5, &[1, 3]);
        collector.collect(9, &[1, 4]);
        // the set held two support-5 entries; the older one loses
        assert_eq!(
            collector.patterns_for(1),
            vec![(9, vec![1, 4]), (5, vec![1, 3])]
        );
    }

    #[test]
    fn test_duplicate_pattern_not_inserted_twice() {
        let collector = PerItemTopKCollector::new(3, [1, 2]);
        collector.collect(5, &[1, 2]);
        collector.collect(5, &[1, 2]);
        assert_eq!(collector.patterns_for(1).len(), 1);
        assert_eq!(collector.distinct_patterns().len(), 1);
    }

    #[test]
    fn test_untracked_items_ignored() {
        let collector = PerItemTopKCollector::new(2, [1]);
        collector.collect(5, &[2, 3]);
        assert!(collector.patterns_for(2).is_empty());
        assert!(!collector.is_collected(2));
        assert_eq!(collector.bound(2), u32::MAX);
    }

    #[test]
    fn test_pattern_shared_across_items() {
        let collector = PerItemTopKCollector::new(1, [1, 2]);
        collector.collect(4, &[1, 2]);
        let distinct = collector.distinct_patterns();
        assert_eq!(distinct, vec![(4, vec![1, 2])]);
        assert_eq!(collector.patterns_for(1), collector.patterns_for(2));
    }

    #[test]
    fn test_preloaded_bound_prunes_insertions() {
        let collector = PerItemTopKCollector::new(2, [1]);
        collector.preload_bounds([(1, 6)]);
        assert_eq!(collector.bound(1), 6);
        collector.collect(5, &[1]);
        assert!(collector.patterns_for(1).is_empty());
        collector.collect(7, &[1]);
        assert_eq!(collector.patterns_for(1), vec![(7, vec![1])]);
    }

    #[test]
    fn test_lowest_bound_tracks_weakest_item() {
        let collector = PerItemTopKCollector::new(1, [1, 2]);
        collector.collect(9, &[1]);
        // item 2 is still empty: anything could enter its top-k
        assert_eq!(collector.lowest_bound(), 0);
        collector.collect(3, &[2]);
        assert_eq!(collector.lowest_bound(), 3);
    }

    #[test]
    fn test_bounds_snapshot_roundtrip() {
        let collector = PerItemTopKCollector::new(1, [1, 2, 3]);
        collector.collect(4, &[1]);
        collector.collect(6, &[2]);
        let snapshot = collector.bounds_snapshot();
        assert_eq!(snapshot, vec![(1, 4), (2, 6), (3, 0)]);

        let reloaded = PerItemTopKCollector::new(1, [1, 2, 3]);
        reloaded.preload_bounds(snapshot);
        assert_eq!(reloaded.bound(2), 6);
    }

    #[test]
    fn test_concurrent_collection_is_consistent() {
        use std::sync::Arc as StdArc;
        let collector = StdArc::new(PerItemTopKCollector::new(4, 0..8));
        let mut handles = Vec::new();
        for worker in 0u32..4 {
            let collector = StdArc::clone(&collector);
            handles.push(std::thread::spawn(move || {
                for support in 1..50u32 {
                    collector.collect(support, &[worker, worker + 4]);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        for item in 0..8u32 {
            let top = collector.patterns_for(item);
            assert_eq!(top.len(), 4);
            // strongest supports survive in order
            let supports: Vec<u32> = top.iter().map(|(s, _)| *s).collect();
            assert_eq!(supports, vec![49, 48, 47, 46]);
        }
    }
}
