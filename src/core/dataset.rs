//! Transaction datasets and their projections.
//!
//! A [`Dataset`] stores one recursion node's transactions (in that node's
//! item space) and delivers occurrences: for an extension item, the stream
//! of transactions containing it. Projection produces the child dataset by
//! one of two strategies, chosen by data density exactly as configured in
//! [`MinerConfig`](crate::core::params::MinerConfig):
//!
//! - **view**: when the projection keeps more than `view_support_threshold`
//!   of the current transactions (and transactions are not pathologically
//!   long), nothing is copied: the view re-filters the parent's storage on
//!   read through a scope tid-list and an item renaming;
//! - **materialized**: otherwise a fresh compact store is built, with transactions
//!   filtered to surviving items, re-encoded with the smallest sufficient
//!   tid-list encoding, closure items dropped.
//!
//! Parent storage is shared read-only behind [`Arc`]; a chain of views keeps
//! one materialized core alive until the longest-lived child releases it.

use std::sync::Arc;

use crate::core::counters::{Counters, NO_ITEM};
use crate::core::params::MinerConfig;
use crate::core::tidlist::TidList;
use crate::core::transactions::TransactionsList;
use crate::error::Result;

/// Materialized storage: flat transactions plus their occurrence index.
#[derive(Debug, Clone)]
pub struct DatasetCore {
    transactions: TransactionsList,
    tids: TidList,
}

/// Lazy projection over a materialized core.
#[derive(Debug, Clone)]
pub struct DatasetView {
    core: Arc<DatasetCore>,
    /// Sorted core tids forming this projection.
    scope: Vec<usize>,
    /// Core-space item to this view's item space; [`NO_ITEM`] marks items
    /// dropped somewhere along the view chain.
    rename: Vec<usize>,
    /// This view's item space to core-space items.
    reverse: Vec<usize>,
}

/// Items of one delivered transaction, already translated to the dataset's
/// own item space.
pub enum DeliveredItems<'a> {
    /// Materialized storage: items are stored in the right space.
    Direct(std::slice::Iter<'a, u32>),
    /// View storage: parent items filtered and renamed on the fly.
    Renamed {
        inner: std::slice::Iter<'a, u32>,
        rename: &'a [usize],
    },
}

impl Iterator for DeliveredItems<'_> {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        match self {
            Self::Direct(items) => items.next().copied(),
            Self::Renamed { inner, rename } => {
                for &item in inner.by_ref() {
                    let renamed = rename[item as usize];
                    if renamed != NO_ITEM {
                        return Some(renamed as u32);
                    }
                }
                None
            }
        }
    }
}

/// One node's transaction store, materialized or viewed.
#[derive(Debug, Clone)]
pub enum Dataset {
    /// Compact re-encoded storage.
    Materialized(Arc<DatasetCore>),
    /// Read-time filtered projection of an ancestor's storage.
    View(DatasetView),
}

impl Dataset {
    /// Build the root dataset from raw weighted transactions (original ids),
    /// filtered and renamed through the root counters.
    ///
    /// # Errors
    ///
    /// Propagates tid-list construction failures; these indicate a factory
    /// sizing bug, not bad input.
    pub fn from_root(transactions: &[(Vec<u32>, u32)], counters: &Counters) -> Result<Self> {
        let rename = counters.rename();
        let mut store =
            TransactionsList::with_capacity(transactions.len(), counters.nb_frequents());
        let mut occurrence_counts = vec![0usize; counters.nb_frequents()];
        for (items, weight) in transactions {
            if *weight == 0 {
                continue;
            }
            store.begin(*weight);
            for &item in items {
                let renamed = rename[item as usize];
                if renamed != NO_ITEM {
                    store.push_item(renamed as u32);
                    occurrence_counts[renamed] += 1;
                }
            }
        }
        Self::materialize(store, &occurrence_counts)
    }

    /// Index a filled store with the smallest sufficient tid-list encoding.
    fn materialize(store: TransactionsList, occurrence_counts: &[usize]) -> Result<Self> {
        let max_tid = store.stored_count().saturating_sub(1);
        let mut tids = TidList::with_capacities(occurrence_counts, max_tid)?;
        for (tid, transaction) in store.iter() {
            for &item in transaction.items {
                tids.add_transaction(item as usize, tid)?;
            }
        }
        Ok(Self::Materialized(Arc::new(DatasetCore {
            transactions: store,
            tids,
        })))
    }

    /// Project this dataset on an accepted extension, using the extension's
    /// freshly computed counters to choose and parameterize the strategy.
    ///
    /// # Errors
    ///
    /// Propagates occurrence-delivery and tid-list construction failures.
    pub fn project(
        &self,
        extension: usize,
        counters: &Counters,
        config: &MinerConfig,
    ) -> Result<Self> {
        let support_rate =
            counters.distinct_transactions_count() as f64 / self.stored_count().max(1) as f64;
        let average_len = counters.average_transaction_length();

        if average_len < config.long_transaction_threshold
            && support_rate > config.view_support_threshold
        {
            self.project_view(extension, counters)
        } else {
            self.project_materialized(extension, counters)
        }
    }

    fn project_view(&self, extension: usize, counters: &Counters) -> Result<Self> {
        match self {
            Self::Materialized(core) => {
                let scope: Vec<usize> = core.tids.get(extension)?.collect();
                Ok(Self::View(DatasetView {
                    core: Arc::clone(core),
                    scope,
                    rename: counters.rename().to_vec(),
                    reverse: counters.reverse_parent().to_vec(),
                }))
            }
            Self::View(view) => {
                let core_item = view.reverse[extension];
                let occurrences: Vec<usize> = view.core.tids.get(core_item)?.collect();
                let scope = intersect_sorted(&view.scope, &occurrences);

                // compose core -> parent -> child renamings
                let mut rename = vec![NO_ITEM; view.rename.len()];
                for (core_id, &parent_id) in view.rename.iter().enumerate() {
                    if parent_id != NO_ITEM {
                        rename[core_id] = counters.rename()[parent_id];
                    }
                }
                let reverse = counters
                    .reverse_parent()
                    .iter()
                    .map(|&parent_id| view.reverse[parent_id])
                    .collect();

                Ok(Self::View(DatasetView {
                    core: Arc::clone(&view.core),
                    scope,
                    rename,
                    reverse,
                }))
            }
        }
    }

    fn project_materialized(&self, extension: usize, counters: &Counters) -> Result<Self> {
        let rename = counters.rename();
        let mut store = TransactionsList::with_capacity(
            counters.distinct_transactions_count(),
            counters.nb_frequents(),
        );
        let mut occurrence_counts = vec![0usize; counters.nb_frequents()];
        self.for_each_transaction_of(extension, |items, weight| {
            store.begin(weight);
            for item in items {
                let renamed = rename[item as usize];
                if renamed != NO_ITEM {
                    store.push_item(renamed as u32);
                    occurrence_counts[renamed] += 1;
                }
            }
        })?;
        Self::materialize(store, &occurrence_counts)
    }

    /// Deliver every transaction containing `item`, with its weight.
    ///
    /// Items arrive in this dataset's own space; zero-weight transactions
    /// are skipped.
    ///
    /// # Errors
    ///
    /// [`crate::PatternCraftError::UnknownItem`] when `item` has no
    /// occurrence list.
    pub fn for_each_transaction_of<F>(&self, item: usize, mut f: F) -> Result<()>
    where
        F: FnMut(DeliveredItems<'_>, u32),
    {
        match self {
            Self::Materialized(core) => {
                let tids: Vec<usize> = core.tids.get(item)?.collect();
                for tid in tids {
                    let transaction = core.transactions.transaction(tid);
                    if transaction.weight == 0 {
                        continue;
                    }
                    f(
                        DeliveredItems::Direct(transaction.items.iter()),
                        transaction.weight,
                    );
                }
            }
            Self::View(view) => {
                let core_item = view.reverse[item];
                let occurrences: Vec<usize> = view.core.tids.get(core_item)?.collect();
                for tid in intersect_sorted(&view.scope, &occurrences) {
                    let transaction = view.core.transactions.transaction(tid);
                    if transaction.weight == 0 {
                        continue;
                    }
                    f(
                        DeliveredItems::Renamed {
                            inner: transaction.items.iter(),
                            rename: &view.rename,
                        },
                        transaction.weight,
                    );
                }
            }
        }
        Ok(())
    }

    /// Materialize the occurrence stream of `item` as `(items, weight)`
    /// pairs, mainly for tests and the projection-equivalence property.
    ///
    /// # Errors
    ///
    /// Same conditions as [`for_each_transaction_of`](Self::for_each_transaction_of).
    pub fn transactions_of(&self, item: usize) -> Result<Vec<(Vec<u32>, u32)>> {
        let mut out = Vec::new();
        self.for_each_transaction_of(item, |items, weight| {
            let mut collected: Vec<u32> = items.collect();
            collected.sort_unstable();
            out.push((collected, weight));
        })?;
        Ok(out)
    }

    /// Number of stored transactions (views: scope size).
    #[must_use]
    pub fn stored_count(&self) -> usize {
        match self {
            Self::Materialized(core) => core.transactions.stored_count(),
            Self::View(view) => view.scope.len(),
        }
    }

    /// Cheap first-parent pre-test, without counting.
    ///
    /// Scans items above `extension` for one whose occurrence list covers
    /// every transaction of the extension; such an item is in the projected
    /// closure and proves the extension non-canonical. Returns the witness,
    /// or `None` when no violation is detectable at this level (views defer
    /// to the counting pass).
    ///
    /// # Errors
    ///
    /// Propagates occurrence-list lookups for known items.
    pub fn first_parent_violation(
        &self,
        extension: usize,
        nb_frequents: usize,
    ) -> Result<Option<usize>> {
        let core = match self {
            Self::Materialized(core) => core,
            Self::View(_) => return Ok(None),
        };
        let extension_tids: Vec<usize> = core.tids.get(extension)?.collect();
        if extension_tids.is_empty() {
            return Ok(None);
        }
        for item in (extension + 1)..nb_frequents {
            let covers = {
                let mut candidate_tids = core.tids.get(item)?;
                covers_sorted(&extension_tids, &mut candidate_tids)
            };
            if covers {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Active tid-list encoding, for diagnostics.
    #[must_use]
    pub fn encoding(&self) -> &'static str {
        match self {
            Self::Materialized(core) => core.tids.encoding(),
            Self::View(_) => "view",
        }
    }

    /// Deep copy, detaching from any shared storage.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        match self {
            Self::Materialized(core) => Self::Materialized(Arc::new(core.as_ref().clone())),
            Self::View(view) => Self::View(DatasetView {
                core: Arc::new(view.core.as_ref().clone()),
                scope: view.scope.clone(),
                rename: view.rename.clone(),
                reverse: view.reverse.clone(),
            }),
        }
    }
}

/// Intersection of two ascending tid sequences.
fn intersect_sorted(left: &[usize], right: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].cmp(&right[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Whether the ascending sequence `covered` is a subset of the ascending
/// iterator `covering`.
fn covers_sorted(covered: &[usize], covering: &mut impl Iterator<Item = usize>) -> bool {
    let mut position = 0;
    for tid in covering {
        if position == covered.len() {
            return true;
        }
        if tid == covered[position] {
            position += 1;
        } else if tid > covered[position] {
            return false;
        }
    }
    position == covered.len()
}
