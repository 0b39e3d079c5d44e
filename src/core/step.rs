//! The recursion engine: one exploration step per search-tree node.
//!
//! An [`ExplorationStep`] ties together a node's [`Dataset`], its
//! [`Counters`], the inherited [`SelectorChain`] and an atomic candidate
//! cursor. [`ExplorationStep::next`] drives the depth-first traversal of the
//! closed-itemset lattice: it pulls ascending-id candidates, runs the
//! selector chain, projects and counts accepted ones, applies the
//! first-parent test and returns the resulting child step, or `None` once
//! the candidate space is exhausted.
//!
//! # First-parent test
//!
//! Projecting on candidate `c` computes the closure of `pattern ∪ {c}`. If
//! that closure gained an item with a current-level id above `c`, the same
//! closed itemset is generated from that higher item's branch instead, and
//! `c` is rejected. The offending witness is recorded in the step's
//! failed-test map so sibling workers skip the recomputation; when the
//! witness's item is tracked, the observed pattern is still offered to the
//! collector so no top-k loses coverage to the rejection.
//!
//! # Traversal strategies
//!
//! [`ExplorationStrategy::DepthFirst`] expands each accepted candidate
//! immediately. [`ExplorationStrategy::PreScreen`] first screens every
//! candidate of the node (cheap support counting, first-parent test,
//! collection), queues the survivors, and only then pays for projections,
//! re-deriving counters whose support floor the collector has meanwhile
//! raised. Both produce exactly the same closed itemsets.
//!
//! All shared state of a step (candidate cursor, failed-test map, pre-screen
//! queue) is lock-scoped to single operations, so several workers can drain
//! one step cooperatively.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::core::counters::{Counters, FrequentsIterator, NO_ITEM};
use crate::core::dataset::Dataset;
use crate::core::params::{ExplorationStrategy, MinerConfig};
use crate::core::selector::{Selection, SelectionContext, Selector, SelectorChain};
use crate::error::Result;
use crate::metrics::MinerMetrics;
use crate::topk::collector::PerItemTopKCollector;

/// Shared collaborators threaded through every recursion call.
pub struct MineContext<'a> {
    /// Run configuration.
    pub config: &'a MinerConfig,
    /// The shared per-item top-k collector.
    pub collector: &'a PerItemTopKCollector,
    /// Shared event counters.
    pub metrics: &'a MinerMetrics,
}

/// Lifecycle state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Built from raw input, candidates remaining.
    Root,
    /// Has an unexhausted candidate cursor.
    Live,
    /// Candidate cursor spent.
    Exhausted,
    /// No candidates existed after projection.
    Pruned,
}

/// What expanding one candidate produced.
#[derive(Debug)]
pub enum ExpandOutcome {
    /// Accepted; the child step is ready for deeper exploration.
    Child(ExplorationStep),
    /// Accepted and collected, but the projection has nothing left to
    /// explore, so no child was built.
    Collected,
    /// Dropped by the selector chain or a raised support floor.
    Rejected,
    /// Dropped by the first-parent test.
    NonCanonical {
        /// Current-level id of the recorded true first parent.
        witness: usize,
    },
}

/// A candidate that survived the pre-screening pass, with the counters the
/// pass computed for it.
#[derive(Debug)]
struct PreparedExtension {
    candidate: usize,
    counters: Counters,
}

/// One node of the exploration tree.
#[derive(Debug)]
pub struct ExplorationStep {
    /// Extension (in the parent's id space) that produced this node;
    /// [`NO_ITEM`] for the root.
    core_item: usize,
    counters: Counters,
    dataset: Option<Dataset>,
    candidates: Option<FrequentsIterator>,
    select_chain: SelectorChain,
    /// Non-canonical extension -> its recorded true first parent.
    failed_fp_tests: Mutex<HashMap<usize, usize>>,
    /// Pre-screening queue, filled on first use by that strategy.
    prescreen: Mutex<Option<VecDeque<PreparedExtension>>>,
}

impl ExplorationStep {
    /// Build the root step from raw weighted transactions in original ids.
    ///
    /// The root carries the collector-bound selector; partition starter
    /// restrictions are appended by the caller through
    /// [`append_selector`](Self::append_selector).
    ///
    /// # Errors
    ///
    /// Propagates dataset construction failures.
    pub fn from_transactions(
        config: &MinerConfig,
        transactions: &[(Vec<u32>, u32)],
    ) -> Result<Self> {
        let max_item = transactions
            .iter()
            .flat_map(|(items, _)| items.iter().copied())
            .max()
            .unwrap_or(0) as usize;
        let counters = Counters::count_root(config.min_support, transactions, max_item);
        let dataset = Dataset::from_root(transactions, &counters)?;
        let candidates = (counters.first_parent_bound() > 0)
            .then(|| FrequentsIterator::new(0, counters.first_parent_bound()));
        let mut select_chain = SelectorChain::new();
        select_chain.append(Selector::CollectorBound);
        Ok(Self {
            core_item: NO_ITEM,
            counters,
            dataset: Some(dataset),
            candidates,
            select_chain,
            failed_fp_tests: Mutex::new(HashMap::new()),
            prescreen: Mutex::new(None),
        })
    }

    /// Append a selector to this step's chain.
    pub fn append_selector(&mut self, selector: Selector) {
        self.select_chain.append(selector);
    }

    /// The extension that created this node, in its parent's id space;
    /// [`NO_ITEM`] for the root.
    #[must_use]
    pub fn core_item(&self) -> usize {
        self.core_item
    }

    /// This node's counters.
    #[must_use]
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> StepState {
        match &self.candidates {
            None => StepState::Pruned,
            Some(candidates) if candidates.is_exhausted() => StepState::Exhausted,
            Some(_) if self.core_item == NO_ITEM => StepState::Root,
            Some(_) => StepState::Live,
        }
    }

    /// The recorded true first parent of a non-canonical extension.
    #[must_use]
    pub fn failed_first_parent(&self, item: usize) -> Option<usize> {
        self.failed_fp_tests.lock().get(&item).copied()
    }

    /// How many non-canonical extensions this step has caught.
    #[must_use]
    pub fn failed_fp_count(&self) -> usize {
        self.failed_fp_tests.lock().len()
    }

    /// Claim the next unexplored candidate id, shared across workers.
    pub(crate) fn claim_candidate(&self) -> Option<usize> {
        self.candidates.as_ref()?.next()
    }

    /// Produce the next child step, or `None` once this node is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates dataset and counting failures.
    pub fn next(&self, ctx: &MineContext<'_>) -> Result<Option<ExplorationStep>> {
        match ctx.config.strategy {
            ExplorationStrategy::DepthFirst => self.next_depth_first(ctx),
            ExplorationStrategy::PreScreen => self.next_pre_screened(ctx),
        }
    }

    fn next_depth_first(&self, ctx: &MineContext<'_>) -> Result<Option<ExplorationStep>> {
        while let Some(candidate) = self.claim_candidate() {
            if let ExpandOutcome::Child(child) = self.expand_candidate(candidate, ctx)? {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    fn next_pre_screened(&self, ctx: &MineContext<'_>) -> Result<Option<ExplorationStep>> {
        if self.candidates.is_none() {
            return Ok(None);
        }
        let mut queue = self.prescreen.lock();
        if queue.is_none() {
            let mut pending = VecDeque::new();
            while let Some(candidate) = self.claim_candidate() {
                if let Some(prepared) = self.prepare_candidate(candidate, ctx)? {
                    pending.push_back(prepared);
                }
            }
            *queue = Some(pending);
        }
        let pending = queue.as_mut().expect("filled above");
        while let Some(prepared) = pending.pop_front() {
            let mut extension_counters = prepared.counters;
            // the collector bound may have risen since the screening pass
            let floor = extension_counters.current_floor(ctx.collector);
            if floor > extension_counters.min_support() {
                ctx.metrics.record_redo();
                extension_counters = self.recount_candidate(prepared.candidate, floor, ctx)?;
            }
            if let ExpandOutcome::Child(child) =
                self.build_child(prepared.candidate, extension_counters, ctx)?
            {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Run one candidate through selection, counting, the first-parent test
    /// and, on acceptance, child construction.
    ///
    /// # Errors
    ///
    /// Propagates dataset and counting failures.
    pub(crate) fn expand_candidate(
        &self,
        candidate: usize,
        ctx: &MineContext<'_>,
    ) -> Result<ExpandOutcome> {
        match self.screen_candidate(candidate, ctx)? {
            Screened::Counted(extension_counters) => {
                self.build_child(candidate, extension_counters, ctx)
            }
            Screened::Rejected => Ok(ExpandOutcome::Rejected),
            Screened::NonCanonical { witness } => Ok(ExpandOutcome::NonCanonical { witness }),
        }
    }

    fn prepare_candidate(
        &self,
        candidate: usize,
        ctx: &MineContext<'_>,
    ) -> Result<Option<PreparedExtension>> {
        match self.screen_candidate(candidate, ctx)? {
            Screened::Counted(counters) => Ok(Some(PreparedExtension {
                candidate,
                counters,
            })),
            _ => Ok(None),
        }
    }

    /// Selection, counting, first-parent test, collection and starter-level
    /// bound tightening: everything short of paying for the projection.
    fn screen_candidate(&self, candidate: usize, ctx: &MineContext<'_>) -> Result<Screened> {
        let Some(dataset) = &self.dataset else {
            return Ok(Screened::Rejected);
        };
        if self.failed_fp_tests.lock().contains_key(&candidate) {
            return Ok(Screened::Rejected);
        }
        let selection_ctx = SelectionContext {
            counters: &self.counters,
            dataset,
        };
        match self.select_chain.select(candidate, &selection_ctx)? {
            Selection::Accept => {}
            Selection::Reject => return Ok(Screened::Rejected),
            Selection::NonCanonical { witness } => {
                self.record_failed_fp_test(candidate, witness, ctx);
                return Ok(Screened::NonCanonical { witness });
            }
        }

        let mut extension_counters =
            Counters::count_extension(&self.counters, dataset, candidate, self.use_sparse(candidate, ctx))?;

        if let Some(greatest) = extension_counters.greatest_closure_item() {
            if greatest > candidate {
                if ctx.config.early_collection
                    && ctx
                        .collector
                        .is_collected(self.counters.reverse()[greatest])
                {
                    ctx.collector.collect(
                        extension_counters.transactions_count(),
                        extension_counters.pattern(),
                    );
                }
                self.record_failed_fp_test(candidate, greatest, ctx);
                return Ok(Screened::NonCanonical { witness: greatest });
            }
        }

        ctx.collector.collect(
            extension_counters.transactions_count(),
            extension_counters.pattern(),
        );
        self.tighten_starter_bounds(&mut extension_counters, ctx);
        Ok(Screened::Counted(extension_counters))
    }

    fn recount_candidate(
        &self,
        candidate: usize,
        floor: u32,
        ctx: &MineContext<'_>,
    ) -> Result<Counters> {
        let dataset = self
            .dataset
            .as_ref()
            .expect("screened candidates come from a dataset");
        Counters::count_extension_with_floor(
            &self.counters,
            dataset,
            candidate,
            self.use_sparse(candidate, ctx),
            floor,
        )
    }

    fn use_sparse(&self, candidate: usize, ctx: &MineContext<'_>) -> bool {
        self.counters.pattern().is_empty() && candidate >= ctx.config.sparse_counters_from
    }

    /// Eager bound tightening for well-supported root starters: offer every
    /// frequent extension as an unclosed pattern, then raise the child's
    /// support floor from the refreshed bounds.
    fn tighten_starter_bounds(&self, extension_counters: &mut Counters, ctx: &MineContext<'_>) {
        if self.core_item != NO_ITEM || !ctx.config.insert_unclosed {
            return;
        }
        let fillable = ctx.config.min_support + ctx.config.k as u32;
        if extension_counters.transactions_count() < fillable {
            return;
        }
        extension_counters.insert_unclosed_patterns(ctx.collector, false);
        extension_counters.raise_min_support(ctx.collector);
    }

    fn build_child(
        &self,
        candidate: usize,
        extension_counters: Counters,
        ctx: &MineContext<'_>,
    ) -> Result<ExpandOutcome> {
        if extension_counters.first_parent_bound() == 0
            || extension_counters.distinct_transactions_count() == 0
        {
            return Ok(ExpandOutcome::Collected);
        }
        let dataset = self
            .dataset
            .as_ref()
            .expect("screened candidates come from a dataset")
            .project(candidate, &extension_counters, ctx.config)?;
        match &dataset {
            Dataset::View(_) => ctx.metrics.record_view_projection(),
            Dataset::Materialized(_) => ctx.metrics.record_materialized_projection(),
        }
        let long_transactions = extension_counters.average_transaction_length()
            > ctx.config.long_transaction_threshold;
        let select_chain = self.select_chain.for_child(long_transactions);
        let candidates = FrequentsIterator::new(0, extension_counters.first_parent_bound());
        ctx.metrics.record_expansion();
        Ok(ExpandOutcome::Child(ExplorationStep {
            core_item: candidate,
            counters: extension_counters,
            dataset: Some(dataset),
            candidates: Some(candidates),
            select_chain,
            failed_fp_tests: Mutex::new(HashMap::new()),
            prescreen: Mutex::new(None),
        }))
    }

    fn record_failed_fp_test(&self, item: usize, first_parent: usize, ctx: &MineContext<'_>) {
        let mut failed = self.failed_fp_tests.lock();
        if failed.insert(item, first_parent).is_none() {
            ctx.metrics.record_failed_fp_test();
        }
    }
}

enum Screened {
    Counted(Counters),
    Rejected,
    NonCanonical { witness: usize },
}
