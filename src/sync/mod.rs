//! Parallel work distribution: shared jobs and the worker pool.
//!
//! A [`SharedJob`] wraps one [`ExplorationStep`] so that a fixed pool of
//! workers can drain its candidate stream cooperatively. Work distribution
//! follows one discipline: workers pull candidates from the shared job, and
//! every successfully expanded child becomes the root of that worker's
//! *private* depth-first stack. A worker only returns to the shared job once
//! its private stack is empty, which confines lock traffic to job-boundary
//! operations and keeps deep recursion entirely lock-free.
//!
//! Besides the candidate cursor (already atomic inside the step), a shared
//! job carries two concurrently updated structures:
//!
//! - the **previous explore result**: a monotonic cursor recording the
//!   highest candidate whose expansion finished and what it produced,
//!   advanced by compare-and-update under a lock;
//! - the **invalidation multimap**: rejecting first parent → the candidates
//!   it invalidated, letting a worker ask which of its remaining candidates
//!   were already proven non-canonical by a peer for parents above a given
//!   item.
//!
//! Failed first-parent tests themselves live in the step's own map, so
//! sibling workers sharing the step skip recomputation automatically.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::core::params::MinerConfig;
use crate::core::step::{ExpandOutcome, ExplorationStep, MineContext};
use crate::error::Result;
use crate::metrics::{MetricsSnapshot, MinerMetrics};
use crate::topk::collector::PerItemTopKCollector;

/// Support of the last finished expansion, by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreResult {
    /// The candidate produced a child step.
    Expanded,
    /// The candidate was collected without a child, or rejected.
    Consumed,
    /// The candidate failed its first-parent test.
    NonCanonical,
}

#[derive(Debug, Default)]
struct ExploreCursor {
    previous_item: Option<usize>,
    previous_result: Option<ExploreResult>,
}

/// One exploration step shared by several workers.
#[derive(Debug)]
pub struct SharedJob {
    step: ExplorationStep,
    cursor: Mutex<ExploreCursor>,
    invalidated: Mutex<BTreeMap<usize, Vec<usize>>>,
}

impl SharedJob {
    /// Wrap a step for cooperative draining.
    #[must_use]
    pub fn new(step: ExplorationStep) -> Self {
        Self {
            step,
            cursor: Mutex::new(ExploreCursor::default()),
            invalidated: Mutex::new(BTreeMap::new()),
        }
    }

    /// The wrapped step.
    #[must_use]
    pub fn step(&self) -> &ExplorationStep {
        &self.step
    }

    /// Claim and expand shared candidates until one yields a child step.
    ///
    /// Rejections and first-parent failures are consumed here, updating the
    /// shared cursor and invalidation map as they go; `None` means the
    /// job's candidate stream is exhausted.
    ///
    /// # Errors
    ///
    /// Propagates dataset and counting failures.
    pub fn next(&self, ctx: &MineContext<'_>) -> Result<Option<ExplorationStep>> {
        while let Some(candidate) = self.step.claim_candidate() {
            match self.step.expand_candidate(candidate, ctx)? {
                ExpandOutcome::Child(child) => {
                    self.update_explore_result(candidate, ExploreResult::Expanded);
                    return Ok(Some(child));
                }
                ExpandOutcome::NonCanonical { witness } => {
                    self.record_invalidation(witness, candidate);
                    self.update_explore_result(candidate, ExploreResult::NonCanonical);
                }
                ExpandOutcome::Collected | ExpandOutcome::Rejected => {
                    self.update_explore_result(candidate, ExploreResult::Consumed);
                }
            }
        }
        Ok(None)
    }

    /// Monotonically advance the shared explore cursor.
    ///
    /// A stale update (for a candidate below the recorded one) is dropped,
    /// so the cursor always reflects the furthest finished expansion.
    pub fn update_explore_result(&self, candidate: usize, result: ExploreResult) {
        let mut cursor = self.cursor.lock();
        if cursor.previous_item.map_or(true, |previous| candidate > previous) {
            cursor.previous_item = Some(candidate);
            cursor.previous_result = Some(result);
        }
    }

    /// The furthest finished expansion and its outcome.
    #[must_use]
    pub fn previous_explore_result(&self) -> (Option<usize>, Option<ExploreResult>) {
        let cursor = self.cursor.lock();
        (cursor.previous_item, cursor.previous_result)
    }

    fn record_invalidation(&self, first_parent: usize, candidate: usize) {
        self.invalidated
            .lock()
            .entry(first_parent)
            .or_default()
            .push(candidate);
    }

    /// Candidates already proven non-canonical by peers, for first parents
    /// strictly above `parent`.
    #[must_use]
    pub fn invalidated_above(&self, parent: usize) -> Vec<usize> {
        let invalidated = self.invalidated.lock();
        let mut items: Vec<usize> = invalidated
            .range(parent + 1..)
            .flat_map(|(_, candidates)| candidates.iter().copied())
            .collect();
        items.sort_unstable();
        items
    }
}

/// Mining results: the collector is the caller's, so this reports the run's
/// event counters and the root pattern support.
#[derive(Debug, Clone, Copy)]
pub struct MiningOutcome {
    /// Event counters for the whole run.
    pub metrics: MetricsSnapshot,
}

/// Fixed-pool parallel miner.
///
/// # Examples
///
/// ```
/// use patterncraft::core::params::MinerConfig;
/// use patterncraft::sync::Miner;
/// use patterncraft::topk::collector::PerItemTopKCollector;
///
/// let transactions = vec![
///     (vec![1, 2, 3], 1),
///     (vec![1, 2], 1),
///     (vec![2, 3], 1),
/// ];
/// let config = MinerConfig::new(2, 5).with_threads(2).validated().unwrap();
/// let collector = PerItemTopKCollector::new(5, 1..=3);
/// let miner = Miner::new(config).unwrap();
/// miner.mine(&transactions, &collector).unwrap();
///
/// // {2} appears in every top-k of an item it contains
/// assert!(collector
///     .patterns_for(2)
///     .iter()
///     .any(|(support, items)| *support == 3 && items == &vec![2]));
/// ```
#[derive(Debug)]
pub struct Miner {
    config: MinerConfig,
}

impl Miner {
    /// Create a miner from a configuration, validating it.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation failures.
    pub fn new(config: MinerConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Mine raw weighted transactions into the collector.
    ///
    /// # Errors
    ///
    /// Propagates construction and exploration failures.
    pub fn mine(
        &self,
        transactions: &[(Vec<u32>, u32)],
        collector: &PerItemTopKCollector,
    ) -> Result<MiningOutcome> {
        let root = ExplorationStep::from_transactions(&self.config, transactions)?;
        self.mine_from(root, collector)
    }

    /// Mine from a prepared root step (for callers that appended partition
    /// or custom selectors).
    ///
    /// # Errors
    ///
    /// Propagates exploration failures from any worker.
    pub fn mine_from(
        &self,
        root: ExplorationStep,
        collector: &PerItemTopKCollector,
    ) -> Result<MiningOutcome> {
        let metrics = MinerMetrics::new();

        // a non-empty root pattern is the global closure: every frequent
        // pattern contains it, and it is itself closed
        if !root.counters().pattern().is_empty() {
            collector.collect(root.counters().transactions_count(), root.counters().pattern());
        }

        let job = SharedJob::new(root);
        let failure: Mutex<Option<crate::PatternCraftError>> = Mutex::new(None);

        std::thread::scope(|scope| {
            for _ in 0..self.config.threads {
                scope.spawn(|| {
                    let ctx = MineContext {
                        config: &self.config,
                        collector,
                        metrics: &metrics,
                    };
                    if let Err(error) = Self::work(&job, &ctx, &failure) {
                        failure.lock().get_or_insert(error);
                    }
                });
            }
        });

        match failure.into_inner() {
            Some(error) => Err(error),
            None => Ok(MiningOutcome {
                metrics: metrics.snapshot(),
            }),
        }
    }

    /// One worker: drain the shared job, exploring each expanded child with
    /// a private depth-first stack.
    fn work(
        job: &SharedJob,
        ctx: &MineContext<'_>,
        failure: &Mutex<Option<crate::PatternCraftError>>,
    ) -> Result<()> {
        while let Some(child) = job.next(ctx)? {
            let mut stack = vec![child];
            while let Some(top) = stack.last() {
                if failure.lock().is_some() {
                    return Ok(());
                }
                match top.next(ctx)? {
                    Some(grandchild) => stack.push(grandchild),
                    None => {
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }
}
