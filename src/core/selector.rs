//! Candidate selectors and the selector chain.
//!
//! Before an exploration step pays for a projection, each candidate extension
//! runs through a chain of cheap predicates evaluated left to right with
//! short-circuit on the first rejection. Selectors are a closed set of
//! strategies behind one enum, the same shape the rest of the crate uses for
//! interchangeable encodings.
//!
//! The chain a child step inherits is a filtered copy of its parent's:
//! the partition starter restriction applies to root candidates only, and
//! the first-parent pre-test is carried only while transactions are long
//! enough that a wasted counting pass would hurt.

use crate::core::counters::Counters;
use crate::core::dataset::Dataset;
use crate::error::{PatternCraftError, Result};

/// Item-space partition descriptor for distributed batch execution.
///
/// A worker process owns the root starters whose original id falls in its
/// group (`item % group_count == group_id`); everything else is explored
/// only as a deeper extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Partition {
    /// This process's group.
    pub group_id: usize,
    /// Total number of groups.
    pub group_count: usize,
    /// Largest original item id in the dataset.
    pub max_item: usize,
}

impl Partition {
    /// Create a validated partition descriptor.
    ///
    /// # Errors
    ///
    /// [`PatternCraftError::InvalidPartition`] when the group space is empty
    /// or `group_id` lies outside it.
    pub fn new(group_id: usize, group_count: usize, max_item: usize) -> Result<Self> {
        if group_count == 0 || group_id >= group_count {
            return Err(PatternCraftError::invalid_partition(group_id, group_count));
        }
        Ok(Self {
            group_id,
            group_count,
            max_item,
        })
    }

    /// Whether this process explores `item` as a root starter.
    #[must_use]
    pub fn owns(&self, item: u32) -> bool {
        let item = item as usize;
        item <= self.max_item && item % self.group_count == self.group_id
    }
}

/// Everything a selector may consult about the candidate's node.
///
/// The collector's pruning information reaches selectors indirectly: raised
/// per-item bounds are folded into the node's effective minimum support,
/// which [`Selector::CollectorBound`] reads from the counters.
pub struct SelectionContext<'a> {
    /// The node's counters.
    pub counters: &'a Counters,
    /// The node's dataset.
    pub dataset: &'a Dataset,
}

/// Decision produced by a selector or a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Keep evaluating / expand the candidate.
    Accept,
    /// Drop the candidate silently.
    Reject,
    /// Drop the candidate and record its true first parent.
    NonCanonical {
        /// Current-level id of the closure item proving the violation.
        witness: usize,
    },
}

/// One selector strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Tid-list-based first-parent pre-test: detects a covering item above
    /// the candidate without paying for a counting pass. Materialized
    /// datasets only; views defer to the counting-time closure test.
    FirstParentPreTest,
    /// Support-bound test against the node's effective minimum support,
    /// which the collector's per-item bounds may have raised past the
    /// configured threshold.
    CollectorBound,
    /// Root starter restriction from a batch-execution partition.
    Starters(Partition),
}

impl Selector {
    fn select(&self, candidate: usize, ctx: &SelectionContext<'_>) -> Result<Selection> {
        match self {
            Self::FirstParentPreTest => {
                match ctx
                    .dataset
                    .first_parent_violation(candidate, ctx.counters.nb_frequents())?
                {
                    Some(witness) => Ok(Selection::NonCanonical { witness }),
                    None => Ok(Selection::Accept),
                }
            }
            Self::CollectorBound => {
                if ctx.counters.support_of(candidate) < ctx.counters.min_support() {
                    Ok(Selection::Reject)
                } else {
                    Ok(Selection::Accept)
                }
            }
            Self::Starters(partition) => {
                let original = ctx.counters.reverse()[candidate];
                if partition.owns(original) {
                    Ok(Selection::Accept)
                } else {
                    Ok(Selection::Reject)
                }
            }
        }
    }

    fn kind(&self) -> SelectorKind {
        match self {
            Self::FirstParentPreTest => SelectorKind::FirstParentPreTest,
            Self::CollectorBound => SelectorKind::CollectorBound,
            Self::Starters(_) => SelectorKind::Starters,
        }
    }
}

/// Selector discriminant, for chain filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    /// [`Selector::FirstParentPreTest`]
    FirstParentPreTest,
    /// [`Selector::CollectorBound`]
    CollectorBound,
    /// [`Selector::Starters`]
    Starters,
}

/// Left-to-right selector pipeline with short-circuit on rejection.
#[derive(Debug, Clone, Default)]
pub struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    /// Empty chain: accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a selector at the end of the chain.
    pub fn append(&mut self, selector: Selector) {
        self.selectors.push(selector);
    }

    /// Whether the chain carries a selector of the given kind.
    #[must_use]
    pub fn contains(&self, kind: SelectorKind) -> bool {
        self.selectors.iter().any(|s| s.kind() == kind)
    }

    /// Evaluate the chain on a candidate.
    ///
    /// # Errors
    ///
    /// Propagates dataset failures from the first-parent pre-test.
    pub fn select(&self, candidate: usize, ctx: &SelectionContext<'_>) -> Result<Selection> {
        for selector in &self.selectors {
            match selector.select(candidate, ctx)? {
                Selection::Accept => continue,
                rejection => return Ok(rejection),
            }
        }
        Ok(Selection::Accept)
    }

    /// Copy of the chain.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Copy of the chain without selectors of the given kind.
    #[must_use]
    pub fn copy_excluding(&self, kind: SelectorKind) -> Self {
        Self {
            selectors: self
                .selectors
                .iter()
                .copied()
                .filter(|s| s.kind() != kind)
                .collect(),
        }
    }

    /// Chain inherited by a child step.
    ///
    /// Starter restrictions never propagate past the root. The first-parent
    /// pre-test is included exactly when the child's transactions are long
    /// (`include_fp_pretest`), added on demand if the parent chain lacked it.
    #[must_use]
    pub fn for_child(&self, include_fp_pretest: bool) -> Self {
        let mut child = self.copy_excluding(SelectorKind::Starters);
        if include_fp_pretest {
            if !child.contains(SelectorKind::FirstParentPreTest) {
                child.append(Selector::FirstParentPreTest);
            }
        } else {
            child = child.copy_excluding(SelectorKind::FirstParentPreTest);
        }
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counters::Counters;
    use crate::core::dataset::Dataset;

    fn micro() -> Vec<(Vec<u32>, u32)> {
        vec![
            (vec![5, 3, 1, 6, 7], 1),
            (vec![5, 3, 1, 2, 6], 1),
            (vec![5, 7], 1),
            (vec![], 1),
            (vec![3, 2, 7], 1),
            (vec![5, 3, 1, 6, 7], 1),
        ]
    }

    fn context() -> (Counters, Dataset) {
        let counters = Counters::count_root(2, &micro(), 7);
        let dataset = Dataset::from_root(&micro(), &counters).unwrap();
        (counters, dataset)
    }

    #[test]
    fn test_partition_validation() {
        assert!(Partition::new(0, 1, 10).is_ok());
        assert!(Partition::new(2, 2, 10).is_err());
        assert!(Partition::new(0, 0, 10).is_err());
    }

    #[test]
    fn test_partition_ownership() {
        let partition = Partition::new(1, 3, 100).unwrap();
        assert!(partition.owns(4));
        assert!(!partition.owns(3));
        // right group, but above max_item
        assert!(!partition.owns(103));
    }

    #[test]
    fn test_empty_chain_accepts() {
        let (counters, dataset) = context();
        let ctx = SelectionContext {
            counters: &counters,
            dataset: &dataset,
        };
        let chain = SelectorChain::new();
        assert_eq!(chain.select(0, &ctx).unwrap(), Selection::Accept);
    }

    #[test]
    fn test_first_parent_pre_test_finds_witness() {
        let (counters, dataset) = context();
        let ctx = SelectionContext {
            counters: &counters,
            dataset: &dataset,
        };
        let mut chain = SelectorChain::new();
        chain.append(Selector::FirstParentPreTest);

        // item 2 closes over item 3, which has a higher current-level id
        let candidate = counters.rename()[2];
        let witness = counters.rename()[3];
        assert_eq!(
            chain.select(candidate, &ctx).unwrap(),
            Selection::NonCanonical { witness }
        );
        // item 3 itself is canonical
        assert_eq!(chain.select(witness, &ctx).unwrap(), Selection::Accept);
    }

    #[test]
    fn test_starters_restriction_uses_original_ids() {
        let (counters, dataset) = context();
        let ctx = SelectionContext {
            counters: &counters,
            dataset: &dataset,
        };
        let mut chain = SelectorChain::new();
        chain.append(Selector::Starters(Partition::new(1, 2, 7).unwrap()));

        // odd original ids pass, even ones are rejected
        for candidate in 0..counters.nb_frequents() {
            let original = counters.reverse()[candidate];
            let expected = if original % 2 == 1 {
                Selection::Accept
            } else {
                Selection::Reject
            };
            assert_eq!(chain.select(candidate, &ctx).unwrap(), expected);
        }
    }

    #[test]
    fn test_child_chain_filtering() {
        let mut chain = SelectorChain::new();
        chain.append(Selector::Starters(Partition::new(0, 2, 7).unwrap()));
        chain.append(Selector::CollectorBound);

        let short = chain.for_child(false);
        assert!(!short.contains(SelectorKind::Starters));
        assert!(!short.contains(SelectorKind::FirstParentPreTest));
        assert!(short.contains(SelectorKind::CollectorBound));

        let long = chain.for_child(true);
        assert!(long.contains(SelectorKind::FirstParentPreTest));
        assert!(!long.contains(SelectorKind::Starters));
    }
}
