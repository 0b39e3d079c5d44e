//! Per-item occurrence indexes (tid-lists) in multiple compact encodings.
//!
//! A tid-list maps every item of a dataset to the ordered sequence of
//! transaction ids containing it. Because projected datasets shrink rapidly
//! during exploration, the dominant memory cost is the cell width used to
//! store transaction ids; this module offers interchangeable encodings and a
//! capacity-driven factory so every dataset pays only for the range it needs:
//!
//! | Encoding | Cell | Capacity (max tid) |
//! |----------|------|--------------------|
//! | [`TidList::Byte`]  | `i8`  | 254 |
//! | [`TidList::Short`] | `i16` | 65,534 |
//! | [`TidList::Int`]   | `u32` | `u32::MAX` |
//! | [`TidList::Map`]   | growable `Vec<u32>` per item | unbounded |
//!
//! The packed encodings lay all lists out in one contiguous cell array with a
//! precomputed start offset and an independent write cursor per item, so
//! insertion order may interleave items freely. Ids beyond a signed cell's
//! positive range are folded into the negative half (`v' = MAX - v`), which
//! doubles the usable range at the cost of one branch per access; ids beyond
//! the folded range are a construction-time error, never a runtime one.
//!
//! [`RandomItemsTidList`] serves sparse, non-contiguous item spaces with the
//! same shared-backing-array layout, keyed by hash map instead of dense
//! offset tables.
//!
//! # Examples
//!
//! ```
//! use patterncraft::core::tidlist::TidList;
//!
//! // 2 items, item 0 occurs twice, item 1 once; max tid is 8
//! let mut tids = TidList::with_capacities(&[2, 1], 8).unwrap();
//! tids.add_transaction(0, 3).unwrap();
//! tids.add_transaction(1, 5).unwrap();
//! tids.add_transaction(0, 8).unwrap();
//!
//! let occurrences: Vec<usize> = tids.get(0).unwrap().collect();
//! assert_eq!(occurrences, vec![3, 8]);
//! ```

use std::collections::HashMap;

use crate::error::{PatternCraftError, Result};

/// Cell-level encoding contract shared by the packed layouts.
///
/// Implementations map a transaction id to a fixed-width cell and back,
/// reporting the largest representable id for the factory's capacity probe.
trait TidCell: Copy {
    /// Largest transaction id this cell can represent (after folding).
    const CAPACITY: usize;

    /// Encode a transaction id.
    ///
    /// # Errors
    ///
    /// Returns [`PatternCraftError::TidOverflow`] past [`Self::CAPACITY`].
    fn encode(tid: usize) -> Result<Self>
    where
        Self: Sized;

    /// Decode a cell back to the transaction id it was built from.
    fn decode(self) -> usize;
}

/// Sign-biased fold shared by the signed cell widths: ids above the positive
/// maximum are stored as `MAX - v`, landing in the negative half.
macro_rules! signed_tid_cell {
    ($ty:ty, $max:expr) => {
        impl TidCell for $ty {
            const CAPACITY: usize = 2 * $max;

            #[inline]
            fn encode(tid: usize) -> Result<Self> {
                if tid <= $max {
                    Ok(tid as $ty)
                } else if tid <= Self::CAPACITY {
                    Ok(($max as i64 - tid as i64) as $ty)
                } else {
                    Err(PatternCraftError::tid_overflow(tid, Self::CAPACITY))
                }
            }

            #[inline]
            fn decode(self) -> usize {
                if self >= 0 {
                    self as usize
                } else {
                    ($max as i64 - self as i64) as usize
                }
            }
        }
    };
}

signed_tid_cell!(i8, i8::MAX as usize);
signed_tid_cell!(i16, i16::MAX as usize);

impl TidCell for u32 {
    const CAPACITY: usize = u32::MAX as usize;

    #[inline]
    fn encode(tid: usize) -> Result<Self> {
        u32::try_from(tid).map_err(|_| PatternCraftError::tid_overflow(tid, Self::CAPACITY))
    }

    #[inline]
    fn decode(self) -> usize {
        self as usize
    }
}

/// Consecutive-items packed layout: one contiguous cell array, a start
/// offset per item allocated up front, and a moving write cursor per item.
#[derive(Debug, Clone)]
pub struct PackedTidList<C> {
    starts: Vec<usize>,
    cursors: Vec<usize>,
    cells: Vec<C>,
}

impl<C: TidCell + Default> PackedTidList<C> {
    /// Allocate extents for items `0..lengths.len()`, where `lengths[i]` is
    /// the exact number of occurrences item `i` will receive.
    fn with_capacities(lengths: &[usize]) -> Self {
        let mut starts = Vec::with_capacity(lengths.len());
        let mut total = 0;
        for &len in lengths {
            starts.push(total);
            total += len;
        }
        Self {
            starts,
            cursors: vec![0; lengths.len()],
            cells: vec![C::default(); total],
        }
    }

    fn extent(&self, item: usize) -> Result<(usize, usize)> {
        if item >= self.starts.len() {
            return Err(PatternCraftError::unknown_item(item));
        }
        let start = self.starts[item];
        Ok((start, start + self.cursors[item]))
    }

    fn add(&mut self, item: usize, tid: usize) -> Result<()> {
        if item >= self.starts.len() {
            return Err(PatternCraftError::unknown_item(item));
        }
        let position = self.starts[item] + self.cursors[item];
        self.cells[position] = C::encode(tid)?;
        self.cursors[item] += 1;
        Ok(())
    }

    fn iter(&self, item: usize) -> Result<impl Iterator<Item = usize> + '_> {
        let (start, end) = self.extent(item)?;
        Ok(self.cells[start..end].iter().map(|cell| cell.decode()))
    }
}

/// Hashed, growable encoding for unbounded transaction ids.
#[derive(Debug, Clone, Default)]
pub struct MapTidList {
    occurrences: HashMap<usize, Vec<u32>>,
}

impl MapTidList {
    /// Pre-size the per-item lists from known occurrence counts; items with
    /// zero occurrences get no list.
    #[must_use]
    pub fn with_capacities(lengths: &[usize]) -> Self {
        let mut occurrences = HashMap::with_capacity(lengths.len());
        for (item, &len) in lengths.iter().enumerate() {
            if len > 0 {
                occurrences.insert(item, Vec::with_capacity(len));
            }
        }
        Self { occurrences }
    }

    fn add(&mut self, item: usize, tid: usize) -> Result<()> {
        let tid = u32::try_from(tid)
            .map_err(|_| PatternCraftError::tid_overflow(tid, u32::MAX as usize))?;
        self.occurrences.entry(item).or_default().push(tid);
        Ok(())
    }

    fn iter(&self, item: usize) -> Result<impl Iterator<Item = usize> + '_> {
        match self.occurrences.get(&item) {
            Some(list) => Ok(list.iter().map(|&tid| tid as usize)),
            None => Err(PatternCraftError::unknown_item(item)),
        }
    }
}

/// Shared-backing-array layout for items inserted in arbitrary order over a
/// sparse, non-contiguous id space.
///
/// Start offsets are precomputed per item from the expected occurrence
/// counts; each item keeps its own moving write cursor into the shared
/// array, so interleaved `add_transaction` calls cost one map probe each.
#[derive(Debug, Clone)]
pub struct RandomItemsTidList {
    starts: HashMap<usize, usize>,
    cursors: HashMap<usize, usize>,
    cells: Vec<u32>,
}

impl RandomItemsTidList {
    /// Allocate extents from `(item, occurrence_count)` pairs.
    #[must_use]
    pub fn with_capacities<I>(lengths: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut starts = HashMap::new();
        let mut cursors = HashMap::new();
        let mut total = 0;
        for (item, len) in lengths {
            starts.insert(item, total);
            cursors.insert(item, 0);
            total += len;
        }
        Self {
            starts,
            cursors,
            cells: vec![0; total],
        }
    }

    /// Record an occurrence of `item` in transaction `tid`.
    ///
    /// # Errors
    ///
    /// [`PatternCraftError::UnknownItem`] when `item` was not declared at
    /// construction; [`PatternCraftError::TidOverflow`] past `u32::MAX`.
    pub fn add_transaction(&mut self, item: usize, tid: usize) -> Result<()> {
        let start = *self
            .starts
            .get(&item)
            .ok_or_else(|| PatternCraftError::unknown_item(item))?;
        let cursor = self.cursors.get_mut(&item).expect("cursor tracks start");
        let tid = u32::try_from(tid)
            .map_err(|_| PatternCraftError::tid_overflow(tid, u32::MAX as usize))?;
        self.cells[start + *cursor] = tid;
        *cursor += 1;
        Ok(())
    }

    /// Iterate the recorded occurrences of `item` in insertion order.
    ///
    /// # Errors
    ///
    /// [`PatternCraftError::UnknownItem`] when `item` was not declared.
    pub fn get(&self, item: usize) -> Result<impl Iterator<Item = usize> + '_> {
        let start = *self
            .starts
            .get(&item)
            .ok_or_else(|| PatternCraftError::unknown_item(item))?;
        let len = self.cursors[&item];
        Ok(self.cells[start..start + len].iter().map(|&tid| tid as usize))
    }
}

/// Tagged union over the tid-list encodings.
///
/// Construction goes through [`TidList::with_capacities`], which picks the
/// cheapest encoding whose capacity covers the dataset's maximum transaction
/// id. Cloning deep-copies the backing storage so a worker branch can evolve
/// its copy independently.
#[derive(Debug, Clone)]
pub enum TidList {
    /// Byte-packed consecutive-items layout (max tid 254).
    Byte(PackedTidList<i8>),
    /// Short-packed consecutive-items layout (max tid 65,534).
    Short(PackedTidList<i16>),
    /// Uncompressed consecutive-items layout.
    Int(PackedTidList<u32>),
    /// Hashed growable layout, unbounded.
    Map(MapTidList),
}

impl TidList {
    /// Capacity probe for the byte-packed encoding.
    #[must_use]
    pub fn byte_compatible(max_tid: usize) -> bool {
        max_tid <= <i8 as TidCell>::CAPACITY
    }

    /// Capacity probe for the short-packed encoding.
    #[must_use]
    pub fn short_compatible(max_tid: usize) -> bool {
        max_tid <= <i16 as TidCell>::CAPACITY
    }

    /// Capacity probe for the uncompressed packed encoding.
    #[must_use]
    pub fn int_compatible(max_tid: usize) -> bool {
        max_tid <= <u32 as TidCell>::CAPACITY
    }

    /// Build the cheapest adequate encoding for items `0..lengths.len()`,
    /// where `lengths[i]` is the exact occurrence count of item `i` and
    /// `max_tid` the largest transaction id that will ever be written.
    ///
    /// # Errors
    ///
    /// [`PatternCraftError::TidOverflow`] when even the widest packed
    /// encoding cannot represent `max_tid` (the map encoding is only chosen
    /// explicitly, by [`TidList::map_backed`]).
    pub fn with_capacities(lengths: &[usize], max_tid: usize) -> Result<Self> {
        if Self::byte_compatible(max_tid) {
            Ok(Self::Byte(PackedTidList::with_capacities(lengths)))
        } else if Self::short_compatible(max_tid) {
            Ok(Self::Short(PackedTidList::with_capacities(lengths)))
        } else if Self::int_compatible(max_tid) {
            Ok(Self::Int(PackedTidList::with_capacities(lengths)))
        } else {
            Err(PatternCraftError::tid_overflow(
                max_tid,
                <u32 as TidCell>::CAPACITY,
            ))
        }
    }

    /// Build the hashed encoding regardless of id range.
    #[must_use]
    pub fn map_backed(lengths: &[usize]) -> Self {
        Self::Map(MapTidList::with_capacities(lengths))
    }

    /// Record an occurrence of `item` in transaction `tid`. Build time only.
    ///
    /// # Errors
    ///
    /// [`PatternCraftError::TidOverflow`] when `tid` exceeds the encoding
    /// capacity, [`PatternCraftError::UnknownItem`] when `item` has no
    /// allocated extent.
    pub fn add_transaction(&mut self, item: usize, tid: usize) -> Result<()> {
        match self {
            Self::Byte(packed) => packed.add(item, tid),
            Self::Short(packed) => packed.add(item, tid),
            Self::Int(packed) => packed.add(item, tid),
            Self::Map(map) => map.add(item, tid),
        }
    }

    /// Iterate the transaction ids containing `item`, in insertion order.
    ///
    /// # Errors
    ///
    /// [`PatternCraftError::UnknownItem`] when the index never saw `item`.
    pub fn get(&self, item: usize) -> Result<TidIter<'_>> {
        match self {
            Self::Byte(packed) => Ok(TidIter::Byte(Box::new(packed.iter(item)?))),
            Self::Short(packed) => Ok(TidIter::Short(Box::new(packed.iter(item)?))),
            Self::Int(packed) => Ok(TidIter::Int(Box::new(packed.iter(item)?))),
            Self::Map(map) => Ok(TidIter::Map(Box::new(map.iter(item)?))),
        }
    }

    /// Name of the active encoding, for diagnostics.
    #[must_use]
    pub fn encoding(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Map(_) => "map",
        }
    }
}

/// Iterator over one item's transaction ids.
pub enum TidIter<'a> {
    #[doc(hidden)]
    Byte(Box<dyn Iterator<Item = usize> + 'a>),
    #[doc(hidden)]
    Short(Box<dyn Iterator<Item = usize> + 'a>),
    #[doc(hidden)]
    Int(Box<dyn Iterator<Item = usize> + 'a>),
    #[doc(hidden)]
    Map(Box<dyn Iterator<Item = usize> + 'a>),
}

impl Iterator for TidIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Self::Byte(it) | Self::Short(it) | Self::Int(it) | Self::Map(it) => it.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(mut tids: TidList, sequences: &[(usize, Vec<usize>)]) {
        // interleave insertions across items to exercise the cursors
        let longest = sequences.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
        for position in 0..longest {
            for (item, sequence) in sequences {
                if let Some(&tid) = sequence.get(position) {
                    tids.add_transaction(*item, tid).unwrap();
                }
            }
        }
        for (item, sequence) in sequences {
            let read: Vec<usize> = tids.get(*item).unwrap().collect();
            assert_eq!(&read, sequence, "item {} in {}", item, tids.encoding());
        }
    }

    #[test]
    fn test_round_trip_all_packed_encodings() {
        let sequences = vec![(0, vec![0, 3, 7]), (1, vec![1]), (2, vec![2, 5])];
        let lengths = [3, 1, 2];
        round_trip(TidList::with_capacities(&lengths, 7).unwrap(), &sequences);
        round_trip(TidList::with_capacities(&lengths, 300).unwrap(), &sequences);
        round_trip(
            TidList::with_capacities(&lengths, 100_000).unwrap(),
            &sequences,
        );
        round_trip(TidList::map_backed(&lengths), &sequences);
    }

    #[test]
    fn test_factory_picks_cheapest_encoding() {
        assert_eq!(
            TidList::with_capacities(&[1], 254).unwrap().encoding(),
            "byte"
        );
        assert_eq!(
            TidList::with_capacities(&[1], 255).unwrap().encoding(),
            "short"
        );
        assert_eq!(
            TidList::with_capacities(&[1], 65_534).unwrap().encoding(),
            "short"
        );
        assert_eq!(
            TidList::with_capacities(&[1], 65_535).unwrap().encoding(),
            "int"
        );
    }

    #[test]
    fn test_sign_fold_boundaries() {
        // byte cells: direct up to 127, folded up to 254
        let mut tids = TidList::with_capacities(&[4], 254).unwrap();
        for tid in [0, 127, 128, 254] {
            tids.add_transaction(0, tid).unwrap();
        }
        let read: Vec<usize> = tids.get(0).unwrap().collect();
        assert_eq!(read, vec![0, 127, 128, 254]);
    }

    #[test]
    fn test_overflow_is_construction_error() {
        let mut tids = TidList::with_capacities(&[1], 200).unwrap();
        assert_eq!(tids.encoding(), "byte");
        let err = tids.add_transaction(0, 255).unwrap_err();
        assert!(matches!(err, PatternCraftError::TidOverflow { .. }));
    }

    #[test]
    fn test_unknown_item_rejected() {
        let tids = TidList::with_capacities(&[1, 1], 10).unwrap();
        assert!(matches!(
            tids.get(5),
            Err(PatternCraftError::UnknownItem { item: 5 })
        ));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = TidList::with_capacities(&[2], 10).unwrap();
        original.add_transaction(0, 1).unwrap();
        let mut copy = original.clone();
        copy.add_transaction(0, 9).unwrap();

        assert_eq!(original.get(0).unwrap().count(), 1);
        assert_eq!(copy.get(0).unwrap().count(), 2);
    }

    #[test]
    fn test_random_items_sparse_space() {
        let mut tids =
            RandomItemsTidList::with_capacities(vec![(10, 2), (100_000, 1), (7, 1)]);
        tids.add_transaction(100_000, 3).unwrap();
        tids.add_transaction(10, 1).unwrap();
        tids.add_transaction(7, 2).unwrap();
        tids.add_transaction(10, 4).unwrap();

        assert_eq!(tids.get(10).unwrap().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(tids.get(100_000).unwrap().collect::<Vec<_>>(), vec![3]);
        assert!(tids.get(11).is_err());
    }

    #[test]
    fn test_short_fold_boundaries() {
        let mut tids = TidList::with_capacities(&[3], 65_534).unwrap();
        for tid in [32_767, 32_768, 65_534] {
            tids.add_transaction(0, tid).unwrap();
        }
        assert_eq!(
            tids.get(0).unwrap().collect::<Vec<_>>(),
            vec![32_767, 32_768, 65_534]
        );
    }
}
