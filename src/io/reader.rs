//! Transaction input parsing.
//!
//! The canonical input format is ASCII text, one transaction per line,
//! space-separated non-negative integer item ids. Blank lines are valid and
//! denote empty transactions (they still contribute to transaction counts,
//! which matters for closure computation). An alternate entry point accepts
//! arbitrary string identifiers resolved through an [`IdDictionary`], which
//! can be pre-seeded or built on the fly.
//!
//! Parsing failures are hard errors carrying the 1-based line number; the
//! mining core assumes well-formed integer transactions.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{PatternCraftError, Result};

/// Parse weighted transactions from a line-oriented reader.
///
/// Every transaction gets weight 1; duplicate lines stay separate
/// transactions.
///
/// # Errors
///
/// [`PatternCraftError::MalformedInput`] on any token that is not a
/// non-negative integer id, [`PatternCraftError::Io`] on read failures.
pub fn read_transactions<R: BufRead>(reader: R) -> Result<Vec<(Vec<u32>, u32)>> {
    let mut transactions = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let mut items = Vec::new();
        for token in line.split_whitespace() {
            let item: u32 = token.parse().map_err(|_| {
                PatternCraftError::malformed_input(
                    index + 1,
                    format!("token '{}' is not an item id", token),
                )
            })?;
            items.push(item);
        }
        transactions.push((items, 1));
    }
    Ok(transactions)
}

/// Parse a transaction file from disk.
///
/// # Errors
///
/// Same conditions as [`read_transactions`].
pub fn read_transactions_path(path: impl AsRef<Path>) -> Result<Vec<(Vec<u32>, u32)>> {
    let file = File::open(path)?;
    read_transactions(BufReader::new(file))
}

/// Bidirectional string-identifier dictionary.
///
/// Ids are assigned densely in first-seen order, so the same corpus read
/// twice resolves identically.
#[derive(Debug, Clone, Default)]
pub struct IdDictionary {
    by_name: HashMap<String, u32>,
    names: Vec<String>,
}

impl IdDictionary {
    /// Empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a name, assigning the next dense id on first sight.
    pub fn resolve_or_insert(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.names.len() as u32;
        self.by_name.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    /// Resolve a name without inserting.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// The name behind an id.
    #[must_use]
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }
}

/// Parse transactions whose items are arbitrary string identifiers,
/// resolving (and extending) the given dictionary.
///
/// # Errors
///
/// [`PatternCraftError::Io`] on read failures.
pub fn read_transactions_with_ids<R: BufRead>(
    reader: R,
    dictionary: &mut IdDictionary,
) -> Result<Vec<(Vec<u32>, u32)>> {
    let mut transactions = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let items = line
            .split_whitespace()
            .map(|token| dictionary.resolve_or_insert(token))
            .collect();
        transactions.push((items, 1));
    }
    Ok(transactions)
}
