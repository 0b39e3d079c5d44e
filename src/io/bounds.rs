//! Per-item bound exchange with the batch-execution collaborator.
//!
//! A distributed run partitions the item space across worker processes and
//! re-merges results; between rounds, each process receives the support
//! bounds discovered so far and sends back its own. The wire format is
//! plain `item\tbound` lines, one per item, which both sides of the
//! original pipeline already speak.

use std::io::{BufRead, Write};

use crate::error::{PatternCraftError, Result};

/// Write `item\tbound` lines.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_bounds<W: Write>(
    writer: &mut W,
    bounds: impl IntoIterator<Item = (u32, u32)>,
) -> Result<()> {
    for (item, bound) in bounds {
        writeln!(writer, "{}\t{}", item, bound)?;
    }
    Ok(())
}

/// Parse `item\tbound` lines; blank lines are skipped.
///
/// # Errors
///
/// [`PatternCraftError::MalformedInput`] on lines that are not two integer
/// fields, [`PatternCraftError::Io`] on read failures.
pub fn read_bounds<R: BufRead>(reader: R) -> Result<Vec<(u32, u32)>> {
    let mut bounds = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let entry = match (fields.next(), fields.next(), fields.next()) {
            (Some(item), Some(bound), None) => item
                .parse::<u32>()
                .and_then(|item| bound.parse::<u32>().map(|bound| (item, bound)))
                .ok(),
            _ => None,
        };
        match entry {
            Some(pair) => bounds.push(pair),
            None => {
                return Err(PatternCraftError::malformed_input(
                    index + 1,
                    format!("expected 'item\\tbound', got '{}'", line),
                ))
            }
        }
    }
    Ok(bounds)
}
