//! Buffered pattern output.
//!
//! Each collected pattern is written as one line, `<support>\t<item> <item>
//! ...`, through an internal [`BufWriter`]. The sink keeps running totals so
//! the collected count and average pattern length stay queryable after
//! [`PatternSink::close`].

use std::io::{BufWriter, Write};

use crate::error::Result;

/// Buffered `<support>\t<items…>` line writer.
#[derive(Debug)]
pub struct PatternSink<W: Write> {
    writer: BufWriter<W>,
    collected: u64,
    collected_length: u64,
}

impl<W: Write> PatternSink<W> {
    /// Wrap a writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            collected: 0,
            collected_length: 0,
        }
    }

    /// Write one pattern line.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn collect(&mut self, support: u32, pattern: &[u32]) -> Result<()> {
        write!(self.writer, "{}\t", support)?;
        let mut separate = false;
        for item in pattern {
            if separate {
                write!(self.writer, " {}", item)?;
            } else {
                write!(self.writer, "{}", item)?;
                separate = true;
            }
        }
        writeln!(self.writer)?;
        self.collected += 1;
        self.collected_length += pattern.len() as u64;
        Ok(())
    }

    /// Patterns written so far.
    #[must_use]
    pub fn collected(&self) -> u64 {
        self.collected
    }

    /// Summed lengths of the patterns written so far.
    #[must_use]
    pub fn collected_length(&self) -> u64 {
        self.collected_length
    }

    /// Average written pattern length, zero before the first pattern.
    #[must_use]
    pub fn average_pattern_length(&self) -> u64 {
        if self.collected == 0 {
            0
        } else {
            self.collected_length / self.collected
        }
    }

    /// Flush and return how many patterns were written.
    ///
    /// # Errors
    ///
    /// Propagates flush failures.
    pub fn close(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.collected)
    }
}
