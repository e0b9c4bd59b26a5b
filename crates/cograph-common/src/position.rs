//! Offset <-> line/column conversion for source text.
//!
//! Tree spans carry byte offsets together with line and column. Edit targets
//! arrive either as offsets or as line/column pairs, so the tracker converts
//! in both directions with a precomputed line-start table.
//!
//! Lines and columns are 0-indexed; columns count bytes from the line start.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point in the source (0-indexed line and column, plus byte offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column in bytes
    pub column: u32,
    /// Byte offset from the start of the source
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Position {
            line,
            column,
            offset,
        }
    }
}

/// A position or offset that does not exist in the tracked source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutOfRange {
    #[error("offset {offset} is outside source of length {len}")]
    Offset { offset: u32, len: u32 },
    #[error("line {line} is outside source with {line_count} lines")]
    Line { line: u32, line_count: u32 },
    #[error("column {column} is outside line {line} of length {line_len}")]
    Column {
        line: u32,
        column: u32,
        line_len: u32,
    },
}

/// Line table for efficient offset <-> position conversion.
#[derive(Debug, Clone)]
pub struct LocationTracker {
    /// Starting offset of each line (line_starts[0] is always 0)
    line_starts: Vec<u32>,
    /// Offset where each line's content ends (before its terminator)
    line_ends: Vec<u32>,
    len: u32,
}

impl LocationTracker {
    /// Build the line table from source text.
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut line_starts = vec![0u32];
        let mut line_ends = Vec::new();

        let mut terminators = memchr::memchr2_iter(b'\n', b'\r', bytes);
        while let Some(i) = terminators.next() {
            if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') {
                // \r\n: the \n is part of the same terminator
                terminators.next();
                line_ends.push(i as u32);
                line_starts.push((i + 2) as u32);
            } else {
                line_ends.push(i as u32);
                line_starts.push((i + 1) as u32);
            }
        }
        line_ends.push(bytes.len() as u32);

        tracing::trace!(lines = line_starts.len(), len = bytes.len(), "built line table");
        LocationTracker {
            line_starts,
            line_ends,
            len: bytes.len() as u32,
        }
    }

    /// Length of the tracked source in bytes.
    pub fn source_len(&self) -> u32 {
        self.len
    }

    /// Get the number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Get the starting offset of a line.
    pub fn line_start(&self, line: usize) -> Option<u32> {
        self.line_starts.get(line).copied()
    }

    /// Convert a byte offset to a full position.
    ///
    /// The end-of-source offset is valid; anything beyond it is not.
    pub fn position_at(&self, offset: u32) -> Result<Position, OutOfRange> {
        if offset > self.len {
            return Err(OutOfRange::Offset {
                offset,
                len: self.len,
            });
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_point) => insert_point.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        Ok(Position {
            line: line as u32,
            column: offset - line_start,
            offset,
        })
    }

    /// Resolve a line/column pair to a full position.
    pub fn position_at_line_column(&self, line: u32, column: u32) -> Result<Position, OutOfRange> {
        let line_idx = line as usize;
        let (Some(&start), Some(&end)) = (self.line_starts.get(line_idx), self.line_ends.get(line_idx))
        else {
            return Err(OutOfRange::Line {
                line,
                line_count: self.line_starts.len() as u32,
            });
        };
        let line_len = end - start;
        if column > line_len {
            return Err(OutOfRange::Column {
                line,
                column,
                line_len,
            });
        }
        Ok(Position {
            line,
            column,
            offset: start + column,
        })
    }

    /// Convert a line/column pair to a byte offset.
    pub fn offset_at(&self, line: u32, column: u32) -> Result<u32, OutOfRange> {
        self.position_at_line_column(line, column).map(|pos| pos.offset)
    }

    /// Check that all three coordinates of `pos` agree with the source.
    pub fn is_valid_position(&self, pos: &Position) -> bool {
        self.position_at_line_column(pos.line, pos.column)
            .is_ok_and(|resolved| resolved.offset == pos.offset)
    }
}
