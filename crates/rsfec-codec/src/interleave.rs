//! Codeword interleaving
//!
//! A super-chunk is a jagged matrix: one row per codeword, every row
//! `codeword_length` symbols except possibly the last. On the wire the matrix
//! is written column by column, so byte `i` of every codeword is emitted
//! before byte `i + 1` of any of them.
//!
//! ```text
//!   rows (codewords)          wire order (rows = 3, n = 4, last row = 2)
//!   r0: a0 a1 a2 a3
//!   r1: b0 b1 b2 b3    ->     a0 b0 c0 a1 b1 c1 a2 b2 a3 b3
//!   r2: c0 c1
//! ```
//!
//! A burst of up to `rows` consecutive wire bytes therefore lands on at most
//! one symbol of each codeword.

use bytes::{BufMut, Bytes, BytesMut};
use rsfec_common::{Error, Result};

/// Row geometry of one interleaved super-chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLayout {
    rows: usize,
    codeword_length: usize,
    last_len: usize,
}

impl ChunkLayout {
    /// Create a layout
    ///
    /// # Arguments
    /// * `rows` - Number of codewords (at least 1)
    /// * `codeword_length` - Length of every row but the last
    /// * `last_len` - Length of the last row, `1..=codeword_length`
    ///
    /// # Panics
    /// Panics if `rows` is zero or `last_len` is out of range.
    #[must_use]
    pub fn new(rows: usize, codeword_length: usize, last_len: usize) -> Self {
        assert!(rows > 0, "layout needs at least one row");
        assert!(
            (1..=codeword_length).contains(&last_len),
            "last row length {last_len} outside 1..={codeword_length}"
        );
        Self {
            rows,
            codeword_length,
            last_len,
        }
    }

    /// Number of codewords
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Length of row `row`
    #[must_use]
    pub const fn row_len(&self, row: usize) -> usize {
        if row + 1 == self.rows {
            self.last_len
        } else {
            self.codeword_length
        }
    }

    /// Total interleaved bytes
    #[must_use]
    pub const fn total_len(&self) -> usize {
        (self.rows - 1) * self.codeword_length + self.last_len
    }

    /// Rows that still have a symbol at column `col`
    #[must_use]
    const fn column_height(&self, col: usize) -> usize {
        if col < self.last_len {
            self.rows
        } else {
            self.rows - 1
        }
    }

    /// Wire offset of symbol `col` of row `row`
    #[must_use]
    pub fn wire_offset(&self, row: usize, col: usize) -> usize {
        debug_assert!(col < self.row_len(row));
        // Every column before `last_len` is full height; after it, one short
        let full_cols = col.min(self.last_len);
        let short_cols = col - full_cols;
        full_cols * self.rows + short_cols * (self.rows - 1) + row
    }
}

/// Transpose one super-chunk of codewords into wire order
///
/// Fails with `FormatMismatch` if the codewords do not match `layout`.
pub fn interleave<T: AsRef<[u8]>>(codewords: &[T], layout: &ChunkLayout) -> Result<Bytes> {
    if codewords.len() != layout.rows() {
        return Err(Error::format_mismatch(format!(
            "layout expects {} codewords, got {}",
            layout.rows(),
            codewords.len()
        )));
    }
    for (row, codeword) in codewords.iter().enumerate() {
        if codeword.as_ref().len() != layout.row_len(row) {
            return Err(Error::format_mismatch(format!(
                "codeword {row} has {} symbols, layout expects {}",
                codeword.as_ref().len(),
                layout.row_len(row)
            )));
        }
    }

    let mut out = BytesMut::with_capacity(layout.total_len());
    for col in 0..layout.codeword_length {
        for codeword in &codewords[..layout.column_height(col)] {
            out.put_u8(codeword.as_ref()[col]);
        }
    }
    debug_assert_eq!(out.len(), layout.total_len());
    Ok(out.freeze())
}

/// Rebuild the codewords of one super-chunk from its wire bytes
///
/// Fails with `FormatMismatch` if `wire` is not exactly
/// `layout.total_len()` bytes.
pub fn deinterleave(wire: &[u8], layout: &ChunkLayout) -> Result<Vec<Vec<u8>>> {
    if wire.len() != layout.total_len() {
        return Err(Error::format_mismatch(format!(
            "super-chunk expects {} interleaved bytes, got {}",
            layout.total_len(),
            wire.len()
        )));
    }

    let mut codewords: Vec<Vec<u8>> = (0..layout.rows())
        .map(|row| Vec::with_capacity(layout.row_len(row)))
        .collect();

    let mut cursor = wire.iter();
    for col in 0..layout.codeword_length {
        for codeword in &mut codewords[..layout.column_height(col)] {
            // Length was checked against the layout above
            if let Some(&byte) = cursor.next() {
                codeword.push(byte);
            }
        }
    }
    Ok(codewords)
}
