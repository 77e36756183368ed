//! Chunk planning
//!
//! A file of `S` bytes is cut into super-chunks of `rows` data units, each
//! unit `data_length` bytes. Only the very last unit of the file may be
//! shorter. The plan is pure arithmetic on `(S, parameters, rows)`, so the
//! decoder rebuilds exactly the partitioning the encoder used.

use crate::interleave::ChunkLayout;
use rsfec_common::{BlockIndex, CodeParameters, Error, Result};

/// Geometry of one super-chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuperChunkPlan {
    /// Position of this super-chunk in the file
    pub index: u64,
    /// Block index of the first codeword in this super-chunk
    pub first_block: BlockIndex,
    /// Offset of the first data byte in the original file
    pub data_offset: u64,
    /// Number of units carrying a full `data_length` bytes
    pub full_units: usize,
    /// Length of the trailing partial unit, if any
    pub partial_len: Option<usize>,
}

impl SuperChunkPlan {
    /// Number of codewords in this super-chunk
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.full_units + usize::from(self.partial_len.is_some())
    }

    /// Original data bytes covered by this super-chunk
    #[must_use]
    pub fn data_len(&self, params: &CodeParameters) -> usize {
        self.full_units * params.data_length() + self.partial_len.unwrap_or(0)
    }

    /// Data length of each unit, in order
    pub fn unit_lengths(&self, params: &CodeParameters) -> impl Iterator<Item = usize> + use<> {
        std::iter::repeat_n(params.data_length(), self.full_units).chain(self.partial_len)
    }

    /// Interleaved bytes this super-chunk occupies on the wire
    #[must_use]
    pub fn encoded_len(&self, params: &CodeParameters) -> usize {
        self.full_units * params.codeword_length()
            + self.partial_len.map_or(0, |len| len + params.check_length())
    }

    /// Jagged row layout handed to the interleaver
    #[must_use]
    pub fn layout(&self, params: &CodeParameters) -> ChunkLayout {
        let last_len = self
            .partial_len
            .map_or(params.codeword_length(), |len| len + params.check_length());
        ChunkLayout::new(self.unit_count(), params.codeword_length(), last_len)
    }
}

/// Partitions a file into super-chunks and data units
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkPlanner {
    params: CodeParameters,
    rows: usize,
    total_size: u64,
}

impl ChunkPlanner {
    /// Plan with `rows = floor(budget / data_length)`
    ///
    /// # Arguments
    /// * `params` - Codeword geometry
    /// * `budget` - Target data bytes per super-chunk
    /// * `total_size` - Original file size in bytes
    pub fn new(params: CodeParameters, budget: usize, total_size: u64) -> Result<Self> {
        Self::with_rows(params, Self::rows_for_budget(&params, budget)?, total_size)
    }

    /// Plan with an explicit number of units per super-chunk
    pub fn with_rows(params: CodeParameters, rows: usize, total_size: u64) -> Result<Self> {
        if total_size == 0 {
            return Err(Error::EmptyInput);
        }
        if rows == 0 {
            return Err(Error::Configuration(
                "super-chunk must hold at least one data unit".into(),
            ));
        }
        if Self::checked_encoded_size(&params, total_size).is_none() {
            return Err(Error::Configuration(format!(
                "{total_size} bytes encode to more than {} bytes",
                u64::MAX
            )));
        }
        Ok(Self {
            params,
            rows,
            total_size,
        })
    }

    /// Encoded payload size, or `None` if it does not fit in a `u64`
    fn checked_encoded_size(params: &CodeParameters, total_size: u64) -> Option<u64> {
        let k = params.data_length() as u64;
        let partial = total_size % k;
        let full = (total_size / k).checked_mul(params.codeword_length() as u64)?;
        if partial == 0 {
            return Some(full);
        }
        full.checked_add(partial + params.check_length() as u64)
    }

    /// Units per super-chunk for a byte budget
    pub fn rows_for_budget(params: &CodeParameters, budget: usize) -> Result<usize> {
        let rows = budget / params.data_length();
        if rows == 0 {
            return Err(Error::Configuration(format!(
                "super-chunk budget {budget} is smaller than one data unit ({} bytes)",
                params.data_length()
            )));
        }
        Ok(rows)
    }

    /// Recover the original size from an encoded payload size
    ///
    /// Inverse of [`ChunkPlanner::encoded_size`]. Fails with
    /// `FormatMismatch` if no original size maps to `encoded_size`.
    pub fn original_size_for(params: CodeParameters, rows: usize, encoded_size: u64) -> Result<u64> {
        if encoded_size == 0 {
            return Err(Error::EmptyInput);
        }
        if rows == 0 {
            return Err(Error::Configuration(
                "super-chunk must hold at least one data unit".into(),
            ));
        }

        let n = params.codeword_length() as u64;
        let k = params.data_length() as u64;
        let m = params.check_length() as u64;
        let rows = rows as u64;

        let full_chunks = encoded_size / (rows * n);
        let rest = encoded_size % (rows * n);
        let full_units = rest / n;
        let tail = rest % n;

        if tail != 0 && tail <= m {
            return Err(Error::format_mismatch(format!(
                "encoded size {encoded_size} leaves a {tail}-byte tail, \
                 which cannot hold {m} check symbols and any data for {params}"
            )));
        }

        let partial = if tail == 0 { 0 } else { tail - m };
        Ok(full_chunks * rows * k + full_units * k + partial)
    }

    /// Codeword geometry
    #[must_use]
    pub const fn parameters(&self) -> CodeParameters {
        self.params
    }

    /// Units per super-chunk
    #[must_use]
    pub const fn rows_per_chunk(&self) -> usize {
        self.rows
    }

    /// Original file size
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Data bytes in one full super-chunk
    #[must_use]
    pub const fn chunk_data_len(&self) -> u64 {
        (self.rows * self.params.data_length()) as u64
    }

    /// Number of super-chunks, `ceil(S / (rows * data_length))`
    #[must_use]
    pub const fn chunk_count(&self) -> u64 {
        self.total_size.div_ceil(self.chunk_data_len())
    }

    /// Total number of codewords in the file
    #[must_use]
    pub const fn block_count(&self) -> u64 {
        self.total_size.div_ceil(self.params.data_length() as u64)
    }

    /// Payload bytes the encoder produces for this file
    ///
    /// Construction guarantees the size fits in a `u64`.
    #[must_use]
    pub fn encoded_size(&self) -> u64 {
        Self::checked_encoded_size(&self.params, self.total_size).unwrap_or(u64::MAX)
    }

    /// Plan for one super-chunk, or `None` past the end
    #[must_use]
    pub fn chunk(&self, index: u64) -> Option<SuperChunkPlan> {
        let data_offset = index.checked_mul(self.chunk_data_len())?;
        if data_offset >= self.total_size {
            return None;
        }

        let k = self.params.data_length();
        let remaining = (self.total_size - data_offset).min(self.chunk_data_len()) as usize;
        let full_units = remaining / k;
        let partial = remaining % k;

        Some(SuperChunkPlan {
            index,
            first_block: BlockIndex::new(index * self.rows as u64),
            data_offset,
            full_units,
            partial_len: (partial > 0).then_some(partial),
        })
    }

    /// Iterate over every super-chunk in file order
    #[must_use]
    pub const fn chunks(&self) -> SuperChunks<'_> {
        SuperChunks {
            planner: self,
            next: 0,
        }
    }
}

/// Lazy iterator over a file's super-chunks
#[derive(Clone, Debug)]
pub struct SuperChunks<'a> {
    planner: &'a ChunkPlanner,
    next: u64,
}

impl Iterator for SuperChunks<'_> {
    type Item = SuperChunkPlan;

    fn next(&mut self) -> Option<Self::Item> {
        let plan = self.planner.chunk(self.next)?;
        self.next += 1;
        Some(plan)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.planner.chunk_count().saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SuperChunks<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: usize = 1024 * 1024;

    fn params() -> CodeParameters {
        CodeParameters::RS_255_223
    }

    #[test]
    fn test_single_partial_chunk() {
        // 300 bytes = one full unit of 223 + a 77-byte tail
        let planner = ChunkPlanner::new(params(), MIB, 300).unwrap();
        assert_eq!(planner.rows_per_chunk(), 4702);
        assert_eq!(planner.chunk_count(), 1);

        let chunks: Vec<_> = planner.chunks().collect();
        assert_eq!(chunks.len(), 1);
        let chunk = chunks[0];
        assert_eq!(chunk.full_units, 1);
        assert_eq!(chunk.partial_len, Some(77));
        assert_eq!(chunk.unit_lengths(&params()).collect::<Vec<_>>(), vec![223, 77]);
        assert_eq!(chunk.encoded_len(&params()), 255 + 77 + 32);
        assert_eq!(planner.encoded_size(), 364);
    }

    #[test]
    fn test_exact_multiple_has_no_partial_unit() {
        let planner = ChunkPlanner::new(params(), 4 * 223, 223 * 10).unwrap();
        assert_eq!(planner.rows_per_chunk(), 4);
        assert_eq!(planner.chunk_count(), 3);

        let chunks: Vec<_> = planner.chunks().collect();
        assert!(chunks.iter().all(|c| c.partial_len.is_none()));
        assert_eq!(
            chunks.iter().map(|c| c.full_units).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );
        assert_eq!(planner.encoded_size(), 255 * 10);
    }

    #[test]
    fn test_partial_unit_only_in_last_chunk() {
        let size = 4 * 223 * 2 + 5;
        let planner = ChunkPlanner::new(params(), 4 * 223, size as u64).unwrap();
        let chunks: Vec<_> = planner.chunks().collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].partial_len, None);
        assert_eq!(chunks[1].partial_len, None);
        assert_eq!(chunks[2].full_units, 0);
        assert_eq!(chunks[2].partial_len, Some(5));
        assert_eq!(chunks[2].first_block, BlockIndex::new(8));
        assert_eq!(chunks[2].data_offset, 4 * 223 * 2);

        let total: usize = chunks.iter().map(|c| c.data_len(&params())).sum();
        assert_eq!(total, size);
        assert_eq!(planner.block_count(), 9);
    }

    #[test]
    fn test_budget_sized_files() {
        let budget = 4 * 223;
        let exact = ChunkPlanner::new(params(), budget, budget as u64).unwrap();
        assert_eq!(exact.chunk_count(), 1);

        let over = ChunkPlanner::new(params(), budget, budget as u64 + 1).unwrap();
        assert_eq!(over.chunk_count(), 2);
        assert_eq!(over.chunk(1).unwrap().partial_len, Some(1));
        assert!(over.chunk(2).is_none());
    }

    #[test]
    fn test_budget_not_multiple_of_data_length() {
        // floor(1000 / 223) = 4 rows
        let planner = ChunkPlanner::new(params(), 1000, 2000).unwrap();
        assert_eq!(planner.rows_per_chunk(), 4);
        assert_eq!(planner.chunk_data_len(), 892);
    }

    #[test]
    fn test_rejects_empty_input_and_tiny_budget() {
        assert!(matches!(
            ChunkPlanner::new(params(), MIB, 0),
            Err(Error::EmptyInput)
        ));
        assert!(matches!(
            ChunkPlanner::new(params(), 100, 10),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_sizes_whose_encoding_overflows() {
        assert!(matches!(
            ChunkPlanner::with_rows(params(), 4, u64::MAX),
            Err(Error::Configuration(_))
        ));
        // Largest size whose full units still fit
        let limit = u64::MAX / 255 * 223;
        let planner = ChunkPlanner::with_rows(params(), 4, limit).unwrap();
        assert_eq!(planner.encoded_size(), u64::MAX / 255 * 255);
    }

    #[test]
    fn test_planning_is_deterministic() {
        let a = ChunkPlanner::new(params(), 3 * 223, 5000).unwrap();
        let b = ChunkPlanner::new(params(), 3 * 223, 5000).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.chunks().collect::<Vec<_>>(), b.chunks().collect::<Vec<_>>());
        assert_eq!(a.chunks().len(), a.chunk_count() as usize);
    }

    #[test]
    fn test_original_size_inverse() {
        let rows = 4;
        for size in [1u64, 77, 222, 223, 224, 892, 893, 2230, 4 * 892 + 100] {
            let planner = ChunkPlanner::with_rows(params(), rows, size).unwrap();
            let recovered =
                ChunkPlanner::original_size_for(params(), rows, planner.encoded_size()).unwrap();
            assert_eq!(recovered, size, "size {size}");
        }
    }

    #[test]
    fn test_original_size_rejects_impossible_lengths() {
        // 255 + 20: a 20-byte tail cannot even hold the 32 check symbols
        assert!(matches!(
            ChunkPlanner::original_size_for(params(), 4, 275),
            Err(Error::FormatMismatch(_))
        ));
        // A tail of exactly check_length carries no data
        assert!(ChunkPlanner::original_size_for(params(), 4, 255 + 32).is_err());
        assert!(matches!(
            ChunkPlanner::original_size_for(params(), 4, 0),
            Err(Error::EmptyInput)
        ));
    }
}
