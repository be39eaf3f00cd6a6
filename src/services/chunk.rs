/// One contiguous piece of a split upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Zero-based position in the plan
    pub index: usize,
    /// Byte offset into the source payload
    pub offset: u64,
    /// Length of this piece in bytes
    pub len: u64,
}

/// Ordered partition of a payload into ranges of at most `chunk_size` bytes.
///
/// Ranges are contiguous, non-overlapping and sum to the payload size; only
/// the last range may be shorter than `chunk_size`.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    size: u64,
    chunk_size: u64,
    ranges: Vec<ChunkRange>,
}

impl ChunkPlan {
    pub fn new(size: u64, chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");

        let count = size.div_ceil(chunk_size) as usize;
        let mut ranges = Vec::with_capacity(count);
        let mut offset = 0;

        for index in 0..count {
            let len = chunk_size.min(size - offset);
            ranges.push(ChunkRange { index, offset, len });
            offset += len;
        }

        Self {
            size,
            chunk_size,
            ranges,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn ranges(&self) -> &[ChunkRange] {
        &self.ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_is_ceil_division() {
        assert_eq!(ChunkPlan::new(10, 4).chunk_count(), 3);
        assert_eq!(ChunkPlan::new(12, 4).chunk_count(), 3);
        assert_eq!(ChunkPlan::new(1, 4).chunk_count(), 1);
        assert_eq!(ChunkPlan::new(0, 4).chunk_count(), 0);
    }

    #[test]
    fn test_ranges_are_contiguous_and_sum_to_size() {
        let plan = ChunkPlan::new(10_000, 3_000);
        let mut expected_offset = 0;
        for range in plan.ranges() {
            assert_eq!(range.offset, expected_offset);
            assert!(range.len <= plan.chunk_size());
            expected_offset += range.len;
        }
        assert_eq!(expected_offset, plan.total_size());
    }

    #[test]
    fn test_last_range_carries_remainder() {
        let plan = ChunkPlan::new(10, 4);
        assert_eq!(plan.ranges().last().map(|r| r.len), Some(2));

        let exact = ChunkPlan::new(12, 4);
        assert_eq!(exact.ranges().last().map(|r| r.len), Some(4));
    }

    #[test]
    fn test_payload_smaller_than_chunk_is_one_range() {
        let plan = ChunkPlan::new(5, 1_000);
        assert_eq!(plan.chunk_count(), 1);
        assert_eq!(plan.ranges()[0].len, 5);
        assert_eq!(plan.ranges()[0].offset, 0);
    }

    #[test]
    fn test_indices_are_sequential() {
        let plan = ChunkPlan::new(100, 7);
        for (position, range) in plan.ranges().iter().enumerate() {
            assert_eq!(range.index, position);
        }
    }
}
