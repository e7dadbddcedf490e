use heq_core::{Error, Result};
use std::ops::Range;

/// One worker's contiguous slice of the flat pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub offset: usize,
    pub size: usize,
}

impl Chunk {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// Chunk layout for a whole worker group.
///
/// Every rank except the last gets `n / workers` elements; the last one also
/// takes the `n % workers` remainder. This is not a balanced split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk(&self, rank: usize) -> Option<Chunk> {
        self.chunks.get(rank).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.chunks.iter()
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.chunks.iter().map(|c| c.size).collect()
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.chunks.iter().map(|c| c.offset).collect()
    }

    pub fn ranges(&self) -> Vec<Range<usize>> {
        self.chunks.iter().map(Chunk::range).collect()
    }

    /// Number of elements covered by the plan.
    pub fn total(&self) -> usize {
        self.chunks.iter().map(|c| c.size).sum()
    }
}

pub fn plan(n: usize, workers: usize) -> Result<ChunkPlan> {
    if workers == 0 {
        return Err(Error::InvalidConfig("worker count must be >= 1".into()));
    }

    let base = n / workers;
    let remainder = n % workers;

    let mut chunks = Vec::with_capacity(workers);
    let mut offset = 0;
    for rank in 0..workers {
        let size = if rank + 1 < workers { base } else { base + remainder };
        chunks.push(Chunk { offset, size });
        offset += size;
    }

    Ok(ChunkPlan { chunks })
}
