use std::ops::Range;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::types::Chunk;
use crate::{DEFAULT_CHUNK_SIZE, TransferError};

// ---------------------------------------------------------------------------
// Checksum helpers
// ---------------------------------------------------------------------------

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Byte-range layout of one file split into fixed-size chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Plans `file_size` bytes in chunks of `chunk_size`.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (1 MiB) is used.
    pub fn new(file_size: u64, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            file_size,
            chunk_size: chunk_size as u64,
        }
    }

    /// `ceil(file_size / chunk_size)`; 0 for an empty file.
    pub fn total_chunks(&self) -> u64 {
        self.file_size.div_ceil(self.chunk_size)
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Byte range `[index * C, min(size, (index + 1) * C))` of a chunk.
    pub fn range(&self, index: u64) -> Range<u64> {
        let start = (index * self.chunk_size).min(self.file_size);
        start..self.bytes_through(index)
    }

    /// Bytes transferred once chunks `0..=index` are acknowledged.
    pub fn bytes_through(&self, index: u64) -> u64 {
        ((index + 1) * self.chunk_size).min(self.file_size)
    }

    /// Bytes transferred once chunks `0..next_chunk` are acknowledged.
    pub fn bytes_before(&self, next_chunk: u64) -> u64 {
        (next_chunk * self.chunk_size).min(self.file_size)
    }
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Yields the chunks of an in-memory file in index order.
///
/// Slices share the file's buffer; nothing is copied.
pub struct ChunkReader {
    data: Bytes,
    plan: ChunkPlan,
    next: u64,
    checksums: bool,
}

impl ChunkReader {
    /// Creates a reader over `data`.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] is used. With
    /// `checksums` set, every chunk carries its SHA-256 digest.
    pub fn new(data: Bytes, chunk_size: usize, checksums: bool) -> Self {
        let plan = ChunkPlan::new(data.len() as u64, chunk_size);
        Self {
            data,
            plan,
            next: 0,
            checksums,
        }
    }

    /// Positions the reader at `index` (for resume).
    ///
    /// `index == total_chunks` is allowed and leaves nothing to read.
    pub fn seek_to_chunk(&mut self, index: u64) -> Result<(), TransferError> {
        let total = self.plan.total_chunks();
        if index > total {
            return Err(TransferError::ChunkOutOfRange { index, total });
        }
        self.next = index;
        Ok(())
    }

    /// Returns the next chunk, or `None` once every chunk has been read.
    pub fn next_chunk(&mut self) -> Option<Chunk> {
        if self.next >= self.plan.total_chunks() {
            return None;
        }

        let index = self.next;
        let range = self.plan.range(index);
        let data = self.data.slice(range.start as usize..range.end as usize);
        let checksum = self.checksums.then(|| checksum_bytes(&data));

        self.next += 1;
        Some(Chunk {
            index,
            offset: range.start,
            data,
            checksum,
        })
    }

    /// Index of the chunk the next call to [`next_chunk`](Self::next_chunk) returns.
    pub fn position(&self) -> u64 {
        self.next
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }
}
