//! Chunk Buffer Module
//!
//! Provides an unbounded, write-once-read-once FIFO byte store built from
//! fixed-size chunks.
//!
//! Writes append to the tail chunk and allocate new chunks as needed. Reads copy
//! from the head chunk onwards, advancing a per-chunk read cursor, and release
//! leading chunks once every byte in them has been read. A short read is not an
//! error: it only means no more data is currently buffered.
//!
//! The buffer is meant for a single writer and a single reader used in sequence;
//! it performs no synchronisation of its own.

use std::collections::VecDeque;
use thiserror::Error;
use tracing::trace;

/// Size of each chunk in bytes
pub const CHUNK_SIZE: usize = 4096;

/// Chunk buffer errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkBufferError {
    /// A new chunk could not be allocated
    #[error("out of memory while allocating buffer chunk")]
    OutOfMemory,
}

#[derive(Debug)]
struct Chunk {
    data: Box<[u8]>,
    /// Bytes written into `data`
    written: usize,
    /// Bytes already read out of `data`
    read: usize,
}

impl Chunk {
    fn allocate() -> Result<Self, ChunkBufferError> {
        let mut data = Vec::new();
        data.try_reserve_exact(CHUNK_SIZE)
            .map_err(|_| ChunkBufferError::OutOfMemory)?;
        data.resize(CHUNK_SIZE, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
            written: 0,
            read: 0,
        })
    }

    fn free_space(&self) -> usize {
        CHUNK_SIZE - self.written
    }

    fn unread(&self) -> usize {
        self.written - self.read
    }
}

/// FIFO byte store made of fixed-size chunks
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: VecDeque<Chunk>,
    /// Unread bytes across all chunks
    len: usize,
}

impl ChunkBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            chunks: VecDeque::new(),
            len: 0,
        }
    }

    /// Append `bytes` to the buffer
    ///
    /// Every chunk the write needs is allocated before any byte is copied, so a
    /// failed write leaves the buffer exactly as it was.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ChunkBufferError> {
        if bytes.is_empty() {
            return Ok(());
        }

        let tail_free = self.chunks.back().map_or(0, Chunk::free_space);
        let overflow = bytes.len().saturating_sub(tail_free);
        let needed = overflow.div_ceil(CHUNK_SIZE);

        if needed > 0 {
            self.chunks
                .try_reserve(needed)
                .map_err(|_| ChunkBufferError::OutOfMemory)?;
            let mut fresh = Vec::new();
            fresh
                .try_reserve_exact(needed)
                .map_err(|_| ChunkBufferError::OutOfMemory)?;
            for _ in 0..needed {
                fresh.push(Chunk::allocate()?);
            }
            trace!(chunks = needed, "allocated buffer chunks");
            // The current tail must be filled before the new chunks
            let mut remaining = bytes;
            if let Some(tail) = self.chunks.back_mut() {
                remaining = Self::fill(tail, remaining);
            }
            for mut chunk in fresh {
                remaining = Self::fill(&mut chunk, remaining);
                self.chunks.push_back(chunk);
            }
            debug_assert!(remaining.is_empty());
        } else if let Some(tail) = self.chunks.back_mut() {
            let rest = Self::fill(tail, bytes);
            debug_assert!(rest.is_empty());
        }

        self.len += bytes.len();
        Ok(())
    }

    /// Copy up to `dest.len()` unread bytes into `dest`
    ///
    /// Returns the number of bytes copied, which is less than `dest.len()` when
    /// the buffer runs dry.
    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        let mut copied = 0;

        while copied < dest.len() {
            let Some(head) = self.chunks.front_mut() else {
                break;
            };

            let count = head.unread().min(dest.len() - copied);
            dest[copied..copied + count].copy_from_slice(&head.data[head.read..head.read + count]);
            head.read += count;
            copied += count;

            if head.unread() == 0 {
                self.chunks.pop_front();
                trace!(remaining_chunks = self.chunks.len(), "released buffer chunk");
            }
        }

        self.len -= copied;
        copied
    }

    /// Unread bytes in the buffer
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether every written byte has been read
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chunks currently held
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    fn fill<'a>(chunk: &mut Chunk, bytes: &'a [u8]) -> &'a [u8] {
        let count = chunk.free_space().min(bytes.len());
        chunk.data[chunk.written..chunk.written + count].copy_from_slice(&bytes[..count]);
        chunk.written += count;
        &bytes[count..]
    }
}
