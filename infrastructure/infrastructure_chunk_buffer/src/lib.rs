//! Infrastructure Layer: Chunk Buffer
//!
//! Provides an append-only FIFO byte store made of fixed-size chunks.
//!
//! ## Overview
//!
//! The chunk buffer decouples "data has arrived" from "data has been parsed".
//! Bytes received from a socket or file can be written into the buffer as they
//! come in, and a decoder attached to the buffer drains them later through
//! sequential reads that may span chunk boundaries.
//!
//! ## Modules
//!
//! - **[`chunk_buffer`](chunk_buffer/index.html)**: The `ChunkBuffer` type and
//!   its `write`/`read` operations.
//!
//! ## See Also
//!
//! - [`infrastructure_bert_format`](../infrastructure_bert_format/index.html): the
//!   decoder that reads from a `ChunkBuffer`

pub mod chunk_buffer;

pub use chunk_buffer::{ChunkBuffer, ChunkBufferError, CHUNK_SIZE};
