//! Byte Source Module
//!
//! Provides the `ByteSource` abstraction the decoder pulls bytes from.
//!
//! A source hands over whatever bytes it has right now. Returning 0 means "nothing
//! more for now", which the decoder turns into `Short` or `Empty`; it is never an
//! error by itself.

use crate::decoding::DecodeError;
use infrastructure_chunk_buffer::ChunkBuffer;
use std::io::{ErrorKind, Read};
use tracing::debug;

/// Something the decoder can pull bytes from
#[cfg_attr(test, mockall::automock)]
pub trait ByteSource {
    /// Copy up to `dest.len()` available bytes into `dest`
    ///
    /// Implementations make at most one underlying read per call.
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize, DecodeError>;
}

impl ByteSource for ChunkBuffer {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize, DecodeError> {
        Ok(self.read(dest))
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize, DecodeError> {
        (**self).read_into(dest)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize, DecodeError> {
        (**self).read_into(dest)
    }
}

/// A live byte source over any `std::io::Read`
///
/// Works for files, pipes and sockets alike. A non-blocking reader that has
/// nothing ready (`WouldBlock`) or a read interrupted by a signal counts as
/// zero bytes, so the decoder reports `Short` and the caller can retry later.
#[derive(Debug)]
pub struct StreamSource<R> {
    reader: R,
}

impl<R: Read> StreamSource<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Borrow the underlying reader
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Mutably borrow the underlying reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Unwrap the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read_into(&mut self, dest: &mut [u8]) -> Result<usize, DecodeError> {
        match self.reader.read(dest) {
            Ok(count) => Ok(count),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => {
                debug!(error = %e, "byte source read failed");
                Err(DecodeError::Read(e.kind()))
            }
        }
    }
}
