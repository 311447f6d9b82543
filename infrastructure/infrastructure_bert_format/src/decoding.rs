//! Decoding Module
//!
//! Provides the streaming BERT decoder.
//!
//! The decoder pulls bytes from a [`ByteSource`] through a fixed-size short window
//! and rebuilds one [`Term`] per call to [`Decoder::decode`]. Sources may deliver
//! data in fragments of any size. When a term is not complete yet the decoder
//! returns `DecodeError::Short` and rewinds, so the caller can supply more bytes
//! and call `decode` again to get the same term as if everything had arrived at
//! once.
//!
//! Decoding is recursive descent over the wire tags. Any failure inside a
//! composite drops every term built so far for it; no partial term is returned.

use crate::magic;
use crate::source::{ByteSource, StreamSource};
use crate::window::ShortWindow;
use entities_bert_data::{List, Term, TermError, Tuple};
use infrastructure_chunk_buffer::{ChunkBuffer, ChunkBufferError};
use std::io::{ErrorKind, Read};
use thiserror::Error;
use tracing::{debug, trace};

/// Default cap on a single atom, string or binary payload (64 MiB)
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// Default cap on composite nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Elements reserved up front for a tuple, whatever arity the wire claims
const TUPLE_PREALLOC: usize = 64;

/// Decoding error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes yet; feed more and call `decode` again
    #[error("not enough data to decode a complete term")]
    Short,
    /// Clean end of input with no partial term pending
    #[error("no more data")]
    Empty,
    /// Malformed or out-of-grammar input
    #[error("invalid term data: {0}")]
    Invalid(InvalidTerm),
    /// An allocation failed
    #[error("out of memory while decoding")]
    OutOfMemory,
    /// A recognised tag the decoder does not support
    #[error("decoding of tag {0} is not implemented")]
    NotImplemented(u8),
    /// The live byte source failed
    #[error("failed to read from byte source: {0:?}")]
    Read(ErrorKind),
}

/// Reasons input is rejected as `DecodeError::Invalid`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTerm {
    #[error("unknown tag {0}")]
    UnknownTag(u8),
    #[error("extended term keyword is a {0}, expected an atom")]
    KeywordNotAtom(&'static str),
    #[error("unknown extended term keyword {0:?}")]
    UnknownKeyword(String),
    #[error("time component has tag {0}, expected an integer")]
    TimeComponent(u8),
    #[error("dict body is a {0}, expected nil or a list")]
    DictBody(&'static str),
    #[error("dict entry is not a 2-tuple")]
    DictEntry,
    #[error("regex source is a {0}, expected a binary")]
    RegexSource(&'static str),
    #[error("unrecognised regex option {0}")]
    RegexOption(String),
    #[error("{what} length {len} exceeds limit {max}")]
    LimitExceeded {
        what: &'static str,
        len: usize,
        max: usize,
    },
    #[error("terms nested deeper than {max}")]
    TooDeep { max: usize },
}

impl From<InvalidTerm> for DecodeError {
    fn from(reason: InvalidTerm) -> Self {
        DecodeError::Invalid(reason)
    }
}

/// The decoder only builds containers through calls that fail on allocation
impl From<TermError> for DecodeError {
    fn from(_: TermError) -> Self {
        DecodeError::OutOfMemory
    }
}

impl From<ChunkBufferError> for DecodeError {
    fn from(err: ChunkBufferError) -> Self {
        match err {
            ChunkBufferError::OutOfMemory => DecodeError::OutOfMemory,
        }
    }
}

/// Decoder limits
///
/// Lengths and counts read from the wire are checked against these before any
/// memory is committed to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Largest atom, string or binary payload accepted
    pub max_payload_len: usize,
    /// Deepest composite nesting accepted
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecoderConfig {
    pub fn with_max_payload_len(mut self, max_payload_len: usize) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Streaming BERT decoder
///
/// # Example
///
/// ```rust
/// use infrastructure_bert_format::{Decoder, DecodeError};
/// use entities_bert_data::Term;
///
/// let mut decoder = Decoder::buffered();
/// decoder.feed(&[131, 97]).unwrap();
/// assert_eq!(decoder.decode(), Err(DecodeError::Short));
///
/// decoder.feed(&[4]).unwrap();
/// assert_eq!(decoder.decode(), Ok(Term::int(4)));
/// assert_eq!(decoder.decode(), Err(DecodeError::Empty));
/// ```
#[derive(Debug)]
pub struct Decoder<S> {
    source: S,
    window: ShortWindow,
    config: DecoderConfig,
}

impl<R: Read> Decoder<StreamSource<R>> {
    /// Decode from a live reader (file, pipe, socket)
    pub fn streaming(reader: R) -> Self {
        Decoder::new(StreamSource::new(reader))
    }
}

impl Decoder<ChunkBuffer> {
    /// Decode from bytes staged with [`Decoder::feed`]
    pub fn buffered() -> Self {
        Decoder::new(ChunkBuffer::new())
    }

    /// Stage more bytes for decoding
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
        self.source.write(bytes)?;
        Ok(())
    }
}

impl<S: ByteSource> Decoder<S> {
    /// Create a decoder over `source` with default limits
    pub fn new(source: S) -> Self {
        Self::with_config(source, DecoderConfig::default())
    }

    /// Create a decoder over `source` with explicit limits
    pub fn with_config(source: S, config: DecoderConfig) -> Self {
        Self {
            source,
            window: ShortWindow::new(),
            config,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Bytes fetched from the source but not yet consumed by a decoded term
    pub fn buffered_len(&self) -> usize {
        self.window.buffered()
    }

    /// Unwrap the byte source
    ///
    /// Bytes already staged in the short window are lost.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Decode the next top-level term
    ///
    /// # Returns
    /// * `Ok(Term)` - A complete term
    /// * `Err(DecodeError::Short)` - The term is incomplete; nothing was consumed
    /// * `Err(DecodeError::Empty)` - No bytes left and no term pending
    /// * `Err(_)` - Any other error is final for this term
    pub fn decode(&mut self) -> Result<Term, DecodeError> {
        if !self.window.prefetch(&mut self.source)? {
            return Err(DecodeError::Short);
        }
        self.window.begin();

        match self.decode_term(0) {
            Ok(term) => {
                self.window.commit();
                Ok(term)
            }
            Err(DecodeError::Empty) if !self.window.is_pending() => {
                self.window.commit();
                Err(DecodeError::Empty)
            }
            Err(DecodeError::Short) | Err(DecodeError::Empty) => {
                self.window.rewind()?;
                Err(DecodeError::Short)
            }
            Err(err @ DecodeError::Read(_)) => {
                self.window.rewind()?;
                Err(err)
            }
            Err(err) => {
                debug!(error = %err, "rejected term");
                self.window.commit();
                Err(err)
            }
        }
    }

    /// Ensure at least `n` contiguous unread bytes are staged
    pub(crate) fn pull(&mut self, n: usize) -> Result<(), DecodeError> {
        self.window.pull(&mut self.source, n)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        self.pull(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(self.window.take(N));
        Ok(out)
    }

    pub(crate) fn next_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub(crate) fn next_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn next_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn next_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub(crate) fn next_tag(&mut self) -> Result<u8, DecodeError> {
        self.next_u8()
    }

    /// Run a primitive read outside of `decode`, consuming its bytes for good
    fn standalone<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        self.window.begin();
        let value = read(self);
        self.window.commit();
        value
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.standalone(Self::next_u8)
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        self.standalone(|decoder| Ok(i8::from_be_bytes(decoder.read_array()?)))
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.standalone(Self::next_u16)
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        self.standalone(|decoder| Ok(i16::from_be_bytes(decoder.read_array()?)))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.standalone(Self::next_u32)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.standalone(Self::next_i32)
    }

    /// Read a tag byte
    pub fn read_magic(&mut self) -> Result<u8, DecodeError> {
        self.standalone(Self::next_tag)
    }

    /// Decode one term at nesting level `depth`
    pub(crate) fn decode_term(&mut self, depth: usize) -> Result<Term, DecodeError> {
        if depth > self.config.max_depth {
            debug!(max = self.config.max_depth, "term nesting limit exceeded");
            return Err(InvalidTerm::TooDeep {
                max: self.config.max_depth,
            }
            .into());
        }

        let mut tag = self.next_tag()?;
        if tag == magic::VERSION {
            tag = self.next_tag()?;
        }
        trace!(tag, depth, "decoding term");

        match tag {
            magic::NIL => Ok(Term::Nil),
            magic::SMALL_INT => Ok(Term::Integer(i32::from(self.next_u8()?))),
            magic::INT => Ok(Term::Integer(self.next_i32()?)),
            magic::SMALL_BIGNUM => {
                let size = usize::from(self.next_u8()?);
                self.decode_bignum(size)
            }
            magic::LARGE_BIGNUM => {
                let size = self.next_u32()? as usize;
                self.decode_bignum(size)
            }
            magic::FLOAT => {
                self.skip(magic::FLOAT_LEN)?;
                Err(DecodeError::NotImplemented(magic::FLOAT))
            }
            magic::ATOM => {
                let len = usize::from(self.next_u16()?);
                Ok(Term::Atom(self.decode_bytes(len, "atom")?))
            }
            magic::STRING => {
                let len = self.next_u32()? as usize;
                Ok(Term::String(self.decode_bytes(len, "string")?))
            }
            magic::BINARY => {
                let len = self.next_u32()? as usize;
                Ok(Term::Binary(self.decode_bytes(len, "binary")?))
            }
            magic::SMALL_TUPLE => {
                let arity = usize::from(self.next_u8()?);
                self.decode_tuple(arity, depth)
            }
            magic::LARGE_TUPLE => {
                let arity = self.next_u32()? as usize;
                self.decode_tuple(arity, depth)
            }
            magic::LIST => {
                let count = self.next_u32()? as usize;
                self.decode_list(count, depth)
            }
            other => {
                debug!(tag = other, "unknown tag");
                Err(InvalidTerm::UnknownTag(other).into())
            }
        }
    }

    /// Sign byte plus `size` big-endian magnitude bytes, folded into 32 bits
    ///
    /// Magnitudes wider than four bytes keep only their low 32 bits.
    fn decode_bignum(&mut self, size: usize) -> Result<Term, DecodeError> {
        let sign = self.next_u8()?;
        if size > 4 {
            trace!(size, "bignum magnitude truncated to 32 bits");
        }

        self.window.expect(size);
        let mut magnitude: u32 = 0;
        let mut remaining = size;
        while remaining > 0 {
            let count = remaining.min(self.window.max_pull());
            self.pull(count)?;
            for &byte in self.window.take(count) {
                magnitude = (magnitude << 8) | u32::from(byte);
            }
            remaining -= count;
        }

        let value = magnitude as i32;
        Ok(Term::Integer(if sign != 0 { value.wrapping_neg() } else { value }))
    }

    /// Copy a `len`-byte payload out of the stream into a checked allocation
    fn decode_bytes(&mut self, len: usize, what: &'static str) -> Result<Vec<u8>, DecodeError> {
        if len > self.config.max_payload_len {
            debug!(what, len, max = self.config.max_payload_len, "payload over limit");
            return Err(InvalidTerm::LimitExceeded {
                what,
                len,
                max: self.config.max_payload_len,
            }
            .into());
        }

        // Memory follows the bytes that actually arrive, not the declared length
        self.window.expect(len);
        let mut out = Vec::new();
        while out.len() < len {
            let count = (len - out.len()).min(self.window.max_pull());
            self.pull(count)?;
            out.try_reserve(count)
                .map_err(|_| DecodeError::OutOfMemory)?;
            out.extend_from_slice(self.window.take(count));
        }
        Ok(out)
    }

    fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.window.expect(len);
        let mut remaining = len;
        while remaining > 0 {
            let count = remaining.min(self.window.max_pull());
            self.pull(count)?;
            self.window.take(count);
            remaining -= count;
        }
        Ok(())
    }

    /// Tuple elements, or an extended term if the first element is `bert`
    fn decode_tuple(&mut self, arity: usize, depth: usize) -> Result<Term, DecodeError> {
        if arity == 0 {
            return Ok(Term::Tuple(Tuple::with_arity(0)?));
        }

        let first = self.decode_term(depth + 1)?;
        if first.is_atom(magic::BERT_ATOM) {
            return self.decode_extended(depth);
        }

        let mut elements = Vec::new();
        elements
            .try_reserve(arity.min(TUPLE_PREALLOC))
            .map_err(|_| DecodeError::OutOfMemory)?;
        elements.push(first);

        for _ in 1..arity {
            let element = self.decode_term(depth + 1)?;
            elements
                .try_reserve(1)
                .map_err(|_| DecodeError::OutOfMemory)?;
            elements.push(element);
        }

        Ok(Term::Tuple(Tuple::from_elements(elements)))
    }

    /// `count` elements followed by the one-byte list terminator
    fn decode_list(&mut self, count: usize, depth: usize) -> Result<Term, DecodeError> {
        let mut list = List::new();
        for _ in 0..count {
            let element = self.decode_term(depth + 1)?;
            list.push(element)?;
        }

        // The terminator is always nil on the wire; it is not checked
        self.next_u8()?;
        Ok(Term::List(list))
    }
}
