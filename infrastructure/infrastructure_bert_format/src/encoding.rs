//! Encoding Module
//!
//! Provides the BERT encoder, the structural mirror of the decoder.
//!
//! Each term is first serialized into a scratch buffer and only written to the
//! sink once it has been fully validated, so a rejected term never leaves
//! partial bytes behind.

use crate::magic;
use crate::size_calculation::encoded_size;
use entities_bert_data::{Dict, List, Regex, Term, Tuple};
use std::io::{ErrorKind, Write};
use thiserror::Error;
use tracing::{debug, trace};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Encoding error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The term cannot be represented on the wire
    #[error("invalid term for encoding: {0}")]
    Invalid(InvalidEncoding),
    /// A term variant the encoder does not support
    #[error("encoding of {0} is not implemented")]
    NotImplemented(&'static str),
    /// The sink failed
    #[error("failed to write encoded term: {0:?}")]
    Write(ErrorKind),
    /// The scratch buffer could not grow
    #[error("out of memory while encoding")]
    OutOfMemory,
}

/// Reasons a term is rejected as `EncodeError::Invalid`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidEncoding {
    #[error("uninitialised term")]
    UninitialisedTerm,
    #[error("{what} of {len} bytes exceeds the wire limit of {max}")]
    PayloadTooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },
    #[error("tuple arity {0} exceeds the wire limit")]
    TupleTooLarge(usize),
    #[error("list of {0} elements exceeds the wire limit")]
    ListTooLong(usize),
    #[error("tuple slot {0} is empty")]
    EmptySlot(usize),
    #[error("plain tuple starts with the bert atom")]
    ReservedBertTuple,
    #[error("time {0} is out of range")]
    TimeOutOfRange(u64),
    #[error("regex option bits {0:#x} have no name")]
    UnknownRegexOptions(u32),
}

impl From<InvalidEncoding> for EncodeError {
    fn from(reason: InvalidEncoding) -> Self {
        EncodeError::Invalid(reason)
    }
}

/// Streaming BERT encoder over any `std::io::Write`
///
/// # Example
///
/// ```rust
/// use infrastructure_bert_format::Encoder;
/// use entities_bert_data::Term;
///
/// let mut encoder = Encoder::new(Vec::new());
/// encoder.encode(&Term::atom(b"ok").unwrap()).unwrap();
/// assert_eq!(encoder.into_inner(), vec![100, 0, 2, b'o', b'k']);
/// ```
#[derive(Debug)]
pub struct Encoder<W> {
    sink: W,
    scratch: Vec<u8>,
}

impl<W: Write> Encoder<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            scratch: Vec::new(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn flush(&mut self) -> Result<(), EncodeError> {
        self.sink.flush().map_err(|e| EncodeError::Write(e.kind()))
    }

    /// Write one term without the leading version byte
    pub fn encode(&mut self, term: &Term) -> Result<(), EncodeError> {
        self.scratch.clear();
        reserve(&mut self.scratch, encoded_size(term)?)?;
        encode_term(&mut self.scratch, term)?;
        self.emit()
    }

    /// Write the version byte followed by one term
    pub fn encode_message(&mut self, term: &Term) -> Result<(), EncodeError> {
        self.scratch.clear();
        reserve(&mut self.scratch, 1 + encoded_size(term)?)?;
        self.scratch.push(magic::VERSION);
        encode_term(&mut self.scratch, term)?;
        self.emit()
    }

    fn emit(&mut self) -> Result<(), EncodeError> {
        trace!(bytes = self.scratch.len(), "writing encoded term");
        self.sink.write_all(&self.scratch).map_err(|e| {
            debug!(error = %e, "encoder sink write failed");
            EncodeError::Write(e.kind())
        })
    }
}

/// Make room for `additional` more bytes in `buf`
pub(crate) fn reserve(buf: &mut Vec<u8>, additional: usize) -> Result<(), EncodeError> {
    buf.try_reserve(additional).map_err(|_| {
        debug!(additional, "encode buffer allocation failed");
        EncodeError::OutOfMemory
    })
}

/// Append the wire form of `term` to `buf`
pub(crate) fn encode_term(buf: &mut Vec<u8>, term: &Term) -> Result<(), EncodeError> {
    match term {
        Term::None => {
            debug!("refusing to encode an uninitialised term");
            Err(InvalidEncoding::UninitialisedTerm.into())
        }
        Term::Integer(value) => {
            encode_int(buf, *value);
            Ok(())
        }
        Term::Float(_) => Err(EncodeError::NotImplemented("float")),
        Term::Atom(name) => encode_atom(buf, name),
        Term::String(text) => encode_payload(buf, magic::STRING, "string", text),
        Term::Binary(data) => encode_payload(buf, magic::BINARY, "binary", data),
        Term::Tuple(tuple) => encode_tuple(buf, tuple),
        Term::List(list) => encode_list(buf, list),
        Term::Nil => encode_bert_header(buf, 2, b"nil"),
        Term::Boolean(true) => encode_bert_header(buf, 2, b"true"),
        Term::Boolean(false) => encode_bert_header(buf, 2, b"false"),
        Term::Time(seconds) => encode_time(buf, *seconds),
        Term::Dict(dict) => encode_dict(buf, dict),
        Term::Regex(regex) => encode_regex(buf, regex),
    }
}

fn encode_int(buf: &mut Vec<u8>, value: i32) {
    match u8::try_from(value) {
        Ok(small) => buf.extend_from_slice(&[magic::SMALL_INT, small]),
        Err(_) => {
            buf.push(magic::INT);
            buf.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// 4-byte `INT` form regardless of magnitude
fn encode_wide_int(buf: &mut Vec<u8>, value: u32) {
    buf.push(magic::INT);
    buf.extend_from_slice(&value.to_be_bytes());
}

fn encode_atom(buf: &mut Vec<u8>, name: &[u8]) -> Result<(), EncodeError> {
    let len = u16::try_from(name.len()).map_err(|_| InvalidEncoding::PayloadTooLong {
        what: "atom",
        len: name.len(),
        max: usize::from(u16::MAX),
    })?;
    buf.push(magic::ATOM);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(name);
    Ok(())
}

fn encode_payload(
    buf: &mut Vec<u8>,
    tag: u8,
    what: &'static str,
    bytes: &[u8],
) -> Result<(), EncodeError> {
    let len = u32::try_from(bytes.len()).map_err(|_| InvalidEncoding::PayloadTooLong {
        what,
        len: bytes.len(),
        max: u32::MAX as usize,
    })?;
    buf.push(tag);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn encode_tuple_header(buf: &mut Vec<u8>, arity: usize) -> Result<(), EncodeError> {
    if let Ok(small) = u8::try_from(arity) {
        buf.extend_from_slice(&[magic::SMALL_TUPLE, small]);
    } else if arity <= magic::MAX_TUPLE_ARITY {
        buf.push(magic::LARGE_TUPLE);
        buf.extend_from_slice(&(arity as u32).to_be_bytes());
    } else {
        return Err(InvalidEncoding::TupleTooLarge(arity).into());
    }
    Ok(())
}

fn encode_tuple(buf: &mut Vec<u8>, tuple: &Tuple) -> Result<(), EncodeError> {
    if tuple.get(0).is_some_and(|first| first.is_atom(magic::BERT_ATOM)) {
        debug!("plain tuple would decode as an extended term");
        return Err(InvalidEncoding::ReservedBertTuple.into());
    }

    encode_tuple_header(buf, tuple.arity())?;
    for (index, slot) in tuple.iter().enumerate() {
        let element = slot.ok_or(InvalidEncoding::EmptySlot(index))?;
        encode_term(buf, element)?;
    }
    Ok(())
}

fn encode_list_header(buf: &mut Vec<u8>, count: usize) -> Result<(), EncodeError> {
    let count = u32::try_from(count).map_err(|_| InvalidEncoding::ListTooLong(count))?;
    buf.push(magic::LIST);
    buf.extend_from_slice(&count.to_be_bytes());
    Ok(())
}

fn encode_list(buf: &mut Vec<u8>, list: &List) -> Result<(), EncodeError> {
    encode_list_header(buf, list.len())?;
    for element in list {
        encode_term(buf, element)?;
    }
    buf.push(magic::NIL);
    Ok(())
}

/// `{bert, Keyword, ...}` header; the caller writes the remaining elements
fn encode_bert_header(buf: &mut Vec<u8>, arity: usize, keyword: &[u8]) -> Result<(), EncodeError> {
    encode_tuple_header(buf, arity)?;
    encode_atom(buf, magic::BERT_ATOM)?;
    encode_atom(buf, keyword)
}

fn encode_time(buf: &mut Vec<u8>, seconds: u64) -> Result<(), EncodeError> {
    let mega = u32::try_from(seconds / MICROS_PER_SECOND)
        .map_err(|_| InvalidEncoding::TimeOutOfRange(seconds))?;
    // Always below 1_000_000, so the cast is lossless
    let secs = (seconds % MICROS_PER_SECOND) as u32;

    encode_bert_header(buf, 5, b"time")?;
    encode_wide_int(buf, mega);
    encode_wide_int(buf, secs);
    encode_wide_int(buf, 0);
    Ok(())
}

fn encode_dict(buf: &mut Vec<u8>, dict: &Dict) -> Result<(), EncodeError> {
    encode_bert_header(buf, 3, b"dict")?;
    encode_list_header(buf, dict.len())?;
    for (key, value) in dict.iter() {
        if key.is_atom(magic::BERT_ATOM) {
            debug!("dict entry would decode as an extended term");
            return Err(InvalidEncoding::ReservedBertTuple.into());
        }
        encode_tuple_header(buf, 2)?;
        encode_term(buf, key)?;
        encode_term(buf, value)?;
    }
    buf.push(magic::NIL);
    Ok(())
}

fn encode_regex(buf: &mut Vec<u8>, regex: &Regex) -> Result<(), EncodeError> {
    let options = regex.options();
    let names = options
        .flag_names()
        .map_err(InvalidEncoding::UnknownRegexOptions)?;
    let newline = options
        .newline()
        .map_err(InvalidEncoding::UnknownRegexOptions)?;

    encode_bert_header(buf, 4, b"regex")?;
    encode_payload(buf, magic::BINARY, "regex source", regex.source())?;

    encode_list_header(buf, names.len() + usize::from(newline.is_some()))?;
    for name in names {
        encode_atom(buf, name.as_bytes())?;
    }
    if let Some(mode) = newline {
        encode_tuple_header(buf, 2)?;
        encode_atom(buf, b"newline")?;
        encode_atom(buf, mode.name().as_bytes())?;
    }
    buf.push(magic::NIL);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities_bert_data::{NewlineMode, RegexOptions};
    use std::io;

    fn encode(term: &Term) -> Result<Vec<u8>, EncodeError> {
        let mut encoder = Encoder::new(Vec::new());
        encoder.encode(term)?;
        Ok(encoder.into_inner())
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode(&Term::int(4)), Ok(vec![97, 4]));
        assert_eq!(encode(&Term::int(255)), Ok(vec![97, 255]));
        assert_eq!(encode(&Term::int(256)), Ok(vec![98, 0, 0, 1, 0]));
        assert_eq!(encode(&Term::int(-1)), Ok(vec![98, 0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(
            encode(&Term::int(i32::MIN)),
            Ok(vec![98, 0x80, 0, 0, 0])
        );
    }

    #[test]
    fn test_encode_atom_string_binary() {
        assert_eq!(encode(&Term::atom(b"ok").unwrap()), Ok(vec![100, 0, 2, b'o', b'k']));
        assert_eq!(encode(&Term::string(b"").unwrap()), Ok(vec![107, 0, 0, 0, 0]));
        assert_eq!(
            encode(&Term::binary(&[1, 2]).unwrap()),
            Ok(vec![109, 0, 0, 0, 2, 1, 2])
        );
    }

    #[test]
    fn test_encode_atom_too_long() {
        let name = vec![b'a'; usize::from(u16::MAX) + 1];
        assert!(matches!(
            encode(&Term::Atom(name)),
            Err(EncodeError::Invalid(InvalidEncoding::PayloadTooLong { what: "atom", .. }))
        ));
    }

    #[test]
    fn test_encode_tuples() {
        let tuple = Tuple::from_elements(vec![Term::int(1), Term::int(2)]);
        assert_eq!(encode(&Term::Tuple(tuple)), Ok(vec![104, 2, 97, 1, 97, 2]));

        let large = Tuple::from_elements(vec![Term::int(0); 256]);
        let bytes = encode(&Term::Tuple(large)).unwrap();
        assert_eq!(&bytes[..5], &[105, 0, 0, 1, 0]);
        assert_eq!(bytes.len(), 5 + 256 * 2);
    }

    #[test]
    fn test_encode_tuple_with_empty_slot() {
        let tuple = Tuple::with_arity(2).unwrap();
        assert_eq!(
            encode(&Term::Tuple(tuple)),
            Err(EncodeError::Invalid(InvalidEncoding::EmptySlot(0)))
        );
    }

    #[test]
    fn test_encode_rejects_plain_bert_tuple() {
        let tuple = Tuple::from_elements(vec![Term::atom(b"bert").unwrap(), Term::int(1)]);
        assert_eq!(
            encode(&Term::Tuple(tuple)),
            Err(EncodeError::Invalid(InvalidEncoding::ReservedBertTuple))
        );
    }

    #[test]
    fn test_encode_rejects_bert_dict_key() {
        let mut dict = Dict::new();
        dict.append(Term::atom(b"bert").unwrap(), Term::int(1)).unwrap();
        assert_eq!(
            encode(&Term::Dict(dict)),
            Err(EncodeError::Invalid(InvalidEncoding::ReservedBertTuple))
        );
    }

    #[test]
    fn test_encode_lists() {
        assert_eq!(encode(&Term::list()), Ok(vec![108, 0, 0, 0, 0, 106]));
        let list: List = vec![Term::int(1), Term::int(2)].into_iter().collect();
        assert_eq!(
            encode(&Term::List(list)),
            Ok(vec![108, 0, 0, 0, 2, 97, 1, 97, 2, 106])
        );
    }

    #[test]
    fn test_encode_booleans_and_nil() {
        let bert = [100, 0, 4, b'b', b'e', b'r', b't'];
        let mut expected = vec![104, 2];
        expected.extend_from_slice(&bert);
        expected.extend_from_slice(&[100, 0, 4, b't', b'r', b'u', b'e']);
        assert_eq!(encode(&Term::TRUE), Ok(expected));

        let bytes = encode(&Term::Nil).unwrap();
        assert_eq!(&bytes[..2], &[104, 2]);
        assert!(bytes.ends_with(&[100, 0, 3, b'n', b'i', b'l']));
    }

    #[test]
    fn test_encode_time() {
        let bytes = encode(&Term::time(1_255_295_581)).unwrap();
        assert_eq!(&bytes[..2], &[104, 5]);
        assert!(bytes.ends_with(&[
            98, 0, 0, 0x04, 0xE7, // 1255
            98, 0, 0x04, 0x82, 0x9D, // 295581
            98, 0, 0, 0, 0,
        ]));
    }

    #[test]
    fn test_encode_time_out_of_range() {
        assert_eq!(
            encode(&Term::time(u64::MAX)),
            Err(EncodeError::Invalid(InvalidEncoding::TimeOutOfRange(u64::MAX)))
        );
    }

    #[test]
    fn test_encode_empty_dict() {
        let bytes = encode(&Term::dict()).unwrap();
        assert_eq!(&bytes[..2], &[104, 3]);
        assert!(bytes.ends_with(&[b'd', b'i', b'c', b't', 108, 0, 0, 0, 0, 106]));
    }

    #[test]
    fn test_encode_regex() {
        let options = RegexOptions::CASELESS | NewlineMode::Crlf.mask();
        let bytes = encode(&Term::regex(b"x", options).unwrap()).unwrap();
        let tail = [
            109, 0, 0, 0, 1, b'x', // source
            108, 0, 0, 0, 2, // two options
            100, 0, 8, b'c', b'a', b's', b'e', b'l', b'e', b's', b's',
            104, 2, 100, 0, 7, b'n', b'e', b'w', b'l', b'i', b'n', b'e',
            100, 0, 4, b'c', b'r', b'l', b'f',
            106,
        ];
        assert!(bytes.ends_with(&tail));
    }

    #[test]
    fn test_encode_regex_unknown_bits() {
        let term = Term::regex(b"x", RegexOptions::from_bits_retain(0x8000_0000)).unwrap();
        assert_eq!(
            encode(&term),
            Err(EncodeError::Invalid(InvalidEncoding::UnknownRegexOptions(0x8000_0000)))
        );
    }

    #[test]
    fn test_encode_unsupported() {
        assert_eq!(encode(&Term::Float(1.5)), Err(EncodeError::NotImplemented("float")));
        assert_eq!(
            encode(&Term::None),
            Err(EncodeError::Invalid(InvalidEncoding::UninitialisedTerm))
        );
    }

    #[test]
    fn test_rejected_term_writes_nothing() {
        let mut list = List::new();
        list.push(Term::int(1)).unwrap();
        list.push(Term::None).unwrap();

        let mut encoder = Encoder::new(Vec::new());
        assert!(encoder.encode(&Term::List(list)).is_err());
        assert!(encoder.get_ref().is_empty());
    }

    #[test]
    fn test_reserve_failure_is_out_of_memory() {
        let mut buf = vec![1u8];
        assert_eq!(reserve(&mut buf, usize::MAX), Err(EncodeError::OutOfMemory));
        assert_eq!(buf, vec![1]);
        assert_eq!(EncodeError::OutOfMemory.to_string(), "out of memory while encoding");
    }

    #[test]
    fn test_scratch_sized_before_encoding() {
        let term = Term::binary(&[7; 10_000]).unwrap();
        let mut encoder = Encoder::new(Vec::new());
        encoder.encode_message(&term).unwrap();
        assert!(encoder.scratch.capacity() >= 10_006);
        assert_eq!(encoder.get_ref().len(), 10_006);
    }

    #[test]
    fn test_encode_message_has_version() {
        let mut encoder = Encoder::new(Vec::new());
        encoder.encode_message(&Term::int(7)).unwrap();
        encoder.flush().unwrap();
        assert_eq!(encoder.into_inner(), vec![131, 97, 7]);
    }

    #[test]
    fn test_sink_error_kind() {
        let mut encoder = Encoder::new(BrokenPipe);
        assert_eq!(
            encoder.encode(&Term::int(1)),
            Err(EncodeError::Write(ErrorKind::BrokenPipe))
        );
    }
}
