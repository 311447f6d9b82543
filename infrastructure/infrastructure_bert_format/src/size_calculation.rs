//! Size Calculation Module
//!
//! Computes how many bytes the encoder will emit for a term, without encoding
//! it. A term the encoder would reject is rejected here with the same error.

use crate::encoding::{EncodeError, InvalidEncoding};
use crate::magic;
use entities_bert_data::{Regex, Term, Tuple};

/// `{bert, Keyword}` prefix: tuple header plus two atoms
fn bert_header_size(arity: usize, keyword: &[u8]) -> usize {
    tuple_header_size(arity) + atom_size(magic::BERT_ATOM) + atom_size(keyword)
}

fn tuple_header_size(arity: usize) -> usize {
    if arity <= 0xFF {
        2
    } else {
        5
    }
}

fn atom_size(name: &[u8]) -> usize {
    3 + name.len()
}

/// Size of the encoded term, including the leading version byte
pub fn encoded_message_size(term: &Term) -> Result<usize, EncodeError> {
    Ok(1 + encoded_size(term)?)
}

/// Size of the encoded term without the version byte
///
/// # Arguments
/// * `term` - The term to measure
///
/// # Returns
/// * `Ok(usize)` - Bytes `Encoder::encode` would write
/// * `Err(EncodeError)` - The encoder would reject this term
pub fn encoded_size(term: &Term) -> Result<usize, EncodeError> {
    match term {
        Term::None => Err(InvalidEncoding::UninitialisedTerm.into()),
        Term::Integer(value) => Ok(if (0..=255).contains(value) { 2 } else { 5 }),
        Term::Float(_) => Err(EncodeError::NotImplemented("float")),
        Term::Atom(name) => {
            if name.len() > usize::from(u16::MAX) {
                return Err(InvalidEncoding::PayloadTooLong {
                    what: "atom",
                    len: name.len(),
                    max: usize::from(u16::MAX),
                }
                .into());
            }
            Ok(atom_size(name))
        }
        Term::String(text) => payload_size("string", text),
        Term::Binary(data) => payload_size("binary", data),
        Term::Tuple(tuple) => tuple_size(tuple),
        Term::List(list) => {
            let mut size = list_frame_size(list.len())?;
            for element in list {
                size += encoded_size(element)?;
            }
            Ok(size)
        }
        Term::Nil => Ok(bert_header_size(2, b"nil")),
        Term::Boolean(true) => Ok(bert_header_size(2, b"true")),
        Term::Boolean(false) => Ok(bert_header_size(2, b"false")),
        Term::Time(seconds) => {
            if seconds / 1_000_000 > u64::from(u32::MAX) {
                return Err(InvalidEncoding::TimeOutOfRange(*seconds).into());
            }
            Ok(bert_header_size(5, b"time") + 3 * 5)
        }
        Term::Dict(dict) => {
            let mut size = bert_header_size(3, b"dict") + list_frame_size(dict.len())?;
            for (key, value) in dict.iter() {
                if key.is_atom(magic::BERT_ATOM) {
                    return Err(InvalidEncoding::ReservedBertTuple.into());
                }
                size += tuple_header_size(2) + encoded_size(key)? + encoded_size(value)?;
            }
            Ok(size)
        }
        Term::Regex(regex) => regex_size(regex),
    }
}

fn payload_size(what: &'static str, bytes: &[u8]) -> Result<usize, EncodeError> {
    if u32::try_from(bytes.len()).is_err() {
        return Err(InvalidEncoding::PayloadTooLong {
            what,
            len: bytes.len(),
            max: u32::MAX as usize,
        }
        .into());
    }
    Ok(5 + bytes.len())
}

/// List tag, count and terminator
fn list_frame_size(count: usize) -> Result<usize, EncodeError> {
    if u32::try_from(count).is_err() {
        return Err(InvalidEncoding::ListTooLong(count).into());
    }
    Ok(6)
}

fn tuple_size(tuple: &Tuple) -> Result<usize, EncodeError> {
    if tuple.get(0).is_some_and(|first| first.is_atom(magic::BERT_ATOM)) {
        return Err(InvalidEncoding::ReservedBertTuple.into());
    }
    if tuple.arity() > magic::MAX_TUPLE_ARITY {
        return Err(InvalidEncoding::TupleTooLarge(tuple.arity()).into());
    }

    let mut size = tuple_header_size(tuple.arity());
    for (index, slot) in tuple.iter().enumerate() {
        let element = slot.ok_or(InvalidEncoding::EmptySlot(index))?;
        size += encoded_size(element)?;
    }
    Ok(size)
}

fn regex_size(regex: &Regex) -> Result<usize, EncodeError> {
    let options = regex.options();
    let names = options
        .flag_names()
        .map_err(InvalidEncoding::UnknownRegexOptions)?;
    let newline = options
        .newline()
        .map_err(InvalidEncoding::UnknownRegexOptions)?;

    let mut size = bert_header_size(4, b"regex")
        + payload_size("regex source", regex.source())?
        + list_frame_size(names.len() + usize::from(newline.is_some()))?;
    size += names.iter().map(|name| atom_size(name.as_bytes())).sum::<usize>();
    if let Some(mode) = newline {
        size += tuple_header_size(2) + atom_size(b"newline") + atom_size(mode.name().as_bytes());
    }
    Ok(size)
}
