//! Term Module
//!
//! Provides the `Term` enum representing every decodable and encodable BERT value,
//! together with its constructors.
//!
//! Composite variants (`Tuple`, `List`, `Dict`) exclusively own their children.
//! Dropping a composite releases each child exactly once, and a child moved out of
//! one composite can no longer be reached through it.

use crate::dict::Dict;
use crate::list::List;
use crate::regex_options::RegexOptions;
use crate::tuple::Tuple;
use thiserror::Error;

/// Term model errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermError {
    /// An allocation for the term or one of its children failed
    #[error("out of memory while building term")]
    OutOfMemory,
    /// A tuple slot index was outside the tuple's arity
    #[error("slot {index} out of range for tuple of arity {arity}")]
    SlotOutOfRange {
        /// Requested slot
        index: usize,
        /// Arity of the tuple
        arity: usize,
    },
}

/// A regular-expression descriptor carried by `{bert, regex, Source, Options}`
///
/// Only the raw pattern bytes and the resolved option bitmask are kept.
/// Compiling the pattern is left to whichever regex engine consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regex {
    source: Vec<u8>,
    options: RegexOptions,
}

impl Regex {
    /// Create a regex descriptor from pattern bytes and options
    pub fn new(source: &[u8], options: RegexOptions) -> Result<Self, TermError> {
        Ok(Self {
            source: copy_bytes(source)?,
            options,
        })
    }

    /// Create a regex descriptor taking ownership of already decoded pattern bytes
    pub fn from_parts(source: Vec<u8>, options: RegexOptions) -> Self {
        Self { source, options }
    }

    /// Raw pattern bytes
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Resolved option bitmask
    pub fn options(&self) -> RegexOptions {
        self.options
    }
}

/// A BERT term
///
/// The closed set of values the codec understands. `None` marks a term that was
/// never initialised or has been destroyed; it is never produced by the decoder
/// and is rejected by the encoder.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Term {
    /// Uninitialised or destroyed
    #[default]
    None,
    /// `{bert, true}` / `{bert, false}`
    Boolean(bool),
    /// 32-bit signed integer (small, large and bignum wire forms)
    Integer(i32),
    /// Reserved; the wire float format is not supported
    Float(f32),
    /// Atom name bytes
    Atom(Vec<u8>),
    /// String bytes
    String(Vec<u8>),
    /// Fixed-arity tuple
    Tuple(Tuple),
    /// Ordered list
    List(List),
    /// Insertion-ordered dictionary
    Dict(Dict),
    /// Raw binary payload
    Binary(Vec<u8>),
    /// Nil
    Nil,
    /// `{bert, time, MegaSecs, Secs, MicroSecs}` folded into whole seconds
    Time(u64),
    /// `{bert, regex, Source, Options}`
    Regex(Regex),
}

impl Term {
    /// `{bert, true}`
    pub const TRUE: Term = Term::Boolean(true);
    /// `{bert, false}`
    pub const FALSE: Term = Term::Boolean(false);
    /// Nil
    pub const NIL: Term = Term::Nil;

    /// Create a nil term
    pub fn nil() -> Self {
        Term::Nil
    }

    /// Create a boolean term
    pub fn boolean(value: bool) -> Self {
        Term::Boolean(value)
    }

    /// Create an integer term
    pub fn int(value: i32) -> Self {
        Term::Integer(value)
    }

    /// Create an atom term by copying `name`
    pub fn atom(name: &[u8]) -> Result<Self, TermError> {
        Ok(Term::Atom(copy_bytes(name)?))
    }

    /// Create a string term by copying `text`
    pub fn string(text: &[u8]) -> Result<Self, TermError> {
        Ok(Term::String(copy_bytes(text)?))
    }

    /// Create a binary term by copying `data`
    pub fn binary(data: &[u8]) -> Result<Self, TermError> {
        Ok(Term::Binary(copy_bytes(data)?))
    }

    /// Create a tuple of `arity` empty slots
    pub fn tuple(arity: usize) -> Result<Self, TermError> {
        Ok(Term::Tuple(Tuple::with_arity(arity)?))
    }

    /// Create an empty list
    pub fn list() -> Self {
        Term::List(List::new())
    }

    /// Create an empty dictionary
    pub fn dict() -> Self {
        Term::Dict(Dict::new())
    }

    /// Create a timestamp term from whole seconds
    pub fn time(seconds: u64) -> Self {
        Term::Time(seconds)
    }

    /// Create a regex descriptor term by copying `source`
    pub fn regex(source: &[u8], options: RegexOptions) -> Result<Self, TermError> {
        Ok(Term::Regex(Regex::new(source, options)?))
    }

    /// Release this term and all of its children, leaving `Term::None`
    ///
    /// Calling this on a term that is already `None` does nothing.
    pub fn destroy(&mut self) {
        drop(std::mem::take(self));
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Term::None => "none",
            Term::Boolean(_) => "boolean",
            Term::Integer(_) => "integer",
            Term::Float(_) => "float",
            Term::Atom(_) => "atom",
            Term::String(_) => "string",
            Term::Tuple(_) => "tuple",
            Term::List(_) => "list",
            Term::Dict(_) => "dict",
            Term::Binary(_) => "binary",
            Term::Nil => "nil",
            Term::Time(_) => "time",
            Term::Regex(_) => "regex",
        }
    }

    /// Whether this is `Term::None`
    pub fn is_none(&self) -> bool {
        matches!(self, Term::None)
    }

    /// Whether this is an atom named exactly `name`
    pub fn is_atom(&self, name: &[u8]) -> bool {
        matches!(self, Term::Atom(n) if n.as_slice() == name)
    }

    /// Atom name bytes, if this is an atom
    pub fn as_atom(&self) -> Option<&[u8]> {
        match self {
            Term::Atom(name) => Some(name),
            _ => None,
        }
    }

    /// Integer value, if this is an integer
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Term::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Term::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// String bytes, if this is a string
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Term::String(text) => Some(text),
            _ => None,
        }
    }

    /// Binary bytes, if this is a binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Term::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// Tuple, if this is a tuple
    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Term::Tuple(t) => Some(t),
            _ => None,
        }
    }

    /// List, if this is a list
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Term::List(l) => Some(l),
            _ => None,
        }
    }

    /// Dictionary, if this is a dict
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Term::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Regex descriptor, if this is a regex
    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            Term::Regex(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Tuple> for Term {
    fn from(tuple: Tuple) -> Self {
        Term::Tuple(tuple)
    }
}

impl From<List> for Term {
    fn from(list: List) -> Self {
        Term::List(list)
    }
}

impl From<Dict> for Term {
    fn from(dict: Dict) -> Self {
        Term::Dict(dict)
    }
}

/// Copy `bytes` into a freshly reserved vector, reporting allocation failure
pub fn copy_bytes(bytes: &[u8]) -> Result<Vec<u8>, TermError> {
    let mut out = Vec::new();
    out.try_reserve_exact(bytes.len())
        .map_err(|_| TermError::OutOfMemory)?;
    out.extend_from_slice(bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_constructors() {
        assert_eq!(Term::nil(), Term::Nil);
        assert_eq!(Term::boolean(true), Term::TRUE);
        assert_eq!(Term::boolean(false), Term::FALSE);
        assert_eq!(Term::int(-7), Term::Integer(-7));
        assert_eq!(Term::time(1_300_000_000), Term::Time(1_300_000_000));
    }

    #[test]
    fn test_byte_constructors_copy() {
        let name = b"ok".to_vec();
        let atom = Term::atom(&name).unwrap();
        drop(name);
        assert_eq!(atom.as_atom(), Some(&b"ok"[..]));
        assert!(atom.is_atom(b"ok"));
        assert!(!atom.is_atom(b"okay"));

        assert_eq!(Term::string(b"hi").unwrap().as_string(), Some(&b"hi"[..]));
        assert_eq!(Term::binary(&[0, 1, 2]).unwrap().as_binary(), Some(&[0u8, 1, 2][..]));
    }

    #[test]
    fn test_empty_payloads() {
        assert_eq!(Term::atom(b"").unwrap(), Term::Atom(Vec::new()));
        assert_eq!(Term::binary(b"").unwrap(), Term::Binary(Vec::new()));
    }

    #[test]
    fn test_tuple_constructor_allocates_empty_slots() {
        let term = Term::tuple(3).unwrap();
        let tuple = term.as_tuple().unwrap();
        assert_eq!(tuple.arity(), 3);
        assert!(!tuple.is_complete());
        assert!(tuple.get(0).is_none());
    }

    #[test]
    fn test_destroy_resets_to_none() {
        let mut list = List::new();
        list.push(Term::int(1)).unwrap();
        let mut term = Term::List(list);

        term.destroy();
        assert!(term.is_none());

        // Destroying an already destroyed term is a no-op
        term.destroy();
        assert!(term.is_none());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Term::None.kind(), "none");
        assert_eq!(Term::list().kind(), "list");
        assert_eq!(Term::dict().kind(), "dict");
        assert_eq!(Term::regex(b"a+", RegexOptions::empty()).unwrap().kind(), "regex");
    }

    #[test]
    fn test_regex_descriptor() {
        let options = RegexOptions::CASELESS | RegexOptions::MULTILINE;
        let term = Term::regex(b"^a.*$", options).unwrap();
        let regex = term.as_regex().unwrap();
        assert_eq!(regex.source(), b"^a.*$");
        assert_eq!(regex.options(), options);
    }

    #[test]
    fn test_term_error_display() {
        assert_eq!(TermError::OutOfMemory.to_string(), "out of memory while building term");
        let err = TermError::SlotOutOfRange { index: 4, arity: 2 };
        assert_eq!(err.to_string(), "slot 4 out of range for tuple of arity 2");
    }
}
