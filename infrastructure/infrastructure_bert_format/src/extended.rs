//! Extended Term Decoding Module
//!
//! Decodes the richer types BERT carries on tuples whose first element is the
//! atom `bert`: `{bert, nil}`, `{bert, true}`, `{bert, false}`,
//! `{bert, time, Mega, Secs, Micro}`, `{bert, dict, Pairs}` and
//! `{bert, regex, Source, Options}`.
//!
//! These functions run after the leading `bert` atom has been consumed. Only the
//! elements a keyword needs are read; anything else the tuple declared is left
//! in the stream.

use crate::decoding::{DecodeError, InvalidTerm};
use crate::magic;
use crate::source::ByteSource;
use entities_bert_data::regex_options::option_mask;
use entities_bert_data::{Dict, NewlineMode, Regex, RegexOptions, Term};
use tracing::{debug, trace};

const NEWLINE_ATOM: &[u8] = b"newline";
const MICROS_PER_SECOND: u64 = 1_000_000;

impl<S: ByteSource> crate::decoding::Decoder<S> {
    /// Decode the keyword and body of an extended term
    pub(crate) fn decode_extended(&mut self, depth: usize) -> Result<Term, DecodeError> {
        let keyword = match self.decode_term(depth + 1)? {
            Term::Atom(name) => name,
            other => {
                debug!(kind = other.kind(), "extended term keyword is not an atom");
                return Err(InvalidTerm::KeywordNotAtom(other.kind()).into());
            }
        };
        trace!(keyword = %String::from_utf8_lossy(&keyword), "decoding extended term");

        match keyword.as_slice() {
            b"nil" => Ok(Term::Nil),
            b"true" => Ok(Term::TRUE),
            b"false" => Ok(Term::FALSE),
            b"time" => self.decode_time(),
            b"dict" => self.decode_dict(depth),
            b"regex" => self.decode_regex(depth),
            _ => {
                let name = String::from_utf8_lossy(&keyword).into_owned();
                debug!(keyword = %name, "unknown extended term keyword");
                Err(InvalidTerm::UnknownKeyword(name).into())
            }
        }
    }

    /// `Mega, Secs, Micro`, each a 4-byte integer, folded into whole seconds
    ///
    /// Microseconds contribute only whole seconds.
    fn decode_time(&mut self) -> Result<Term, DecodeError> {
        let mega = self.decode_time_component()?;
        let secs = self.decode_time_component()?;
        let micro = self.decode_time_component()?;

        Ok(Term::Time(
            mega * MICROS_PER_SECOND + secs + micro / MICROS_PER_SECOND,
        ))
    }

    fn decode_time_component(&mut self) -> Result<u64, DecodeError> {
        let tag = self.next_tag()?;
        if tag != magic::INT {
            debug!(tag, "time component is not a 4-byte integer");
            return Err(InvalidTerm::TimeComponent(tag).into());
        }
        Ok(u64::from(self.next_u32()?))
    }

    /// Nil, or a list of `{Key, Value}` pairs moved into a dict in order
    fn decode_dict(&mut self, depth: usize) -> Result<Term, DecodeError> {
        let list = match self.decode_term(depth + 1)? {
            Term::Nil => return Ok(Term::dict()),
            Term::List(list) => list,
            other => {
                debug!(kind = other.kind(), "dict body is not a list");
                return Err(InvalidTerm::DictBody(other.kind()).into());
            }
        };

        let mut dict = Dict::new();
        for entry in list {
            let (key, value) = match entry {
                Term::Tuple(tuple) => tuple.into_pair().ok_or(InvalidTerm::DictEntry)?,
                _ => return Err(InvalidTerm::DictEntry.into()),
            };
            dict.append(key, value)?;
        }
        Ok(Term::Dict(dict))
    }

    /// A binary source followed by an options list
    ///
    /// An options term that is not a list means no options.
    fn decode_regex(&mut self, depth: usize) -> Result<Term, DecodeError> {
        let source = match self.decode_term(depth + 1)? {
            Term::Binary(bytes) => bytes,
            other => {
                debug!(kind = other.kind(), "regex source is not a binary");
                return Err(InvalidTerm::RegexSource(other.kind()).into());
            }
        };

        let mut options = RegexOptions::empty();
        if let Term::List(list) = self.decode_term(depth + 1)? {
            for option in list.iter() {
                options |= regex_option(option)?;
            }
        }

        Ok(Term::Regex(Regex::from_parts(source, options)))
    }
}

/// Mask for one regex option: a flag atom or `{newline, Mode}`
fn regex_option(option: &Term) -> Result<RegexOptions, DecodeError> {
    let mask = match option {
        Term::Atom(name) => option_mask(name),
        Term::Tuple(tuple) if tuple.arity() == 2 => {
            match (tuple.get(0), tuple.get(1)) {
                (Some(key), Some(Term::Atom(mode))) if key.is_atom(NEWLINE_ATOM) => {
                    NewlineMode::from_name(mode).map(NewlineMode::mask)
                }
                _ => None,
            }
        }
        _ => None,
    };

    mask.ok_or_else(|| {
        let shown = format!("{option:?}");
        debug!(option = %shown, "unrecognised regex option");
        InvalidTerm::RegexOption(shown).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::Decoder;

    fn atom(name: &[u8]) -> Vec<u8> {
        let mut bytes = vec![magic::ATOM, 0, name.len() as u8];
        bytes.extend_from_slice(name);
        bytes
    }

    fn int(value: u32) -> Vec<u8> {
        let mut bytes = vec![magic::INT];
        bytes.extend_from_slice(&value.to_be_bytes());
        bytes
    }

    fn extended(arity: u8, keyword: &[u8], body: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = vec![magic::SMALL_TUPLE, arity];
        bytes.extend(atom(b"bert"));
        bytes.extend(atom(keyword));
        for part in body {
            bytes.extend_from_slice(part);
        }
        bytes
    }

    fn list(elements: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = vec![magic::LIST];
        bytes.extend_from_slice(&(elements.len() as u32).to_be_bytes());
        for element in elements {
            bytes.extend_from_slice(element);
        }
        bytes.push(magic::NIL);
        bytes
    }

    fn decode(bytes: &[u8]) -> Result<Term, DecodeError> {
        let mut decoder = Decoder::buffered();
        decoder.feed(bytes).unwrap();
        decoder.decode()
    }

    #[test]
    fn test_booleans_and_nil() {
        assert_eq!(decode(&extended(2, b"true", &[])), Ok(Term::TRUE));
        assert_eq!(decode(&extended(2, b"false", &[])), Ok(Term::FALSE));
        assert_eq!(decode(&extended(2, b"nil", &[])), Ok(Term::Nil));
    }

    #[test]
    fn test_time() {
        let bytes = extended(5, b"time", &[int(1255), int(295_581), int(446_228)]);
        assert_eq!(decode(&bytes), Ok(Term::Time(1_255_295_581)));

        let bytes = extended(5, b"time", &[int(0), int(10), int(3_000_000)]);
        assert_eq!(decode(&bytes), Ok(Term::Time(13)));
    }

    #[test]
    fn test_time_rejects_small_int_component() {
        let bytes = extended(5, b"time", &[int(1), vec![magic::SMALL_INT, 2], int(0)]);
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::Invalid(InvalidTerm::TimeComponent(magic::SMALL_INT)))
        );
    }

    #[test]
    fn test_dict_from_nil_and_list() {
        assert_eq!(decode(&extended(3, b"dict", &[vec![magic::NIL]])), Ok(Term::dict()));

        let pair = |key: &[u8], value: u8| {
            let mut bytes = vec![magic::SMALL_TUPLE, 2];
            bytes.extend(atom(key));
            bytes.extend_from_slice(&[magic::SMALL_INT, value]);
            bytes
        };
        let bytes = extended(3, b"dict", &[list(&[pair(b"a", 1), pair(b"b", 2)])]);
        let term = decode(&bytes).unwrap();
        let dict = term.as_dict().unwrap();
        let keys: Vec<&[u8]> = dict.keys().filter_map(Term::as_atom).collect();
        assert_eq!(keys, vec![&b"a"[..], &b"b"[..]]);
        assert_eq!(dict.get(&Term::atom(b"b").unwrap()), Some(&Term::int(2)));
    }

    #[test]
    fn test_dict_rejects_bad_body_and_entries() {
        assert_eq!(
            decode(&extended(3, b"dict", &[vec![magic::SMALL_INT, 1]])),
            Err(DecodeError::Invalid(InvalidTerm::DictBody("integer")))
        );

        let triple = vec![magic::SMALL_TUPLE, 3, magic::NIL, magic::NIL, magic::NIL];
        assert_eq!(
            decode(&extended(3, b"dict", &[list(&[triple])])),
            Err(DecodeError::Invalid(InvalidTerm::DictEntry))
        );
        assert_eq!(
            decode(&extended(3, b"dict", &[list(&[vec![magic::SMALL_INT, 1]])])),
            Err(DecodeError::Invalid(InvalidTerm::DictEntry))
        );
    }

    #[test]
    fn test_regex_with_options() {
        let mut source = vec![magic::BINARY, 0, 0, 0, 3];
        source.extend_from_slice(b"a+b");
        let mut newline = vec![magic::SMALL_TUPLE, 2];
        newline.extend(atom(b"newline"));
        newline.extend(atom(b"lf"));
        let options = list(&[atom(b"caseless"), atom(b"multiline"), newline]);

        let term = decode(&extended(4, b"regex", &[source, options])).unwrap();
        let regex = term.as_regex().unwrap();
        assert_eq!(regex.source(), b"a+b");
        assert_eq!(
            regex.options(),
            RegexOptions::CASELESS | RegexOptions::MULTILINE | NewlineMode::Lf.mask()
        );
    }

    #[test]
    fn test_regex_non_list_options_means_none() {
        let source = vec![magic::BINARY, 0, 0, 0, 1, b'x'];
        let term = decode(&extended(4, b"regex", &[source, vec![magic::SMALL_INT, 7]])).unwrap();
        assert!(term.as_regex().unwrap().options().is_empty());
    }

    #[test]
    fn test_regex_rejects_bad_source_and_option() {
        let source = vec![magic::STRING, 0, 0, 0, 1, b'x'];
        assert_eq!(
            decode(&extended(4, b"regex", &[source, vec![magic::NIL]])),
            Err(DecodeError::Invalid(InvalidTerm::RegexSource("string")))
        );

        let source = vec![magic::BINARY, 0, 0, 0, 1, b'x'];
        let result = decode(&extended(4, b"regex", &[source, list(&[atom(b"global")])]));
        assert!(matches!(
            result,
            Err(DecodeError::Invalid(InvalidTerm::RegexOption(_)))
        ));
    }

    #[test]
    fn test_keyword_must_be_known_atom() {
        let mut bytes = vec![magic::SMALL_TUPLE, 2];
        bytes.extend(atom(b"bert"));
        bytes.extend_from_slice(&[magic::SMALL_INT, 1]);
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::Invalid(InvalidTerm::KeywordNotAtom("integer")))
        );

        assert_eq!(
            decode(&extended(2, b"set", &[])),
            Err(DecodeError::Invalid(InvalidTerm::UnknownKeyword("set".to_string())))
        );
    }
}
