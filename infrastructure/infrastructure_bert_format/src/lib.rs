//! Infrastructure Layer: BERT Format
//!
//! Provides the BERT wire format codec: a streaming, resumable decoder and its
//! mirror-image encoder.
//!
//! ## Overview
//!
//! BERT is the Erlang external term format plus a set of extended types carried
//! on tuples whose first element is the atom `bert`. This crate turns byte
//! streams into [`Term`](entities_bert_data::Term) trees and back.
//!
//! The decoder reads from any [`ByteSource`]: a live `std::io::Read` wrapped in
//! a [`StreamSource`], or a [`ChunkBuffer`](infrastructure_chunk_buffer::ChunkBuffer)
//! the caller stages bytes into. Bytes may arrive in fragments of any size; an
//! incomplete term yields `DecodeError::Short` and is re-parsed from its first
//! byte on the next call.
//!
//! ## Modules
//!
//! - **[`magic`](magic/index.html)**: Wire tag bytes
//!
//! - **[`source`](source/index.html)**: The `ByteSource` trait and `StreamSource`
//!
//! - **[`decoding`](decoding/index.html)**: `Decoder`, `DecoderConfig` and the
//!   decode error types
//!
//! - **[`encoding`](encoding/index.html)**: `Encoder` and the encode error types
//!
//! - **[`size_calculation`](size_calculation/index.html)**: Encoded sizes
//!   without encoding
//!
//! ## Usage
//!
//! ```rust
//! use infrastructure_bert_format::{decode_from_slice, encode_to_vec};
//! use entities_bert_data::{Dict, Term};
//!
//! let mut dict = Dict::new();
//! dict.append(Term::atom(b"answer").unwrap(), Term::int(42)).unwrap();
//! let term = Term::Dict(dict);
//!
//! let bytes = encode_to_vec(&term).unwrap();
//! assert_eq!(decode_from_slice(&bytes).unwrap(), term);
//! ```
//!
//! ## See Also
//!
//! - [`entities_bert_data`](../entities_bert_data/index.html): The term model
//! - [`infrastructure_chunk_buffer`](../infrastructure_chunk_buffer/index.html):
//!   Staging buffer for fragmentary input

pub mod magic;
pub mod source;
pub mod decoding;
mod extended;
mod window;
pub mod encoding;
pub mod size_calculation;

pub use decoding::{DecodeError, Decoder, DecoderConfig, InvalidTerm};
pub use encoding::{EncodeError, Encoder, InvalidEncoding};
pub use size_calculation::{encoded_message_size, encoded_size};
pub use source::{ByteSource, StreamSource};
pub use window::SHORT_WINDOW_SIZE;

use entities_bert_data::Term;

/// Encode one term, with the leading version byte, into a new vector
pub fn encode_to_vec(term: &Term) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    encoding::reserve(&mut bytes, encoded_message_size(term)?)?;

    let mut encoder = Encoder::new(bytes);
    encoder.encode_message(term)?;
    Ok(encoder.into_inner())
}

/// Decode the first term in `bytes`
///
/// Incomplete input is reported as `DecodeError::Short`; bytes after the first
/// term are ignored.
pub fn decode_from_slice(bytes: &[u8]) -> Result<Term, DecodeError> {
    Decoder::new(StreamSource::new(bytes)).decode()
}
