//! Magic Module
//!
//! Wire tag bytes of the BERT format. These are the Erlang external term format
//! tags the codec understands; every other tag is rejected.

/// Leading version byte, optionally present at the start of a message
pub const VERSION: u8 = 131;

pub const SMALL_INT: u8 = 97;
pub const INT: u8 = 98;
pub const FLOAT: u8 = 99;
pub const ATOM: u8 = 100;
pub const SMALL_TUPLE: u8 = 104;
pub const LARGE_TUPLE: u8 = 105;
/// Nil, also written as the list terminator
pub const NIL: u8 = 106;
pub const STRING: u8 = 107;
pub const LIST: u8 = 108;
pub const BINARY: u8 = 109;
pub const SMALL_BIGNUM: u8 = 110;
pub const LARGE_BIGNUM: u8 = 111;

/// Length of the text payload following a `FLOAT` tag
pub const FLOAT_LEN: usize = 31;

/// First element of a tuple that carries an extended term
pub const BERT_ATOM: &[u8] = b"bert";

/// Largest arity the encoder will write with a `LARGE_TUPLE` tag
pub const MAX_TUPLE_ARITY: usize = 0x00FF_FFFF;
