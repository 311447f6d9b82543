//! Entities Layer: BERT Data
//!
//! This crate provides the term model shared by the BERT decoder and encoder.
//! Every value that can travel over the wire is a [`Term`], a closed tagged union
//! whose composite variants own their children outright.
//!
//! ## Overview
//!
//! The `entities_bert_data` crate is the innermost layer of the codec workspace.
//! It performs no I/O and has no dependencies on other crates in the workspace,
//! so both the decoding and encoding infrastructure build on it.
//!
//! ## Modules
//!
//! - **[`term`](term/index.html)**: The `Term` enum, its constructors and
//!   accessors, the `Regex` descriptor and the `TermError` type.
//!
//! - **[`tuple`](tuple/index.html)**: Fixed-arity tuples whose slots may be
//!   transiently empty while a tuple is being filled or taken apart.
//!
//! - **[`list`](list/index.html)**: Ordered, appendable sequences of terms.
//!
//! - **[`dict`](dict/index.html)**: Insertion-ordered key/value dictionaries
//!   where lookup returns the first matching entry.
//!
//! - **[`regex_options`](regex_options/index.html)**: The option-name to bitmask
//!   table consumed when decoding `{bert, regex, ...}` terms.
//!
//! ## Usage
//!
//! ```rust
//! use entities_bert_data::{Dict, List, Term};
//!
//! let mut list = List::new();
//! list.push(Term::int(1)).unwrap();
//! list.push(Term::atom(b"ok").unwrap()).unwrap();
//!
//! let mut dict = Dict::new();
//! dict.append(Term::atom(b"items").unwrap(), Term::List(list)).unwrap();
//!
//! let term = Term::Dict(dict);
//! assert!(term.as_dict().unwrap().get(&Term::atom(b"items").unwrap()).is_some());
//! ```
//!
//! ## See Also
//!
//! - [`infrastructure_bert_format`](../infrastructure_bert_format/index.html): wire
//!   decoding and encoding of these terms

pub mod term;
pub mod tuple;
pub mod list;
pub mod dict;
pub mod regex_options;

pub use term::{Regex, Term, TermError};
pub use tuple::Tuple;
pub use list::List;
pub use dict::Dict;
pub use regex_options::{NewlineMode, RegexOptions};
