//! Dict Module
//!
//! Provides the insertion-ordered dictionary built from `{bert, dict, Pairs}` terms.
//!
//! Entries are kept in the order they were appended. Keys are not required to be
//! unique; lookups scan from the front and return the first match.

use crate::term::{Term, TermError};

/// Insertion-ordered dictionary of owned key/value terms
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dict {
    entries: Vec<(Term, Term)>,
}

impl Dict {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a key/value entry, taking ownership of both terms
    pub fn append(&mut self, key: Term, value: Term) -> Result<(), TermError> {
        self.entries
            .try_reserve(1)
            .map_err(|_| TermError::OutOfMemory)?;
        self.entries.push((key, value));
        Ok(())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the first entry whose key equals `key`
    pub fn get(&self, key: &Term) -> Option<&Term> {
        self.find(key).map(|(_, v)| v)
    }

    /// First entry whose key equals `key`
    pub fn find(&self, key: &Term) -> Option<(&Term, &Term)> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(k, v)| (k, v))
    }

    /// Whether any entry has key `key`
    pub fn contains_key(&self, key: &Term) -> bool {
        self.find(key).is_some()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &Term> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &Term> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Term, &Term)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl IntoIterator for Dict {
    type Item = (Term, Term);
    type IntoIter = std::vec::IntoIter<(Term, Term)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str) -> Term {
        Term::atom(name.as_bytes()).unwrap()
    }

    #[test]
    fn test_append_and_get() {
        let mut dict = Dict::new();
        assert!(dict.is_empty());
        dict.append(atom("a"), Term::int(1)).unwrap();
        dict.append(atom("b"), Term::int(2)).unwrap();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(&atom("a")), Some(&Term::int(1)));
        assert_eq!(dict.get(&atom("b")), Some(&Term::int(2)));
        assert_eq!(dict.get(&atom("c")), None);
        assert!(dict.contains_key(&atom("b")));
    }

    #[test]
    fn test_duplicate_keys_first_match_wins() {
        let mut dict = Dict::new();
        dict.append(atom("k"), Term::int(1)).unwrap();
        dict.append(atom("k"), Term::int(2)).unwrap();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(&atom("k")), Some(&Term::int(1)));
    }

    #[test]
    fn test_insertion_order() {
        let mut dict = Dict::new();
        dict.append(atom("z"), Term::Nil).unwrap();
        dict.append(atom("a"), Term::Nil).unwrap();
        dict.append(atom("m"), Term::Nil).unwrap();

        let keys: Vec<&[u8]> = dict.keys().filter_map(Term::as_atom).collect();
        assert_eq!(keys, vec![&b"z"[..], &b"a"[..], &b"m"[..]]);
    }

    #[test]
    fn test_non_atom_keys() {
        let mut dict = Dict::new();
        dict.append(Term::int(1), atom("one")).unwrap();
        dict.append(Term::binary(b"two").unwrap(), atom("two")).unwrap();

        assert_eq!(dict.get(&Term::int(1)), Some(&atom("one")));
        assert_eq!(dict.get(&Term::binary(b"two").unwrap()), Some(&atom("two")));
    }
}
