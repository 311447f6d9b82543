//! List Module
//!
//! Provides the ordered, appendable list container.

use crate::term::{Term, TermError};

/// Ordered sequence of owned terms
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    items: Vec<Term>,
}

impl List {
    /// Create an empty list
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append a term to the end of the list
    ///
    /// On allocation failure the term is dropped and `TermError::OutOfMemory`
    /// is returned; the list is left unchanged.
    pub fn push(&mut self, term: Term) -> Result<(), TermError> {
        self.items
            .try_reserve(1)
            .map_err(|_| TermError::OutOfMemory)?;
        self.items.push(term);
        Ok(())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no elements
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First element
    pub fn first(&self) -> Option<&Term> {
        self.items.first()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&Term> {
        self.items.get(index)
    }

    /// Iterate over elements in order
    pub fn iter(&self) -> std::slice::Iter<'_, Term> {
        self.items.iter()
    }
}

impl FromIterator<Term> for List {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for List {
    type Item = Term;
    type IntoIter = std::vec::IntoIter<Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Term;
    type IntoIter = std::slice::Iter<'a, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_order() {
        let mut list = List::new();
        assert!(list.is_empty());
        for i in 0..5 {
            list.push(Term::int(i)).unwrap();
        }
        assert_eq!(list.len(), 5);
        let values: Vec<i32> = list.iter().filter_map(Term::as_int).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
        assert_eq!(list.first(), Some(&Term::int(0)));
        assert_eq!(list.get(4), Some(&Term::int(4)));
        assert_eq!(list.get(5), None);
    }

    #[test]
    fn test_into_iter_moves_children() {
        let list: List = vec![Term::atom(b"a").unwrap(), Term::Nil].into_iter().collect();
        let moved: Vec<Term> = list.into_iter().collect();
        assert_eq!(moved.len(), 2);
        assert!(moved[0].is_atom(b"a"));
    }
}
