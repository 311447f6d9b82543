//! Tuple Module
//!
//! Provides the fixed-arity tuple container.
//!
//! A tuple's arity is fixed when it is created. Each slot holds an owned term or
//! nothing; empty slots exist only while a tuple is being filled in or after a
//! child has been moved out with [`Tuple::take`].

use crate::term::{Term, TermError};

/// Fixed-arity tuple of owned terms
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tuple {
    slots: Vec<Option<Term>>,
}

impl Tuple {
    /// Create a tuple with `arity` empty slots
    ///
    /// The slot array is reserved up front, so an arity that cannot be allocated
    /// fails with `TermError::OutOfMemory` instead of aborting.
    pub fn with_arity(arity: usize) -> Result<Self, TermError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(arity)
            .map_err(|_| TermError::OutOfMemory)?;
        slots.resize_with(arity, || None);
        Ok(Self { slots })
    }

    /// Create a tuple whose slots are all filled from `elements`
    pub fn from_elements(elements: Vec<Term>) -> Self {
        Self {
            slots: elements.into_iter().map(Some).collect(),
        }
    }

    /// Number of slots
    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    /// Whether the tuple has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Term in slot `index`, or `None` if the slot is empty or out of range
    pub fn get(&self, index: usize) -> Option<&Term> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Fill slot `index`, returning whatever it held before
    pub fn set(&mut self, index: usize, term: Term) -> Result<Option<Term>, TermError> {
        let arity = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(TermError::SlotOutOfRange { index, arity })?;
        Ok(slot.replace(term))
    }

    /// Move the term out of slot `index`, leaving the slot empty
    pub fn take(&mut self, index: usize) -> Option<Term> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Whether every slot holds a term
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Iterate over slots in order
    pub fn iter(&self) -> impl Iterator<Item = Option<&Term>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// Split a complete 2-tuple into its two children
    ///
    /// Both children are moved out; the tuple shell is consumed. Returns `None`
    /// if the arity is not 2 or a slot is empty.
    pub fn into_pair(self) -> Option<(Term, Term)> {
        let mut slots = self.slots.into_iter();
        match (slots.next(), slots.next(), slots.next()) {
            (Some(Some(first)), Some(Some(second)), None) => Some((first, second)),
            _ => None,
        }
    }

    /// Move every child out, or `None` if any slot is empty
    pub fn into_elements(self) -> Option<Vec<Term>> {
        self.slots.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_arity_zero() {
        let tuple = Tuple::with_arity(0).unwrap();
        assert_eq!(tuple.arity(), 0);
        assert!(tuple.is_empty());
        assert!(tuple.is_complete());
    }

    #[test]
    fn test_set_and_get() {
        let mut tuple = Tuple::with_arity(2).unwrap();
        assert_eq!(tuple.set(0, Term::int(1)).unwrap(), None);
        assert!(!tuple.is_complete());
        tuple.set(1, Term::int(2)).unwrap();
        assert!(tuple.is_complete());
        assert_eq!(tuple.get(1), Some(&Term::int(2)));

        let previous = tuple.set(1, Term::int(3)).unwrap();
        assert_eq!(previous, Some(Term::int(2)));
    }

    #[test]
    fn test_set_out_of_range() {
        let mut tuple = Tuple::with_arity(1).unwrap();
        let result = tuple.set(1, Term::Nil);
        assert_eq!(result, Err(TermError::SlotOutOfRange { index: 1, arity: 1 }));
    }

    #[test]
    fn test_take_empties_slot() {
        let mut tuple = Tuple::from_elements(vec![Term::int(1), Term::int(2)]);
        assert_eq!(tuple.take(0), Some(Term::int(1)));
        assert_eq!(tuple.get(0), None);
        assert_eq!(tuple.take(0), None);
        assert_eq!(tuple.arity(), 2);
    }

    #[test]
    fn test_into_pair() {
        let tuple = Tuple::from_elements(vec![Term::atom(b"a").unwrap(), Term::int(1)]);
        let (key, value) = tuple.into_pair().unwrap();
        assert!(key.is_atom(b"a"));
        assert_eq!(value, Term::int(1));

        let triple = Tuple::from_elements(vec![Term::Nil, Term::Nil, Term::Nil]);
        assert!(triple.into_pair().is_none());

        let mut holed = Tuple::from_elements(vec![Term::Nil, Term::Nil]);
        holed.take(1);
        assert!(holed.into_pair().is_none());
    }

    #[test]
    fn test_into_elements() {
        let tuple = Tuple::from_elements(vec![Term::int(1), Term::Nil]);
        assert_eq!(tuple.into_elements(), Some(vec![Term::int(1), Term::Nil]));
        assert_eq!(Tuple::with_arity(1).unwrap().into_elements(), None);
    }
}
