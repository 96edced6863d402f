//! Immutable in-memory quote corpus.
//!
//! The store is built once from the loader's output and shared through `Arc`; it is
//! never mutated afterwards, so concurrent readers need no locking.

use std::collections::HashMap;

use quotes_common::{Quote, QuoteError, QuoteId};
use rand::seq::IndexedRandom;

/// Ordered, read-only collection of quotes with an id index.
#[derive(Debug)]
pub struct QuoteStore {
    quotes: Vec<Quote>,
    index: HashMap<QuoteId, usize>,
}

impl QuoteStore {
    /// Build a store, keeping corpus order.
    ///
    /// Fails with `QuoteError::Format` on a duplicate id or an empty text.
    pub fn new(quotes: Vec<Quote>) -> Result<Self, QuoteError> {
        let mut index = HashMap::with_capacity(quotes.len());
        for (pos, quote) in quotes.iter().enumerate() {
            if quote.text.trim().is_empty() {
                return Err(QuoteError::Format(format!("quote {} has empty text", quote.id)));
            }
            if index.insert(quote.id, pos).is_some() {
                return Err(QuoteError::Format(format!("duplicate quote id {}", quote.id)));
            }
        }
        Ok(Self { quotes, index })
    }

    /// Every quote, in corpus order.
    pub fn all(&self) -> &[Quote] {
        &self.quotes
    }

    /// Number of quotes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// `true` when the corpus has no quotes.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Look up a single quote.
    pub fn get(&self, id: QuoteId) -> Option<&Quote> {
        self.index.get(&id).map(|&pos| &self.quotes[pos])
    }

    /// One quote per id, in the requested order.
    ///
    /// The first absent id aborts the whole call with `QuoteNotFound`.
    pub fn quotes(&self, ids: &[QuoteId]) -> Result<Vec<Quote>, QuoteError> {
        ids.iter()
            .map(|&id| self.get(id).cloned().ok_or(QuoteError::QuoteNotFound(id)))
            .collect()
    }

    /// A uniformly random quote, or `None` for an empty store.
    pub fn random(&self) -> Option<&Quote> {
        self.quotes.choose(&mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berra() -> QuoteStore {
        QuoteStore::new(vec![
            Quote::new(1, "A man's got to believe in something"),
            Quote::new(2, "It ain't over till it's over"),
            Quote::new(3, "I never said most of the things I said"),
        ])
        .unwrap()
    }

    #[test]
    fn keeps_corpus_order() {
        let ids: Vec<QuoteId> = berra().all().iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(berra().len(), 3);
    }

    #[test]
    fn quotes_preserve_requested_order() {
        let quotes = berra().quotes(&[2, 1, 2]).unwrap();
        let ids: Vec<QuoteId> = quotes.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![2, 1, 2]);
    }

    #[test]
    fn first_missing_id_fails_the_whole_call() {
        let err = berra().quotes(&[2, 9, 1, 7]).unwrap_err();
        assert!(matches!(err, QuoteError::QuoteNotFound(9)));
    }

    #[test]
    fn empty_request_is_empty_result() {
        assert!(berra().quotes(&[]).unwrap().is_empty());
    }

    #[test]
    fn rejects_duplicate_ids_and_blank_text() {
        let dup = QuoteStore::new(vec![Quote::new(1, "a"), Quote::new(1, "b")]);
        assert!(matches!(dup, Err(QuoteError::Format(_))));
        let blank = QuoteStore::new(vec![Quote::new(1, " ")]);
        assert!(matches!(blank, Err(QuoteError::Format(_))));
    }

    #[test]
    fn random_draws_come_from_the_store() {
        let store = berra();
        for _ in 0..50 {
            let quote = store.random().unwrap();
            assert_eq!(store.get(quote.id), Some(quote));
        }
        assert!(QuoteStore::new(Vec::new()).unwrap().random().is_none());
    }
}
