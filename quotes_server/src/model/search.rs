//! Case-insensitive substring search over the quote store.

use std::collections::HashSet;
use std::sync::Arc;

use quotes_common::{Quote, QuoteId};

use crate::model::store::QuoteStore;

/// Read-only search over a shared `QuoteStore`.
///
/// Lower-cased texts are computed once at construction; queries never allocate per quote.
#[derive(Debug)]
pub struct SearchEngine {
    store: Arc<QuoteStore>,
    folded: Vec<String>,
}

impl SearchEngine {
    pub fn new(store: Arc<QuoteStore>) -> Self {
        let folded = store.all().iter().map(|q| q.text.to_lowercase()).collect();
        Self { store, folded }
    }

    /// Quotes whose text contains `query`, ignoring case, in store order.
    ///
    /// An empty query matches nothing.
    pub fn search(&self, query: &str) -> Vec<Quote> {
        self.matching(query).cloned().collect()
    }

    /// Union of `search(q)` over `queries`, each quote once, in first-match order.
    pub fn search_all(&self, queries: &[String]) -> Vec<Quote> {
        let mut seen: HashSet<QuoteId> = HashSet::new();
        queries
            .iter()
            .flat_map(|query| self.matching(query))
            .filter(|quote| seen.insert(quote.id))
            .cloned()
            .collect()
    }

    fn matching(&self, query: &str) -> impl Iterator<Item = &Quote> {
        let needle = query.to_lowercase();
        self.store
            .all()
            .iter()
            .zip(self.folded.iter())
            .filter(move |(_, text)| !needle.is_empty() && text.contains(needle.as_str()))
            .map(|(quote, _)| quote)
    }
}
