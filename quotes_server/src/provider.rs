//! In-memory `QuoteProvider` backed by the loaded corpus.

use std::sync::Arc;

use quotes_common::{Quote, QuoteError, QuoteId, QuoteProvider, Result};

use crate::model::search::SearchEngine;
use crate::model::store::QuoteStore;

/// Serves every retrieval operation straight from the `QuoteStore`.
pub struct LocalProvider {
    store: Arc<QuoteStore>,
    search: SearchEngine,
}

impl LocalProvider {
    pub fn new(store: Arc<QuoteStore>) -> Self {
        let search = SearchEngine::new(Arc::clone(&store));
        Self { store, search }
    }

    /// Build a provider from a freshly loaded corpus.
    pub fn from_quotes(quotes: Vec<Quote>) -> Result<Self> {
        Ok(Self::new(Arc::new(QuoteStore::new(quotes)?)))
    }
}

impl QuoteProvider for LocalProvider {
    fn all_quotes(&self) -> Result<Vec<Quote>> {
        Ok(self.store.all().to_vec())
    }

    fn number_of_quotes(&self) -> Result<usize> {
        Ok(self.store.len())
    }

    fn quotes(&self, ids: &[QuoteId]) -> Result<Vec<Quote>> {
        self.store.quotes(ids)
    }

    fn random_quote(&self) -> Result<Quote> {
        self.store.random().cloned().ok_or(QuoteError::EmptyStore)
    }

    fn search(&self, query: &str) -> Result<Vec<Quote>> {
        Ok(self.search.search(query))
    }

    fn search_all(&self, queries: &[String]) -> Result<Vec<Quote>> {
        Ok(self.search.search_all(queries))
    }
}
