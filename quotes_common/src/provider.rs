//! Retrieval interface implemented by every quote source.
//!
//! The server serves quotes from memory, the client reaches the same operations over
//! TCP; the gateway and the streaming sessions only ever see this trait.

use crate::quote::{Quote, QuoteId};
use crate::result::Result;

/// A source of quotes supporting lookup, random draws and text search.
pub trait QuoteProvider: Send + Sync {
    /// The full corpus in corpus order.
    fn all_quotes(&self) -> Result<Vec<Quote>>;

    /// Number of quotes in the corpus.
    fn number_of_quotes(&self) -> Result<usize>;

    /// One quote per requested id, in request order.
    ///
    /// Fails with `QuoteNotFound` on the first absent id; no partial result.
    fn quotes(&self, ids: &[QuoteId]) -> Result<Vec<Quote>>;

    /// One quote drawn uniformly at random. Fails with `EmptyStore` on an empty corpus.
    fn random_quote(&self) -> Result<Quote>;

    /// Quotes containing `query` case-insensitively, in corpus order.
    /// An empty query matches nothing.
    fn search(&self, query: &str) -> Result<Vec<Quote>>;

    /// Deduplicated union of `search(q)` for each query, first-occurrence order.
    fn search_all(&self, queries: &[String]) -> Result<Vec<Quote>>;
}
