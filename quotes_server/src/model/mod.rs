//! Domain models for the quotes server.
//!
//! - `store` — immutable `QuoteStore` loaded once from the corpus.
//! - `search` — case-insensitive `SearchEngine` over the store.
//! - `registry` — `SubscriptionRegistry`, the lifecycle authority for subscriptions.
//! - `liveness` — `ClientMonitor`, keep-alive tracking for connected clients.

pub mod liveness;
pub mod registry;
pub mod search;
pub mod store;
