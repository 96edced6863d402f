//! Error types shared between client and server.
//!
//! The `QuoteError` enum unifies I/O, serialization and lock failures with the
//! domain errors of the quotation service, so every crate in the workspace can propagate
//! a single error type with `?`.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

use crate::quote::QuoteId;
use crate::subscription::SubscriptionId;

/// Unified error type shared by client and server.
#[derive(Error, Debug)]
pub enum QuoteError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Error while parsing a quote corpus into `Quote` values.
    #[error("Parse corpus error: {0}")]
    ParseCorpus(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),

    /// A requested quote id is not present in the store.
    #[error("Quote not found: {0}")]
    QuoteNotFound(QuoteId),

    /// The subscription is unknown or no longer active.
    #[error("Invalid subscription: {0}")]
    InvalidSubscription(SubscriptionId),

    /// A streaming session is already bound to the subscription.
    #[error("Stream already running for subscription: {0}")]
    StreamAlreadyRunning(SubscriptionId),

    /// A random draw was requested from an empty corpus.
    #[error("Quote store is empty")]
    EmptyStore,

    /// The peer rejected a request or failed internally; carries its message.
    #[error("Remote error: {0}")]
    Remote(String),

    /// The peer answered with a reply that does not fit the request.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl<T> From<PoisonError<T>> for QuoteError {
    fn from(err: PoisonError<T>) -> Self {
        QuoteError::MutexLock(err.to_string())
    }
}
