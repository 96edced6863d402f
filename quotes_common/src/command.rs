//! Shared protocol messages used by client and server.
//!
//! Every message is one JSON object terminated by `\n`. Requests are tagged by `"op"`
//! with the logical operation name, responses by `"reply"`. A `getQuoteSubscribed`
//! request turns its connection into a stream: the server answers `streamStarted`,
//! then one `quote` per emission, then `streamEnded`.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::error::QuoteError;
use crate::quote::{Quote, QuoteId};
use crate::subscription::{CancelOutcome, ClientId, CorrelationToken, SubscriptionId};

/// Search argument: either a single query or an ordered list of queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchQuery {
    /// `search(query)`.
    One(String),
    /// `search(queries)`; results are the deduplicated union.
    Many(Vec<String>),
}

/// Request sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Request {
    /// Register the client and obtain a correlation token.
    Connect {
        /// Transport-level client handle.
        client_id: ClientId,
    },
    /// Create a subscription for the client.
    Subscribe {
        /// Transport-level client handle.
        client_id: ClientId,
    },
    /// Cancel a subscription.
    Cancel {
        /// Target subscription.
        subscription_id: SubscriptionId,
    },
    /// Fetch the whole corpus.
    GetAllQuotes,
    /// Fetch the corpus size.
    GetNumberOfQuotes,
    /// Fetch quotes by id, in the requested order.
    GetQuotes {
        /// Requested ids.
        ids: Vec<QuoteId>,
    },
    /// Start streaming random quotes for an active subscription.
    GetQuoteSubscribed {
        /// Target subscription.
        subscription_id: SubscriptionId,
    },
    /// Draw one random quote without a subscription.
    GetQuoteUnsubscribed,
    /// Case-insensitive substring search.
    Search {
        /// One query or several.
        query: SearchQuery,
    },
    /// Keep-alive for the client's liveness timer.
    Ping {
        /// Transport-level client handle.
        client_id: ClientId,
    },
}

impl Request {
    /// Logical operation name, as used on the wire (e.g. `getQuoteSubscribed`).
    pub fn operation(&self) -> &'static str {
        self.into()
    }
}

/// Typed error carried by `Response::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WireError {
    /// See `QuoteError::QuoteNotFound`.
    QuoteNotFound {
        /// First absent id.
        id: QuoteId,
    },
    /// See `QuoteError::InvalidSubscription`.
    InvalidSubscription {
        /// Offending subscription.
        subscription_id: SubscriptionId,
    },
    /// See `QuoteError::StreamAlreadyRunning`.
    StreamAlreadyRunning {
        /// Subscription that already has a live stream.
        subscription_id: SubscriptionId,
    },
    /// See `QuoteError::EmptyStore`.
    EmptyStore,
    /// The request line could not be decoded.
    BadRequest {
        /// Decoder message.
        message: String,
    },
    /// Any other server-side failure.
    Internal {
        /// Error message.
        message: String,
    },
}

impl From<&QuoteError> for WireError {
    fn from(err: &QuoteError) -> Self {
        match err {
            QuoteError::QuoteNotFound(id) => WireError::QuoteNotFound { id: *id },
            QuoteError::InvalidSubscription(id) => WireError::InvalidSubscription {
                subscription_id: *id,
            },
            QuoteError::StreamAlreadyRunning(id) => WireError::StreamAlreadyRunning {
                subscription_id: *id,
            },
            QuoteError::EmptyStore => WireError::EmptyStore,
            QuoteError::SerdeJson(e) => WireError::BadRequest {
                message: e.to_string(),
            },
            QuoteError::Format(message) => WireError::BadRequest {
                message: message.clone(),
            },
            other => WireError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl From<WireError> for QuoteError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::QuoteNotFound { id } => QuoteError::QuoteNotFound(id),
            WireError::InvalidSubscription { subscription_id } => {
                QuoteError::InvalidSubscription(subscription_id)
            }
            WireError::StreamAlreadyRunning { subscription_id } => {
                QuoteError::StreamAlreadyRunning(subscription_id)
            }
            WireError::EmptyStore => QuoteError::EmptyStore,
            WireError::BadRequest { message } | WireError::Internal { message } => {
                QuoteError::Remote(message)
            }
        }
    }
}

/// Response sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    /// Answer to `connect`.
    #[serde(rename = "serverResponse")]
    Connected {
        /// Correlation token for subsequent calls.
        token: CorrelationToken,
    },
    /// Answer to `subscribe`.
    Subscribed {
        /// Newly created subscription.
        subscription_id: SubscriptionId,
    },
    /// `cancel` performed the terminal transition.
    CancelConfirmed {
        /// Cancelled subscription.
        subscription_id: SubscriptionId,
    },
    /// `cancel` found the subscription unknown or already terminal.
    CancelUnconfirmed {
        /// Subscription named in the request.
        subscription_id: SubscriptionId,
    },
    /// Ordered list of quotes.
    Quotes {
        /// Quotes in result order.
        quotes: Vec<Quote>,
    },
    /// Corpus size.
    NumberOfQuotes {
        /// Number of quotes.
        count: usize,
    },
    /// A single quote: the unsubscribed draw, or one stream emission.
    Quote {
        /// The quote.
        quote: Quote,
    },
    /// The connection is now a stream for this subscription.
    StreamStarted {
        /// Streamed subscription.
        subscription_id: SubscriptionId,
    },
    /// The stream finished; no more quotes follow.
    StreamEnded {
        /// Streamed subscription.
        subscription_id: SubscriptionId,
    },
    /// Answer to `ping`.
    Pong,
    /// The request failed.
    Error {
        /// Failure details.
        error: WireError,
    },
}

impl Response {
    /// Render a cancel outcome for `subscription_id`.
    pub fn cancel(subscription_id: SubscriptionId, outcome: CancelOutcome) -> Self {
        match outcome {
            CancelOutcome::Confirmed => Response::CancelConfirmed { subscription_id },
            CancelOutcome::Unconfirmed => Response::CancelUnconfirmed { subscription_id },
        }
    }

    /// Render an error.
    pub fn error(err: &QuoteError) -> Self {
        Response::Error { error: err.into() }
    }
}

/// Encode a message as one JSON line, including the trailing `\n`.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, QuoteError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one JSON line (surrounding whitespace is ignored).
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, QuoteError> {
    Ok(serde_json::from_str(line.trim())?)
}
