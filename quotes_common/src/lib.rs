//!
//! Common types and utilities shared by the quotes server and client.
//!
//! This crate aggregates:
//! - `error` — unified error type `QuoteError` used across the workspace.
//! - `result` — handy `Result<T, QuoteError>` alias.
//! - `quote` — the `Quote` value and its id type.
//! - `subscription` — subscription ids, client handles, lifecycle states and cancel outcomes.
//! - `command` — line-delimited JSON requests and responses exchanged over TCP.
//! - `corpus` — parsing of quote corpus files.
//! - `provider` — the `QuoteProvider` retrieval interface.
//! - `net` — networking constants and small helpers.
#![warn(missing_docs)]
pub mod command;
pub mod corpus;
pub mod error;
pub mod net;
pub mod provider;
pub mod quote;
pub mod result;
pub mod subscription;

pub use command::{Request, Response};
pub use error::QuoteError;
pub use provider::QuoteProvider;
pub use quote::{Quote, QuoteId};
pub use result::Result;
pub use subscription::{CancelOutcome, ClientId, CorrelationToken, SubscriptionId, SubscriptionState};
