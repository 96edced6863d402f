//! Quotes server library.
//!
//! Serves a read-only quote corpus to many concurrent clients, either request/response
//! (all quotes, by id, search) or as subscribed streams of random quotes:
//!
//! - `model` — `QuoteStore`, `SearchEngine`, `SubscriptionRegistry`, `ClientMonitor`.
//! - `provider` — `LocalProvider`, the in-memory `QuoteProvider`.
//! - `session` — `StreamingEngine` and the per-subscription emission loop.
//! - `gateway` — `ProtocolGateway`, dispatch of every logical operation.
//! - `receiver` — `QuoteReceiver`, the line-delimited JSON TCP transport.
//! - `config` — `ServerConfig`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use quotes_common::corpus::QuoteParser;
use quotes_common::{Quote, Result};

pub mod config;
pub mod gateway;
pub mod model;
pub mod provider;
pub mod receiver;
pub mod session;

/// Corpus embedded at compile time, used when no file is configured.
const DEFAULT_CORPUS: &str = include_str!("berra.txt");

/// Parse the embedded corpus.
pub fn default_corpus() -> Result<Vec<Quote>> {
    Quote::parse_from_file(DEFAULT_CORPUS.as_bytes())
}

/// Load the corpus from `path`, or the embedded one when `path` is `None`.
pub fn load_corpus(path: Option<&Path>) -> Result<Vec<Quote>> {
    match path {
        Some(path) => {
            let file = File::open(path)?;
            Quote::parse_from_file(BufReader::new(file))
        }
        None => default_corpus(),
    }
}
