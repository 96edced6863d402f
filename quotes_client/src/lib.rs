//! Quotes client library: the TCP connection to a quotes server and a `QuoteProvider`
//! backed by it.
pub mod connection;
pub mod remote;
