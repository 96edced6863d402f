//! Quotes TCP server.
//!
//! Loads the quote corpus once and serves it to concurrent clients over a line-delimited
//! JSON protocol. Internally, it wires together:
//!
//! - `LocalProvider` — the immutable `QuoteStore` plus its `SearchEngine`.
//! - `ProtocolGateway` — dispatches every operation; owns the `SubscriptionRegistry`, the
//!   `StreamingEngine` and the client liveness monitor.
//! - `QuoteReceiver` — accepts TCP connections, one thread per connection.
//! - Reaper thread — once per `reap_interval`, disconnects clients whose keep-alive timed
//!   out and purges cancelled subscriptions.
//!
//! Any per-connection or per-session failure is logged; it never stops the server or
//! affects other clients.
#![warn(missing_docs)]
use crate::args::Args;
use clap::Parser;
use log::{debug, info};
use quotes_common::{QuoteProvider, Result};
use quotes_server::config::ServerConfig;
use quotes_server::gateway::ProtocolGateway;
use quotes_server::provider::LocalProvider;
use quotes_server::receiver::QuoteReceiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod args;

fn main() -> Result<()> {
    init_logger();
    let config = ServerConfig::from(Args::parse());

    let quotes = quotes_server::load_corpus(config.corpus.as_deref())?;
    info!("Loaded {} quotes", quotes.len());
    let provider: Arc<dyn QuoteProvider> = Arc::new(LocalProvider::from_quotes(quotes)?);

    let gateway = Arc::new(ProtocolGateway::new(
        provider,
        config.stream.clone(),
        config.client_timeout,
    ));
    start_reaper(Arc::clone(&gateway), config.reap_interval);

    let receiver = QuoteReceiver::new(&config.bind_addr, config.write_timeout)?;
    receiver.serve(gateway)
}

fn start_reaper(gateway: Arc<ProtocolGateway>, check_interval: Duration) {
    thread::spawn(move || {
        loop {
            thread::sleep(check_interval);
            let idle = gateway.reap_idle_clients();
            let purged = gateway.purge_cancelled();
            if !idle.is_empty() || purged > 0 {
                debug!(
                    "Reaper: {} idle client(s), {} cancelled subscription(s) purged",
                    idle.len(),
                    purged
                );
            }
        }
    });
}

fn init_logger() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
