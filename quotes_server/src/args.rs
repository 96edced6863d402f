//! Command-line arguments for the quotes server.
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use quotes_common::net::{ACK_TIMEOUT_MS, CLIENT_TIMEOUT_SECS, EMISSION_INTERVAL_MS, SERVER_PORT};
use quotes_server::config::ServerConfig;
use quotes_server::session::StreamConfig;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address to listen on for client connections.
    #[clap(long, default_value_t = format!("0.0.0.0:{}", SERVER_PORT))]
    pub bind: String,

    /// Quote corpus file, one quote per line (optionally `<id>|<text>`).
    /// The embedded corpus is served when omitted.
    #[clap(long)]
    pub corpus: Option<PathBuf>,

    /// Pause between two quotes of a subscribed stream, in milliseconds.
    #[clap(long, default_value_t = EMISSION_INTERVAL_MS)]
    pub interval_ms: u64,

    /// How long a stream emission may wait for its consumer, in milliseconds.
    #[clap(long, default_value_t = ACK_TIMEOUT_MS)]
    pub ack_timeout_ms: u64,

    /// Seconds without `connect`/`ping` after which a client is disconnected.
    #[clap(long, default_value_t = CLIENT_TIMEOUT_SECS)]
    pub client_timeout_secs: u64,

    /// Socket write timeout, in milliseconds.
    #[clap(long, default_value_t = 5000)]
    pub write_timeout_ms: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            bind_addr: args.bind,
            corpus: args.corpus,
            stream: StreamConfig {
                interval: Duration::from_millis(args.interval_ms),
                ack_timeout: Duration::from_millis(args.ack_timeout_ms),
            },
            client_timeout: Duration::from_secs(args.client_timeout_secs),
            write_timeout: Duration::from_millis(args.write_timeout_ms),
            ..ServerConfig::default()
        }
    }
}
