//! Server configuration.
//!
//! Built from command-line flags by the binary; `Default` gives the values documented in
//! `quotes_common::net`.

use std::path::PathBuf;
use std::time::Duration;

use quotes_common::net::{CLIENT_TIMEOUT_SECS, SERVER_PORT, addr};

use crate::session::StreamConfig;

/// Everything needed to run a server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub bind_addr: String,
    /// Corpus file; the embedded corpus is used when `None`.
    pub corpus: Option<PathBuf>,
    /// Emission interval and ack timeout for streaming sessions.
    pub stream: StreamConfig,
    /// Clients silent for longer than this are disconnected.
    pub client_timeout: Duration,
    /// A socket write blocked for longer than this drops the connection.
    pub write_timeout: Duration,
    /// How often idle clients are reaped and cancelled subscriptions purged.
    pub reap_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: addr("0.0.0.0", SERVER_PORT),
            corpus: None,
            stream: StreamConfig::default(),
            client_timeout: Duration::from_secs(CLIENT_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(5),
            reap_interval: Duration::from_secs(1),
        }
    }
}
