//! Command-line arguments for the Quotes Client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::{Parser, Subcommand};
use quotes_common::QuoteId;
use quotes_common::net::{LOCAL_HOST, SERVER_PORT, addr};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Server address as `host:port`.
    #[clap(long, default_value_t = addr(LOCAL_HOST, SERVER_PORT))]
    pub server: String,

    /// Client handle used for `connect` and `subscribe`.
    #[clap(long, default_value = "quotes-client")]
    pub client_id: String,

    /// Operation to perform.
    #[command(subcommand)]
    pub action: Action,
}

/// One logical operation of the quotes protocol.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Print every quote.
    All,
    /// Print the number of quotes.
    Count,
    /// Print quotes by id, in the given order.
    Get {
        /// Quote ids.
        #[arg(required = true)]
        ids: Vec<QuoteId>,
    },
    /// Print one random quote.
    Random,
    /// Print quotes containing any of the queries (case-insensitive).
    Search {
        /// Search queries.
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Subscribe and print streamed quotes until Ctrl+C, then cancel.
    Stream {
        /// Stop after this many quotes.
        #[clap(long)]
        max: Option<usize>,
    },
}
