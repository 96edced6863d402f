//! Quotes Client: a TCP client for the quotes server.
//!
//! Retrieval subcommands (`all`, `count`, `get`, `random`, `search`) go through a
//! `RemoteProvider` and print the result to stdout. `stream` connects, subscribes, keeps the
//! client alive with periodic `PING`s and prints streamed quotes until Ctrl+C (or `--max`),
//! then cancels the subscription and reports whether the cancel was confirmed.
//!
//! Usage example (CLI):
//! ```bash
//! quotes_client --server 127.0.0.1:10200 search over said
//! quotes_client --client-id yogi stream --max 5
//! ```
#![warn(missing_docs)]
mod args;

use crate::args::{Action, Args};
use clap::Parser;
use log::{error, info, warn};
use quotes_client::connection::{Connection, Incoming, unexpected};
use quotes_client::remote::RemoteProvider;
use quotes_common::{
    ClientId, Quote, QuoteError, QuoteProvider, Request, Response, Result, SubscriptionId,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

/// How long a stream read blocks before re-checking for Ctrl+C.
const STREAM_POLL_MS: u64 = 500;

fn main() -> Result<(), QuoteError> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Error setting Ctrl+C handler: {}", e);
        }
    }

    let server = normalize_addr(&args.server);
    let result = match args.action {
        Action::Stream { max } => {
            run_stream(&server, ClientId::new(&args.client_id), max, shutdown)
        }
        action => {
            let provider = RemoteProvider::connect(&server)?;
            run_retrieval(&provider, action)
        }
    };
    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

fn run_retrieval(provider: &dyn QuoteProvider, action: Action) -> Result<()> {
    match action {
        Action::All => print_quotes(&provider.all_quotes()?),
        Action::Count => println!("{}", provider.number_of_quotes()?),
        Action::Get { ids } => print_quotes(&provider.quotes(&ids)?),
        Action::Random => println!("{}", provider.random_quote()?),
        Action::Search { queries } => match queries.as_slice() {
            [query] => print_quotes(&provider.search(query)?),
            _ => print_quotes(&provider.search_all(&queries)?),
        },
        Action::Stream { .. } => {
            return Err(QuoteError::Format(
                "stream is not a retrieval operation".to_string(),
            ));
        }
    }
    Ok(())
}

fn print_quotes(quotes: &[Quote]) {
    for quote in quotes {
        println!("{}", quote);
    }
}

fn run_stream(
    server: &str,
    client_id: ClientId,
    max: Option<usize>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    info!("Connecting to TCP server at {}", server);
    let mut control = Connection::open(server)?;
    match control.call(&Request::Connect {
        client_id: client_id.clone(),
    })? {
        Response::Connected { token } => info!("Connected as {} (token {})", client_id, token),
        other => return Err(unexpected(other)),
    }
    let subscription_id = match control.call(&Request::Subscribe {
        client_id: client_id.clone(),
    })? {
        Response::Subscribed { subscription_id } => subscription_id,
        other => return Err(unexpected(other)),
    };
    info!("Subscribed: {}", subscription_id);

    let pinging = Arc::new(AtomicBool::new(false));
    Connection::start_ping_thread(server.to_string(), client_id, pinging.clone());

    info!("Client is running. Press Ctrl+C to exit.");
    // The stream connection stays open until the cancel is answered, otherwise the
    // server may reclaim the subscription first and report the cancel as unconfirmed.
    let mut stream = Connection::open(server)?;
    let streamed = receive_stream(&mut stream, subscription_id, max, &shutdown);
    pinging.store(true, Ordering::SeqCst);
    streamed?;

    match control.call(&Request::Cancel { subscription_id })? {
        Response::CancelConfirmed { .. } => info!("Cancel confirmed for {}", subscription_id),
        Response::CancelUnconfirmed { .. } => {
            info!("Cancel unconfirmed for {}: already cancelled", subscription_id)
        }
        other => return Err(unexpected(other)),
    }
    Ok(())
}

/// Print quotes from the subscription's stream until shutdown, `max`, or the server ends it.
fn receive_stream(
    stream: &mut Connection,
    subscription_id: SubscriptionId,
    max: Option<usize>,
    shutdown: &AtomicBool,
) -> Result<()> {
    stream.set_read_timeout(Some(Duration::from_millis(STREAM_POLL_MS)))?;
    stream.send(&Request::GetQuoteSubscribed { subscription_id })?;

    let max = max.unwrap_or(usize::MAX);
    let mut received = 0;
    while received < max && !shutdown.load(Ordering::Relaxed) {
        match stream.receive()? {
            Incoming::Message(Response::StreamStarted { .. }) => {
                info!("Stream started for {}", subscription_id)
            }
            Incoming::Message(Response::Quote { quote }) => {
                println!("{}", quote);
                received += 1;
            }
            Incoming::Message(Response::StreamEnded { .. }) | Incoming::Closed => {
                info!("Stream for {} ended by server", subscription_id);
                break;
            }
            Incoming::Message(other) => return Err(unexpected(other)),
            Incoming::Idle => continue,
        }
    }
    info!("Receiver loop stopping after {} quotes...", received);
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Trim whitespace and matching quotes from a CLI-provided address.
fn normalize_addr(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .to_string()
}
