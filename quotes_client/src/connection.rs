//! Talking to the quotes server over TCP.
//!
//! A `Connection` sends one JSON request per line and reads one JSON response per line.
//! It also provides the background ping loop that keeps a client's subscriptions alive.
use log::{debug, error, info, warn};
use quotes_common::command::{decode_line, encode_line};
use quotes_common::net::PING_INTERVAL_MS;
use quotes_common::{ClientId, QuoteError, Request, Response, Result};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::TcpStream;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

/// What a read from the server produced.
#[derive(Debug)]
pub enum Incoming {
    /// A complete response line.
    Message(Response),
    /// The read timed out with no complete line; try again.
    Idle,
    /// The server closed the connection.
    Closed,
}

/// One TCP connection to the server.
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    /// Partial line kept across read timeouts.
    pending: String,
}

impl Connection {
    pub fn open(server_addr: &str) -> Result<Self> {
        let writer = TcpStream::connect(server_addr).map_err(|e| {
            QuoteError::Format(format!("Failed to connect to server {}: {}", server_addr, e))
        })?;
        let reader = BufReader::new(writer.try_clone()?);
        debug!("Connected to {}", server_addr);
        Ok(Self {
            reader,
            writer,
            pending: String::new(),
        })
    }

    /// Bound how long `receive` may block; `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.writer.set_read_timeout(timeout)?;
        Ok(())
    }

    pub fn send(&mut self, request: &Request) -> Result<()> {
        debug!("Sending {}", request.operation());
        self.writer.write_all(encode_line(request)?.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn receive(&mut self) -> Result<Incoming> {
        match self.reader.read_line(&mut self.pending) {
            Ok(0) => Ok(Incoming::Closed),
            Ok(_) => {
                let decoded = decode_line::<Response>(&self.pending);
                self.pending.clear();
                Ok(Incoming::Message(decoded?))
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(Incoming::Idle)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Send `request` and wait for its response.
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        self.send(request)?;
        loop {
            match self.receive()? {
                Incoming::Message(response) => return Ok(response),
                Incoming::Idle => continue,
                Incoming::Closed => {
                    return Err(QuoteError::Format(
                        "server closed the connection".to_string(),
                    ));
                }
            }
        }
    }

    /// Keep `client_id` alive by pinging `server_addr` until `shutdown` is set.
    pub fn start_ping_thread(server_addr: String, client_id: ClientId, shutdown: Arc<AtomicBool>) {
        info!("Ping thread started. Target: {}", server_addr);
        thread::spawn(move || {
            let mut connection = match Connection::open(&server_addr) {
                Ok(connection) => connection,
                Err(e) => {
                    error!("PING THREAD ERROR: {}", e);
                    return;
                }
            };
            let interval = Duration::from_millis(PING_INTERVAL_MS);
            let ping = Request::Ping { client_id };
            while !shutdown.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match connection.call(&ping) {
                    Ok(Response::Pong) => debug!("PING acknowledged by {}", server_addr),
                    Ok(other) => warn!("Unexpected reply to PING: {:?}", other),
                    Err(e) => {
                        error!("PING THREAD ERROR: Failed to send PING: {}", e);
                        break;
                    }
                }
            }
            info!("Ping thread stopping...");
        });
    }
}

/// Turn a response that does not answer the request into an error.
pub fn unexpected(response: Response) -> QuoteError {
    match response {
        Response::Error { error } => error.into(),
        other => QuoteError::UnexpectedReply(format!("{:?}", other)),
    }
}
