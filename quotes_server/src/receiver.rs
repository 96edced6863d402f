use log::{debug, error, info, warn};
use quotes_common::command::{decode_line, encode_line};
use quotes_common::{ClientId, Request, Response, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::gateway::{ProtocolGateway, Reply};
use crate::session::QuoteStream;

/// TCP front end of the gateway.
///
/// Each accepted connection gets its own thread, which reads one JSON request per line
/// and writes one JSON response per line. A `getQuoteSubscribed` request turns the
/// connection into a stream for the rest of its life. When the peer of a connection that
/// issued `connect` closes it (or the connection fails), its client is disconnected and
/// its subscriptions are cancelled. A stream that the server ends after a cancel closes
/// the connection without touching the client's other subscriptions.
pub struct QuoteReceiver {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
    write_timeout: Duration,
}

impl QuoteReceiver {
    /// Bind a new TCP receiver to the provided `bind_addr` (e.g., `0.0.0.0:10200`).
    pub fn new(bind_addr: &str, write_timeout: Duration) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self {
            socket,
            write_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking accept loop. A failing connection is logged and never stops the loop.
    pub fn serve(self, gateway: Arc<ProtocolGateway>) -> Result<()> {
        info!("Quote gateway listening on {}", self.socket.local_addr()?);

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    let gateway = Arc::clone(&gateway);
                    let write_timeout = self.write_timeout;
                    let spawned = thread::Builder::new()
                        .name("connection".to_string())
                        .spawn(move || {
                            if let Err(e) = handle_connection(stream, &gateway, write_timeout) {
                                error!("Connection failed: {}", e);
                            }
                        });
                    if let Err(e) = spawned {
                        error!("Failed to spawn connection thread: {}", e);
                    }
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }
}

fn handle_connection(
    stream: TcpStream,
    gateway: &ProtocolGateway,
    write_timeout: Duration,
) -> Result<()> {
    let peer = stream.peer_addr()?;
    stream.set_write_timeout(Some(write_timeout))?;
    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut client: Option<ClientId> = None;
    debug!("Connection opened: {}", peer);

    let outcome = serve_requests(reader, &mut writer, gateway, &mut client);

    if let Some(client_id) = client {
        gateway.disconnect(&client_id);
    }
    debug!("Connection closed: {}", peer);
    outcome
}

fn serve_requests<R: BufRead>(
    reader: R,
    writer: &mut TcpStream,
    gateway: &ProtocolGateway,
    client: &mut Option<ClientId>,
) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let request = match decode_line::<Request>(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed request: {}", e);
                write_response(writer, &Response::error(&e))?;
                continue;
            }
        };
        if let Request::Connect { client_id } = &request {
            *client = Some(client_id.clone());
        }

        match gateway.handle(request) {
            Reply::Single(response) => write_response(writer, &response)?,
            Reply::Stream(stream) => {
                pump_stream(writer, stream)?;
                // Ended by its own cancel, not by the peer.
                client.take();
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Forward every emission to the socket until the session stops.
///
/// A failed write drops the stream, which the session takes as a disconnect.
fn pump_stream(writer: &mut TcpStream, stream: QuoteStream) -> Result<()> {
    let subscription_id = stream.subscription_id();
    write_response(writer, &Response::StreamStarted { subscription_id })?;

    for quote in stream {
        write_response(writer, &Response::Quote { quote })?;
    }

    write_response(writer, &Response::StreamEnded { subscription_id })
}

fn write_response(writer: &mut TcpStream, response: &Response) -> Result<()> {
    writer.write_all(encode_line(response)?.as_bytes())?;
    writer.flush()?;
    Ok(())
}
