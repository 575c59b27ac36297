//! Connection Handler
//!
//! One client, one thread, one command at a time.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LedgerError, Result};
use crate::protocol::{read_command, write_response, Command, Response};
use crate::store::Store;

/// Handles a single client connection.
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    store: Arc<Store>,
    /// Peer address, for logging
    peer_addr: String,
}

impl Connection {
    /// Wrap an accepted stream in buffered read/write handles.
    pub fn new(stream: TcpStream, store: Arc<Store>) -> Result<Connection> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // small frames, low latency: turn Nagle off
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Connection {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            store,
            peer_addr,
        })
    }

    /// Configure socket timeouts; zero means unlimited.
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve the connection until the client goes away.
    ///
    /// Disconnects and idle timeouts end the loop quietly; only genuine
    /// failures come back as errors.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(command) => command,
                Err(LedgerError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(LedgerError::Io(ref e)) if is_timeout(e.kind()) => {
                    tracing::debug!("client {} idle too long, closing", self.peer_addr);
                    return Ok(());
                }
                Err(err) => {
                    // a malformed frame leaves the stream position unknown,
                    // so answer once and hang up
                    tracing::warn!("bad frame from {}: {err}", self.peer_addr);
                    let _ = self.send(Response::error(&err.to_string()));
                    return Err(err);
                }
            };

            tracing::trace!("command from {}: {:?}", self.peer_addr, command.kind());
            let response = self.execute(command);

            if let Err(err) = self.send(response) {
                if let LedgerError::Io(ref e) = err {
                    if is_disconnect(e.kind()) {
                        tracing::debug!("client {} went away mid-response", self.peer_addr);
                        return Ok(());
                    }
                }
                tracing::warn!("error writing to {}: {err}", self.peer_addr);
                return Err(err);
            }
        }
    }

    /// Run one command against the store and shape the outcome for the wire.
    fn execute(&self, command: Command) -> Response {
        match self.store.execute(command) {
            Ok(payload) => Response::ok(payload),
            Err(LedgerError::KeyNotFound) => Response::not_found(),
            Err(err) => Response::error(&err.to_string()),
        }
    }

    fn send(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)
    }

    /// The peer address, for logging.
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Error kinds that mean the peer is simply gone.
fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

/// Error kinds that mean a socket timeout fired (platform-dependent which).
fn is_timeout(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
