//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::network::connection::Connection;
use crate::shutdown::Shutdown;
use crate::store::Store;

/// How often the accept loop checks the stop flag while idle.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How often a draining shutdown re-checks the live-connection count.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The TCP frontend: one acceptor loop, one thread per connection.
pub struct Server {
    config: Config,
    store: Arc<Store>,
    listener: TcpListener,
    /// Tells the acceptor to stop taking connections.
    stop: Arc<AtomicBool>,
    /// Live connection count, for the cap and for drain.
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the configured address. Failing to claim the port happens here,
    /// before anything announces itself as ready.
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Server> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        // non-blocking so the accept loop can notice the stop flag within
        // one poll interval instead of sitting in accept() forever
        listener.set_nonblocking(true)?;

        Ok(Server {
            config,
            store,
            listener,
            stop: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The address actually bound; useful when the config asked for port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until [`shutdown`] is called.
    ///
    /// [`shutdown`]: Shutdown::shutdown
    pub fn run(&self) -> Result<()> {
        tracing::info!("listening on {}", self.local_addr()?);

        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                        tracing::warn!("connection limit reached, refusing {addr}");
                        drop(stream);
                        continue;
                    }

                    // the accepted socket inherits non-blocking from the
                    // listener on some platforms; the handler wants plain
                    // blocking reads with socket timeouts
                    stream.set_nonblocking(false)?;

                    self.active.fetch_add(1, Ordering::SeqCst);
                    let store = Arc::clone(&self.store);
                    let active = Arc::clone(&self.active);
                    let read_ms = self.config.read_timeout_ms;
                    let write_ms = self.config.write_timeout_ms;

                    thread::spawn(move || {
                        serve_one(stream, store, read_ms, write_ms);
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }

        // connections already accepted keep running until they finish or
        // time out; only the acceptor stops here
        tracing::info!("stopped accepting connections");
        Ok(())
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

fn serve_one(stream: std::net::TcpStream, store: Arc<Store>, read_ms: u64, write_ms: u64) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    match Connection::new(stream, store) {
        Ok(mut connection) => {
            if let Err(err) = connection.set_timeouts(read_ms, write_ms) {
                tracing::warn!("could not set timeouts for {peer}: {err}");
            }
            if let Err(err) = connection.handle() {
                tracing::warn!("connection from {peer} ended with error: {err}");
            }
        }
        Err(err) => tracing::warn!("failed to set up connection from {peer}: {err}"),
    }
}

impl Shutdown for Server {
    /// Stop the acceptor, then wait for live connections to finish.
    ///
    /// Connections are never cut; ones that outlast the deadline are
    /// reported through [`LedgerError::ShutdownTimeout`] and keep running
    /// until their socket timeouts release them.
    fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + timeout;

        loop {
            let active = self.active.load(Ordering::SeqCst);
            if active == 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                tracing::warn!("shutdown deadline passed with {active} connections open");
                return Err(LedgerError::ShutdownTimeout { pending: active });
            }
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
    }
}
