//! Network Module
//!
//! The TCP frontend: an acceptor loop that hands each client to its own
//! connection handler thread, capped by configuration and drained on
//! shutdown.

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;
