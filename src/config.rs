//! Configuration for ledgerkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{LedgerError, Result};

/// Main configuration for a ledgerkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Transaction Log Configuration
    // -------------------------------------------------------------------------
    /// Path of the write-ahead log file. `None` disables durability entirely:
    /// the store runs on the no-op log and loses its contents on exit.
    pub wal_path: Option<PathBuf>,

    /// Capacity of the log's intake queue, i.e. how many writes may sit
    /// buffered before mutating callers block. This is the backpressure knob:
    /// it bounds memory use when the disk lags behind incoming mutations.
    pub bandwidth: usize,

    /// Sync strategy: how often to fsync the log
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Shutdown Configuration
    // -------------------------------------------------------------------------
    /// Total time budget for draining and closing everything on shutdown
    pub shutdown_timeout: Duration,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// Log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after every N appends (balanced durability/performance); the
    /// writer always syncs once more before it exits
    EveryN { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wal_path: Some(PathBuf::from("./ledgerkv.wal")),
            bandwidth: 128,
            sync_strategy: SyncStrategy::EveryN { count: 100 },
            shutdown_timeout: Duration::from_secs(30),
            listen_addr: "127.0.0.1:7070".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check invariants the rest of the system relies on
    pub fn validate(&self) -> Result<()> {
        if self.bandwidth < 1 {
            return Err(LedgerError::Config(
                "bandwidth must be at least 1".to_string(),
            ));
        }
        if let SyncStrategy::EveryN { count } = self.sync_strategy {
            if count == 0 {
                return Err(LedgerError::Config(
                    "sync interval must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the write-ahead log path
    pub fn wal_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wal_path = Some(path.into());
        self
    }

    /// Disable the write-ahead log (in-memory only, nothing survives restart)
    pub fn ephemeral(mut self) -> Self {
        self.config.wal_path = None;
        self
    }

    /// Set the intake queue capacity
    pub fn bandwidth(mut self, bandwidth: usize) -> Self {
        self.config.bandwidth = bandwidth;
        self
    }

    /// Set the log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the shutdown time budget
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the connection read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the connection write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
