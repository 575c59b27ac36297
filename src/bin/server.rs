//! LedgerKV Server Binary
//!
//! Opens (and replays) the transaction log, then serves the store over TCP
//! until a signal or a log failure triggers a bounded-time shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam::channel;
use tracing_subscriber::{fmt, EnvFilter};

use ledgerkv::network::Server;
use ledgerkv::{Config, Coordinator, Store, SyncStrategy, TransactionLog};

/// LedgerKV Server
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-server")]
#[command(about = "Durable in-memory key-value store backed by a transaction log")]
#[command(version)]
struct Args {
    /// Transaction log file
    #[arg(short, long, default_value = "./ledgerkv.wal")]
    wal_path: PathBuf,

    /// Run without a transaction log; nothing survives a restart
    #[arg(long)]
    ephemeral: bool,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Writes the log queues before callers start blocking
    #[arg(short, long, default_value = "128")]
    bandwidth: usize,

    /// fsync after every append instead of every N
    #[arg(long)]
    sync_every_write: bool,

    /// Appends between fsyncs when batching
    #[arg(long, default_value = "100")]
    sync_interval: usize,

    /// Seconds allowed for graceful shutdown
    #[arg(long, default_value = "30")]
    shutdown_timeout: u64,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

/// What pulled the trigger on shutdown.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    Signal,
    LogFailure,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledgerkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LedgerKV Server v{}", ledgerkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    if args.ephemeral {
        tracing::warn!("Ephemeral mode: mutations will NOT survive a restart");
    } else {
        tracing::info!("Transaction log: {}", args.wal_path.display());
    }

    // Build config from args
    let sync_strategy = if args.sync_every_write {
        SyncStrategy::EveryWrite
    } else {
        SyncStrategy::EveryN {
            count: args.sync_interval,
        }
    };
    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .bandwidth(args.bandwidth)
        .sync_strategy(sync_strategy)
        .shutdown_timeout(Duration::from_secs(args.shutdown_timeout))
        .max_connections(args.max_connections);
    builder = if args.ephemeral {
        builder.ephemeral()
    } else {
        builder.wal_path(&args.wal_path)
    };
    let config = builder.build();

    // Open the log and rebuild the store from it
    let log = match TransactionLog::open(&config) {
        Ok(log) => log,
        Err(e) => {
            tracing::error!("Failed to open transaction log: {e}");
            std::process::exit(1);
        }
    };

    let mut store = Store::new(log);
    let log_errors = match store.restore() {
        Ok(errors) => errors,
        Err(e) if e.is_corruption() => {
            tracing::error!("Transaction log is corrupt: {e}");
            tracing::error!("Refusing to serve from a partial state; inspect the log file before restarting");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Failed to restore store from transaction log: {e}");
            std::process::exit(1);
        }
    };
    let store = Arc::new(store);
    tracing::info!("Store restored, ready to serve");

    // one trigger is enough; later ones are dropped
    let (trigger_tx, trigger_rx) = channel::bounded::<Trigger>(1);

    // Watchdog: a value on the log's error stream means accepted writes are
    // being lost. Shut down rather than limp on.
    let watchdog_tx = trigger_tx.clone();
    thread::spawn(move || {
        for err in log_errors.iter() {
            tracing::error!("Transaction log failure: {err}");
            let _ = watchdog_tx.try_send(Trigger::LogFailure);
        }
    });

    // Ctrl+C pulls the same trigger
    let signal_tx = trigger_tx;
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(Trigger::Signal);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {e}");
    }

    // Serve in the background; the main thread owns shutdown
    let server = match Server::bind(config.clone(), Arc::clone(&store)) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            tracing::error!("Failed to bind {}: {e}", config.listen_addr);
            std::process::exit(1);
        }
    };
    let acceptor = {
        let server = Arc::clone(&server);
        thread::spawn(move || {
            if let Err(e) = server.run() {
                tracing::error!("Server error: {e}");
            }
        })
    };

    let trigger = trigger_rx.recv().unwrap_or(Trigger::Signal);
    tracing::info!("Shutting down ({trigger:?})");

    // frontend first so no new writes arrive while the log drains
    let result = Coordinator::new(config.shutdown_timeout)
        .register("server", &*server)
        .register("store", &*store)
        .run();

    let _ = acceptor.join();

    match (trigger, result) {
        (Trigger::Signal, Ok(())) => tracing::info!("Shutdown complete"),
        (_, Err(e)) => {
            tracing::error!("Shutdown finished with errors: {e}");
            std::process::exit(1);
        }
        (Trigger::LogFailure, Ok(())) => {
            // clean drain of a poisoned log still means writes were lost
            std::process::exit(1);
        }
    }
}
