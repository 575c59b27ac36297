//! LedgerKV CLI Client
//!
//! One-shot commands against a running server.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ledgerkv::protocol::{read_response, write_command, Command, Status};
use ledgerkv::Result;

/// LedgerKV CLI
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-cli")]
#[command(about = "CLI for the LedgerKV key-value store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    let stream = TcpStream::connect(&args.server)?;
    stream.set_nodelay(true)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    let command = match &args.command {
        Commands::Get { key } => Command::Get {
            key: key.clone().into_bytes(),
        },
        Commands::Set { key, value } => Command::Put {
            key: key.clone().into_bytes(),
            value: value.clone().into_bytes(),
        },
        Commands::Del { key } => Command::Delete {
            key: key.clone().into_bytes(),
        },
        Commands::Ping => Command::Ping,
    };

    write_command(&mut writer, &command)?;
    let response = read_response(&mut reader)?;

    match response.status {
        Status::Ok => {
            match response.payload {
                Some(payload) => println!("{}", String::from_utf8_lossy(&payload)),
                None => println!("OK"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Status::NotFound => {
            eprintln!("(not found)");
            Ok(ExitCode::from(1))
        }
        Status::Error => {
            let message = response
                .payload
                .map(|p| String::from_utf8_lossy(&p).into_owned())
                .unwrap_or_else(|| "unknown server error".to_string());
            eprintln!("server error: {message}");
            Ok(ExitCode::from(2))
        }
    }
}
