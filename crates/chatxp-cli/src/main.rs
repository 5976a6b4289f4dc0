//! ChatXP command-line tool.
//!
//! Manages device-local keys in a redb file and seals or opens message
//! content in the same JSON format the messaging clients store.
//!
//! # Usage
//!
//! ```bash
//! # Create (or show) the key pair for an identity
//! chatxp --store keys.redb keygen --identity 0xabc
//!
//! # Seal a message to someone's published key, then open it as them
//! chatxp --store keys.redb encrypt --to <public-key> "hello"
//! chatxp --store keys.redb decrypt --identity 0xdef '<envelope-json>'
//!
//! # Hand a group key to a member
//! chatxp --store keys.redb grant --group g1 --member 0xdef --to <public-key>
//! ```

mod commands;

use std::{io, path::PathBuf};

use chatxp_crypto::SystemEntropy;
use chatxp_keystore::RedbStore;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{CliError, Command};

/// ChatXP key and envelope tool
#[derive(Parser, Debug)]
#[command(name = "chatxp")]
#[command(about = "ChatXP end-to-end encryption key and envelope tool")]
#[command(version)]
struct Args {
    /// Path to the device-local key store (created if missing)
    #[arg(short, long, default_value = "chatxp-keys.redb")]
    store: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so stdout carries only command output
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    tracing::debug!(store = %args.store.display(), "opening key store");
    let storage = RedbStore::open(&args.store)?;

    let mut stdout = io::stdout().lock();
    match commands::run(args.command, storage, &SystemEntropy, &mut stdout) {
        Err(CliError::KeyStore(err)) if err.is_fatal() => {
            // Retrying cannot help; the stored value must be inspected or restored
            tracing::error!(store = %args.store.display(), error = %err, "key store is corrupt");
            Err(err.into())
        },
        result => Ok(result?),
    }
}
