//! File client binary
//!
//! Usage:
//!   file-client <HOST:PORT> put|get <FILE_NAME> [DOWNLOAD_DIR]
//!
//! Performs exactly one store or retrieve and exits non-zero on failure.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use std::env;
use std::path::{Path, PathBuf};

use filexfer::{FileStore, TransferClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Upload a local file
    Put,
    /// Download a remote file
    Get,
}

#[derive(Parser, Debug)]
#[command(name = "file-client")]
#[command(about = "Framed file transfer client", long_about = None)]
struct Args {
    /// Server address (e.g., 127.0.0.1:9000)
    server: String,

    /// Operation to perform
    #[arg(value_enum, ignore_case = true)]
    action: Action,

    /// File to upload or download
    file_name: String,

    /// Working directory for the transfer: downloads land here, uploads
    /// are read from here
    download_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Some(dir) = &args.download_dir {
        enter_directory(dir)?;
    }

    let mut client = TransferClient::connect(&args.server, FileStore::current_dir())
        .with_context(|| format!("connection to {} failed", args.server))?;

    let transferred = match args.action {
        Action::Put => client.store(&args.file_name),
        Action::Get => client.retrieve(&args.file_name),
    }
    .context("operation failed")?;

    log::info!(
        "{} bytes transferred, digest {}",
        transferred.bytes,
        transferred.digest
    );

    if let Err(e) = client.close() {
        log::debug!("Failed to send close message: {}", e);
    }

    Ok(())
}

/// Make `dir` the working directory so local file names resolve inside it
fn enter_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("invalid download directory {}", dir.display());
    }
    env::set_current_dir(dir).with_context(|| format!("cannot change into {}", dir.display()))
}
