//! File server binary
//!
//! Usage:
//!   file-server <PORT> [STORAGE_DIR] [--config <CONFIG>] [--bind <ADDR>]
//!
//! Files are stored in and served from STORAGE_DIR (the working directory
//! if omitted), addressed by the names clients send.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use std::env;
use std::path::PathBuf;

use filexfer::config::{parse_log_level, Config};
use filexfer::{FileServer, FileServerConfig};

#[derive(Parser, Debug)]
#[command(name = "file-server")]
#[command(about = "Framed file transfer server", long_about = None)]
struct Args {
    /// TCP port to listen on
    port: Option<u16>,

    /// Directory to store and serve files from
    storage_dir: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (default 0.0.0.0)
    #[arg(short, long)]
    bind: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    // Initialize logging; RUST_LOG wins unless a config file sets the level
    if args.config.is_some() {
        let level = parse_log_level(&config.server.log_level).unwrap_or(log::LevelFilter::Info);
        env_logger::Builder::new().filter_level(level).init();
    } else {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    }

    let port = args
        .port
        .or(config.server.port)
        .context("missing port: usage is file-server <port> [storage-dir]")?;

    let storage_dir = args.storage_dir.or(config.server.storage_dir);
    if let Some(dir) = &storage_dir {
        env::set_current_dir(dir)
            .with_context(|| format!("cannot change into storage directory {}", dir.display()))?;
    }

    let bind = args.bind.unwrap_or(config.server.bind);
    let bind_addr = if bind.contains(':') {
        format!("[{}]:{}", bind, port)
    } else {
        format!("{}:{}", bind, port)
    };

    log::info!("Starting file server v{}", env!("CARGO_PKG_VERSION"));
    log::info!("  Bind address: {}", bind_addr);
    log::info!(
        "  Storage dir: {}",
        storage_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| ".".to_string())
    );
    log::info!("  Buffer size: {} bytes", config.transfer.buffer_size);

    let server = FileServer::bind(FileServerConfig {
        bind_addr: bind_addr.clone(),
        storage_path: PathBuf::from("."),
        buffer_size: config.transfer.buffer_size,
    })
    .with_context(|| format!("listen on {} failed", bind_addr))?;

    server.run().context("server error")?;
    Ok(())
}
