//! File transfer TCP server
//!
//! Accepts client connections and serves store/retrieve requests, one
//! thread per connection. Connections share nothing but the filesystem.

mod connection;

pub use connection::{serve_connection, Disconnect};

use crate::channel::FramedChannel;
use crate::storage::FileStore;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::thread;

/// File server configuration
pub struct FileServerConfig {
    pub bind_addr: String,
    pub storage_path: PathBuf,
    pub buffer_size: usize,
}

/// File transfer server
pub struct FileServer {
    listener: TcpListener,
    store: FileStore,
    buffer_size: usize,
}

impl FileServer {
    /// Open the storage root and bind the listener
    pub fn bind(config: FileServerConfig) -> io::Result<Self> {
        let store = FileStore::new(&config.storage_path)?;
        let listener = TcpListener::bind(&config.bind_addr)?;
        Ok(Self {
            listener,
            store,
            buffer_size: config.buffer_size,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop.
    ///
    /// Returns once the listening socket itself is gone; other accept
    /// errors are logged and skipped.
    pub fn run(&self) -> io::Result<()> {
        log::info!(
            "Listening on {}, storing files in {:?}",
            self.local_addr()?,
            self.store.base_path()
        );

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let store = self.store.clone();
                    let buffer_size = self.buffer_size;
                    thread::spawn(move || {
                        if let Err(e) = handle_client(stream, store, buffer_size) {
                            log::warn!("Client handler error: {}", e);
                        }
                    });
                }
                Err(e) if is_listener_closed(&e) => {
                    log::info!("Listener closed, shutting down");
                    return Ok(());
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                }
            }
        }

        Ok(())
    }
}

/// Handle a client connection
fn handle_client(stream: TcpStream, store: FileStore, buffer_size: usize) -> io::Result<()> {
    let peer = stream.peer_addr()?;
    log::info!("Accepted connection from {}", peer);

    let mut channel = FramedChannel::from_tcp_with_buffer_size(stream, buffer_size)?;
    let end = serve_connection(&mut channel, &store, peer);
    log::debug!("Connection {} finished: {:?}", peer, end);
    Ok(())
}

/// Accept errors that mean the listening socket is no longer usable
fn is_listener_closed(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EBADF) | Some(libc::EINVAL) | Some(libc::ENOTSOCK)
    )
}
