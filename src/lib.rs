//! Whole-file transfer over a framed TCP protocol
//!
//! A client stores (uploads) or retrieves (downloads) one file per exchange
//! over a persistent connection. Every message is a length-prefixed envelope;
//! file payloads are streamed raw after an acceptance and followed by an
//! xxHash3-128 digest that the receiver verifies before keeping the file.

pub mod channel;
pub mod config;
pub mod digest;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;

pub use channel::FramedChannel;
pub use config::Config;
pub use digest::{Digest, Digester};
pub use protocol::Envelope;
pub use server::{FileServer, FileServerConfig};
pub use storage::FileStore;
pub use transfer::{TransferClient, TransferError};
