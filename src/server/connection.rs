//! Per-connection request loop

use crate::channel::FramedChannel;
use crate::protocol::Envelope;
use crate::storage::FileStore;
use crate::transfer::{handle_retrieval, handle_storage, TransferError};
use std::fmt::Display;
use std::io::{Read, Write};

/// Why a connection loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    /// Peer closed the stream between exchanges
    PeerClosed,
    /// Peer sent an empty envelope
    EmptyEnvelope,
    /// Stream broke or desynced
    Failed(String),
}

/// Serve requests until the peer goes away.
///
/// Exchange failures are logged and the loop keeps reading unless the
/// failure left the stream unusable.
pub fn serve_connection<R: Read, W: Write>(
    channel: &mut FramedChannel<R, W>,
    store: &FileStore,
    peer: impl Display,
) -> Disconnect {
    loop {
        let envelope = match channel.receive() {
            Ok(envelope) => envelope,
            Err(TransferError::EndOfStream) => {
                log::info!("Client disconnected: {}", peer);
                return Disconnect::PeerClosed;
            }
            Err(e) => {
                log::warn!("Receive error from {}: {}", peer, e);
                return Disconnect::Failed(e.to_string());
            }
        };

        log::debug!("Received {} from {}", envelope.kind(), peer);

        let outcome = match envelope {
            Envelope::StorageRequest(request) => handle_storage(channel, store, &request)
                .map_err(|e| ("Storage", e)),
            Envelope::RetrievalRequest(request) => handle_retrieval(channel, store, &request)
                .map_err(|e| ("Retrieval", e)),
            Envelope::Empty => {
                log::info!("Empty message from {}, closing connection", peer);
                return Disconnect::EmptyEnvelope;
            }
            other => {
                log::warn!("Unexpected message type {} from {}", other.kind(), peer);
                continue;
            }
        };

        if let Err((what, e)) = outcome {
            log::warn!("{} error for {}: {}", what, peer, e);
            if e.is_fatal_to_connection() {
                return Disconnect::Failed(e.to_string());
            }
        }
    }
}
