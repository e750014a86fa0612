//! Transfer engine
//!
//! Store and retrieve exchanges on top of a [`FramedChannel`]. The server
//! half answers requests read by the dispatcher; the client half drives a
//! single exchange per call.
//!
//! [`FramedChannel`]: crate::channel::FramedChannel

pub mod client;
pub mod exchange;
pub mod server;

pub use client::TransferClient;
pub use exchange::{Exchange, Phase};
pub use server::{handle_retrieval, handle_storage};

use crate::digest::Digest;
use crate::protocol::{Envelope, MessageTag, ParseError, Response, RetrievalResponse};
use thiserror::Error;

/// Acknowledgement text sent before a store payload
pub const READY_FOR_DATA: &str = "Ready for data";
/// Acknowledgement text sent before a retrieve payload
pub const READY_TO_SEND: &str = "Ready to send";
/// Final response text after a verified store
pub const STORED_SUCCESSFULLY: &str = "File stored successfully";
/// Rejection text after a failed digest comparison
pub const CHECKSUM_MISMATCH: &str = "Checksum mismatch";

/// Transfer errors
#[derive(Debug, Error)]
pub enum TransferError {
    /// Peer closed the stream cleanly between messages
    #[error("end of stream")]
    EndOfStream,

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("transfer truncated: expected {expected} bytes, received {received}")]
    TruncatedTransfer { expected: u64, received: u64 },

    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: Digest, actual: Digest },

    #[error("server rejected request: {0}")]
    ServerRejected(String),

    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    /// Payload streaming attempted without an acceptance
    #[error("payload not accepted (exchange is {0})")]
    NotAccepted(&'static str),
}

impl From<ParseError> for TransferError {
    fn from(e: ParseError) -> Self {
        TransferError::MalformedFrame(e.to_string())
    }
}

impl TransferError {
    /// True when the connection cannot carry further exchanges
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            TransferError::EndOfStream | TransferError::MalformedFrame(_)
        )
    }
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

/// Unwrap a Response, rejecting any other envelope
pub(crate) fn expect_response(envelope: Envelope) -> TransferResult<Response> {
    match envelope {
        Envelope::Response(response) => Ok(response),
        other => Err(unexpected(MessageTag::Response, &other)),
    }
}

/// Unwrap a RetrievalResponse, rejecting any other envelope
pub(crate) fn expect_retrieval_response(envelope: Envelope) -> TransferResult<RetrievalResponse> {
    match envelope {
        Envelope::RetrievalResponse(response) => Ok(response),
        other => Err(unexpected(MessageTag::RetrievalResponse, &other)),
    }
}

/// Unwrap the trailing checksum of a payload
pub(crate) fn expect_checksum(envelope: Envelope) -> TransferResult<Digest> {
    match envelope {
        Envelope::Checksum(msg) => Ok(msg.checksum),
        other => Err(unexpected(MessageTag::Checksum, &other)),
    }
}

fn unexpected(expected: MessageTag, got: &Envelope) -> TransferError {
    TransferError::UnexpectedMessage {
        expected: expected.name(),
        got: got.kind(),
    }
}

/// Outcome of a completed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transferred {
    pub bytes: u64,
    pub digest: Digest,
}
