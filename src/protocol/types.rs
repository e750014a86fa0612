//! Transfer protocol types and constants
//!
//! Defines the messages carried inside an envelope frame.

use crate::digest::Digest;

/// Largest envelope body accepted on the wire (file payloads are never framed)
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Envelope tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageTag {
    Empty = 0x00,
    StorageRequest = 0x01,
    RetrievalRequest = 0x02,
    Response = 0x03,
    RetrievalResponse = 0x04,
    Checksum = 0x05,
}

impl TryFrom<u8> for MessageTag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageTag::Empty),
            0x01 => Ok(MessageTag::StorageRequest),
            0x02 => Ok(MessageTag::RetrievalRequest),
            0x03 => Ok(MessageTag::Response),
            0x04 => Ok(MessageTag::RetrievalResponse),
            0x05 => Ok(MessageTag::Checksum),
            other => Err(other),
        }
    }
}

/// Announces an upload of exactly `size` bytes under `file_name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRequest {
    pub file_name: String,
    pub size: u64,
}

/// Asks for the contents of an existing file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub file_name: String,
}

/// Generic acknowledgement or rejection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub ok: bool,
    pub message: String,
}

impl Response {
    pub fn accept(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Answer to a retrieval request. On success `size` is the exact number of
/// payload bytes that follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalResponse {
    pub ok: bool,
    pub message: String,
    pub size: u64,
}

impl RetrievalResponse {
    pub fn accept(message: impl Into<String>, size: u64) -> Self {
        Self {
            ok: true,
            message: message.into(),
            size,
        }
    }

    /// Rejections always carry a zero size
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            size: 0,
        }
    }
}

/// Digest computed by the sender of the preceding payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumMessage {
    pub checksum: Digest,
}

/// One framed protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    StorageRequest(StorageRequest),
    RetrievalRequest(RetrievalRequest),
    Response(Response),
    RetrievalResponse(RetrievalResponse),
    Checksum(ChecksumMessage),
    /// No message present; tells the server to close the connection
    Empty,
}

impl Envelope {
    pub fn tag(&self) -> MessageTag {
        match self {
            Envelope::StorageRequest(_) => MessageTag::StorageRequest,
            Envelope::RetrievalRequest(_) => MessageTag::RetrievalRequest,
            Envelope::Response(_) => MessageTag::Response,
            Envelope::RetrievalResponse(_) => MessageTag::RetrievalResponse,
            Envelope::Checksum(_) => MessageTag::Checksum,
            Envelope::Empty => MessageTag::Empty,
        }
    }

    /// Short variant name for logs and errors
    pub fn kind(&self) -> &'static str {
        self.tag().name()
    }
}

impl MessageTag {
    pub fn name(self) -> &'static str {
        match self {
            MessageTag::Empty => "empty",
            MessageTag::StorageRequest => "storage request",
            MessageTag::RetrievalRequest => "retrieval request",
            MessageTag::Response => "response",
            MessageTag::RetrievalResponse => "retrieval response",
            MessageTag::Checksum => "checksum",
        }
    }
}

impl From<StorageRequest> for Envelope {
    fn from(msg: StorageRequest) -> Self {
        Envelope::StorageRequest(msg)
    }
}

impl From<RetrievalRequest> for Envelope {
    fn from(msg: RetrievalRequest) -> Self {
        Envelope::RetrievalRequest(msg)
    }
}

impl From<Response> for Envelope {
    fn from(msg: Response) -> Self {
        Envelope::Response(msg)
    }
}

impl From<RetrievalResponse> for Envelope {
    fn from(msg: RetrievalResponse) -> Self {
        Envelope::RetrievalResponse(msg)
    }
}

impl From<ChecksumMessage> for Envelope {
    fn from(msg: ChecksumMessage) -> Self {
        Envelope::Checksum(msg)
    }
}

impl From<Digest> for Envelope {
    fn from(checksum: Digest) -> Self {
        Envelope::Checksum(ChecksumMessage { checksum })
    }
}
