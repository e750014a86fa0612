//! Exchange phase tracking
//!
//! Payload bytes may only move once the acceptance for them has been sent
//! (server) or observed (client). Every exchange walks
//! `Pending -> Accepted -> Streamed -> Complete`, and payload streaming asks
//! the tracker for the declared size instead of trusting call order.

use super::{TransferError, TransferResult};
use crate::digest::Digest;

/// Where an exchange currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Request sent or received, no acceptance yet
    Pending,
    /// Acceptance exchanged; exactly `size` payload bytes may follow
    Accepted { size: u64 },
    /// Payload moved; `digest` is the locally computed value
    Streamed { digest: Digest },
    /// Digests compared equal
    Complete { digest: Digest },
    Failed,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Pending => "pending",
            Phase::Accepted { .. } => "accepted",
            Phase::Streamed { .. } => "streamed",
            Phase::Complete { .. } => "complete",
            Phase::Failed => "failed",
        }
    }
}

/// State of one store or retrieve exchange
#[derive(Debug)]
pub struct Exchange {
    file_name: String,
    phase: Phase,
}

impl Exchange {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            phase: Phase::Pending,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Record the acceptance that opens the payload phase
    pub fn accept(&mut self, size: u64) -> TransferResult<()> {
        match self.phase {
            Phase::Pending => {
                self.phase = Phase::Accepted { size };
                Ok(())
            }
            other => Err(TransferError::NotAccepted(other.name())),
        }
    }

    /// Declared payload size; fails unless the exchange has been accepted
    pub fn payload_size(&self) -> TransferResult<u64> {
        match self.phase {
            Phase::Accepted { size } => Ok(size),
            other => Err(TransferError::NotAccepted(other.name())),
        }
    }

    /// Record that the payload has been fully written or read
    pub fn streamed(&mut self, digest: Digest) -> TransferResult<()> {
        self.payload_size()?;
        self.phase = Phase::Streamed { digest };
        Ok(())
    }

    /// Local digest of the streamed payload
    pub fn local_digest(&self) -> TransferResult<Digest> {
        match self.phase {
            Phase::Streamed { digest } | Phase::Complete { digest } => Ok(digest),
            other => Err(TransferError::NotAccepted(other.name())),
        }
    }

    /// Compare the peer's digest against the local one
    pub fn verify(&mut self, peer: &Digest) -> TransferResult<()> {
        let local = match self.phase {
            Phase::Streamed { digest } => digest,
            other => return Err(TransferError::NotAccepted(other.name())),
        };
        if local.as_bytes() == peer.as_bytes() {
            self.phase = Phase::Complete { digest: local };
            Ok(())
        } else {
            self.phase = Phase::Failed;
            Err(TransferError::ChecksumMismatch {
                expected: *peer,
                actual: local,
            })
        }
    }

    pub fn fail(&mut self) {
        self.phase = Phase::Failed;
    }
}
