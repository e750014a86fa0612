//! Transfer digests
//!
//! Streaming xxHash3-128 over payload bytes. Both ends of an exchange feed
//! the exact bytes they write or read, then compare the finalized values.

use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// Digest length on the wire
pub const DIGEST_LEN: usize = 16;

/// Finalized 128-bit content digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Create digest from raw bytes
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }

    /// Compute the digest of a complete buffer
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Digester::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Running digest over a payload
pub struct Digester {
    state: Xxh3,
}

impl Digester {
    pub fn new() -> Self {
        Self {
            state: Xxh3::new(),
        }
    }

    /// Feed the next chunk of payload bytes
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    pub fn finalize(&self) -> Digest {
        Digest(self.state.digest128().to_le_bytes())
    }
}

impl Default for Digester {
    fn default() -> Self {
        Self::new()
    }
}
