//! Envelope body encoding
//!
//! Body layout: [1 byte: tag] [fields...], all integers big-endian.
//! Strings are a u32 length followed by UTF-8 bytes.

use super::types::*;
use crate::digest::DIGEST_LEN;
use byteorder::{BigEndian, WriteBytesExt};

/// Encode an envelope body (without the length prefix)
pub fn build_envelope(envelope: &Envelope) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.push(envelope.tag() as u8);

    match envelope {
        Envelope::StorageRequest(req) => {
            put_string(&mut buf, &req.file_name);
            put_u64(&mut buf, req.size);
        }
        Envelope::RetrievalRequest(req) => {
            put_string(&mut buf, &req.file_name);
        }
        Envelope::Response(resp) => {
            buf.push(resp.ok as u8);
            put_string(&mut buf, &resp.message);
        }
        Envelope::RetrievalResponse(resp) => {
            buf.push(resp.ok as u8);
            put_string(&mut buf, &resp.message);
            put_u64(&mut buf, resp.size);
        }
        Envelope::Checksum(msg) => {
            // Writes into a Vec cannot fail
            let _ = buf.write_u16::<BigEndian>(DIGEST_LEN as u16);
            buf.extend_from_slice(msg.checksum.as_bytes());
        }
        Envelope::Empty => {}
    }

    buf
}

fn put_string(buf: &mut Vec<u8>, value: &str) {
    let _ = buf.write_u32::<BigEndian>(value.len() as u32);
    buf.extend_from_slice(value.as_bytes());
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    let _ = buf.write_u64::<BigEndian>(value);
}
