//! Envelope body parsing
//!
//! Decodes a complete frame body into a typed envelope.

use super::types::*;
use crate::digest::{Digest, DIGEST_LEN};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use thiserror::Error;

/// Parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("body too short while reading {field}")]
    TooShort { field: &'static str },

    #[error("unknown message tag: 0x{0:02X}")]
    UnknownTag(u8),

    #[error("invalid boolean byte: {0}")]
    InvalidBool(u8),

    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("checksum must be {} bytes, got {actual}", DIGEST_LEN)]
    ChecksumLength { actual: usize },

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

/// Parse a frame body into an envelope.
///
/// A zero-length body is treated the same as an explicit empty envelope.
pub fn parse_envelope(body: &[u8]) -> Result<Envelope, ParseError> {
    let Some((&tag, _)) = body.split_first() else {
        return Ok(Envelope::Empty);
    };

    let tag = MessageTag::try_from(tag).map_err(ParseError::UnknownTag)?;
    let mut cursor = Cursor::new(&body[1..]);

    let envelope = match tag {
        MessageTag::Empty => Envelope::Empty,
        MessageTag::StorageRequest => Envelope::StorageRequest(StorageRequest {
            file_name: get_string(&mut cursor, "file name")?,
            size: get_u64(&mut cursor, "size")?,
        }),
        MessageTag::RetrievalRequest => Envelope::RetrievalRequest(RetrievalRequest {
            file_name: get_string(&mut cursor, "file name")?,
        }),
        MessageTag::Response => Envelope::Response(Response {
            ok: get_bool(&mut cursor)?,
            message: get_string(&mut cursor, "message")?,
        }),
        MessageTag::RetrievalResponse => Envelope::RetrievalResponse(RetrievalResponse {
            ok: get_bool(&mut cursor)?,
            message: get_string(&mut cursor, "message")?,
            size: get_u64(&mut cursor, "size")?,
        }),
        MessageTag::Checksum => Envelope::Checksum(ChecksumMessage {
            checksum: get_digest(&mut cursor)?,
        }),
    };

    let consumed = cursor.position() as usize;
    let remaining = body.len() - 1 - consumed;
    if remaining != 0 {
        return Err(ParseError::TrailingBytes(remaining));
    }

    Ok(envelope)
}

fn get_bool(cursor: &mut Cursor<&[u8]>) -> Result<bool, ParseError> {
    match cursor.read_u8() {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        Ok(other) => Err(ParseError::InvalidBool(other)),
        Err(_) => Err(ParseError::TooShort { field: "ok flag" }),
    }
}

fn get_u64(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<u64, ParseError> {
    cursor
        .read_u64::<BigEndian>()
        .map_err(|_| ParseError::TooShort { field })
}

fn get_string(cursor: &mut Cursor<&[u8]>, field: &'static str) -> Result<String, ParseError> {
    let len = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| ParseError::TooShort { field })? as usize;

    let available = cursor.get_ref().len() - cursor.position() as usize;
    if len > available {
        return Err(ParseError::TooShort { field });
    }

    let mut bytes = vec![0u8; len];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| ParseError::TooShort { field })?;

    String::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8 { field })
}

fn get_digest(cursor: &mut Cursor<&[u8]>) -> Result<Digest, ParseError> {
    let len = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| ParseError::TooShort { field: "checksum" })? as usize;

    if len != DIGEST_LEN {
        return Err(ParseError::ChecksumLength { actual: len });
    }

    let mut bytes = [0u8; DIGEST_LEN];
    cursor
        .read_exact(&mut bytes)
        .map_err(|_| ParseError::TooShort { field: "checksum" })?;

    Ok(Digest::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::build_envelope;

    #[test]
    fn test_parse_built_messages() {
        let messages = vec![
            Envelope::StorageRequest(StorageRequest {
                file_name: "report.pdf".to_string(),
                size: u64::MAX,
            }),
            Envelope::RetrievalRequest(RetrievalRequest {
                file_name: "dir/ünïcode.txt".to_string(),
            }),
            Envelope::Response(Response::reject("file exists")),
            Envelope::RetrievalResponse(RetrievalResponse::accept("Ready to send", 42)),
            Envelope::from(Digest::of(b"payload")),
            Envelope::Empty,
        ];

        for message in messages {
            let body = build_envelope(&message);
            assert_eq!(parse_envelope(&body).unwrap(), message);
        }
    }

    #[test]
    fn test_zero_length_body_is_empty() {
        assert_eq!(parse_envelope(&[]).unwrap(), Envelope::Empty);
    }

    #[test]
    fn test_unknown_tag() {
        let result = parse_envelope(&[0x42, 0, 0]);
        assert!(matches!(result, Err(ParseError::UnknownTag(0x42))));
    }

    #[test]
    fn test_string_length_past_end() {
        // RetrievalRequest claiming a 100-byte name but carrying 3
        let body = [0x02, 0, 0, 0, 100, b'a', b'b', b'c'];
        assert!(matches!(
            parse_envelope(&body),
            Err(ParseError::TooShort { field: "file name" })
        ));
    }

    #[test]
    fn test_invalid_bool() {
        let body = [0x03, 2, 0, 0, 0, 0];
        assert!(matches!(parse_envelope(&body), Err(ParseError::InvalidBool(2))));
    }

    #[test]
    fn test_wrong_checksum_length() {
        let mut body = vec![0x05, 0x00, 0x20];
        body.extend_from_slice(&[0u8; 32]);
        assert!(matches!(
            parse_envelope(&body),
            Err(ParseError::ChecksumLength { actual: 32 })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut body = build_envelope(&Envelope::Response(Response::accept("ok")));
        body.push(0xFF);
        assert!(matches!(parse_envelope(&body), Err(ParseError::TrailingBytes(1))));
    }

    #[test]
    fn test_invalid_utf8() {
        let body = [0x02, 0, 0, 0, 2, 0xC3, 0x28];
        assert!(matches!(
            parse_envelope(&body),
            Err(ParseError::InvalidUtf8 { field: "file name" })
        ));
    }
}
