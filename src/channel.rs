//! Framed channel
//!
//! Wire layout of one message:
//! [4 bytes: body length, big-endian] [body...]
//!
//! File payloads are not framed. They are streamed raw between an
//! acceptance message and the trailing checksum, delimited only by the size
//! declared in the acceptance.

use crate::digest::Digester;
use crate::protocol::{build_envelope, parse_envelope, Envelope, MAX_FRAME_LEN};
use crate::transfer::{TransferError, TransferResult};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

/// Default payload chunk size
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Length-prefixed envelope transport over a byte stream
pub struct FramedChannel<R: Read, W: Write> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
    buffer_size: usize,
}

impl FramedChannel<TcpStream, TcpStream> {
    /// Wrap an established TCP connection
    pub fn from_tcp(stream: TcpStream) -> io::Result<Self> {
        Self::from_tcp_with_buffer_size(stream, DEFAULT_BUFFER_SIZE)
    }

    pub fn from_tcp_with_buffer_size(stream: TcpStream, buffer_size: usize) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;
        Ok(Self::with_buffer_size(reader, stream, buffer_size))
    }

    /// Dial a server and wrap the connection
    pub fn connect<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        Self::from_tcp(TcpStream::connect(addr)?)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.writer.get_ref().peer_addr()
    }
}

impl<R: Read, W: Write> FramedChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_buffer_size(reader, writer, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(reader: R, writer: W, buffer_size: usize) -> Self {
        let buffer_size = buffer_size.max(1);
        Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            writer: BufWriter::with_capacity(buffer_size, writer),
            buffer_size,
        }
    }

    /// Send one envelope and flush it to the stream.
    ///
    /// Bodies over `MAX_FRAME_LEN` are refused before anything is written.
    pub fn send(&mut self, envelope: &Envelope) -> TransferResult<()> {
        let body = build_envelope(envelope);
        if body.len() > MAX_FRAME_LEN {
            return Err(TransferError::MalformedFrame(format!(
                "{} body of {} bytes exceeds limit {}",
                envelope.kind(),
                body.len(),
                MAX_FRAME_LEN
            )));
        }
        log::trace!("send {} ({} bytes)", envelope.kind(), body.len());

        self.writer.write_u32::<BigEndian>(body.len() as u32)?;
        self.writer.write_all(&body)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Block until one complete envelope arrives.
    ///
    /// Fails with `EndOfStream` when the peer closed between messages and
    /// with `MalformedFrame` when it closed inside one or sent garbage.
    pub fn receive(&mut self) -> TransferResult<Envelope> {
        let mut len_buf = [0u8; 4];
        match read_full(&mut self.reader, &mut len_buf)? {
            0 => return Err(TransferError::EndOfStream),
            4 => {}
            n => {
                return Err(TransferError::MalformedFrame(format!(
                    "stream closed inside length prefix ({} of 4 bytes)",
                    n
                )))
            }
        }

        let length = u32::from_be_bytes(len_buf) as usize;
        if length > MAX_FRAME_LEN {
            return Err(TransferError::MalformedFrame(format!(
                "frame length {} exceeds limit {}",
                length, MAX_FRAME_LEN
            )));
        }

        let mut body = vec![0u8; length];
        let got = read_full(&mut self.reader, &mut body)?;
        if got < length {
            return Err(TransferError::MalformedFrame(format!(
                "stream closed after {} of {} body bytes",
                got, length
            )));
        }

        let envelope = parse_envelope(&body)?;
        log::trace!("received {} ({} bytes)", envelope.kind(), length);
        Ok(envelope)
    }

    /// Copy exactly `size` bytes from `source` onto the stream, hashing them
    pub fn send_payload<S: Read>(
        &mut self,
        source: &mut S,
        size: u64,
        digest: &mut Digester,
    ) -> TransferResult<()> {
        let mut buf = vec![0u8; self.buffer_size];
        let mut remaining = size;

        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = read_some(source, &mut buf[..want])?;
            if n == 0 {
                return Err(TransferError::TruncatedTransfer {
                    expected: size,
                    received: size - remaining,
                });
            }

            digest.update(&buf[..n]);
            self.writer.write_all(&buf[..n])?;
            remaining -= n as u64;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Copy exactly `size` bytes from the stream into `sink`, hashing them
    pub fn receive_payload<D: Write>(
        &mut self,
        sink: &mut D,
        size: u64,
        digest: &mut Digester,
    ) -> TransferResult<()> {
        let mut buf = vec![0u8; self.buffer_size];
        let mut remaining = size;

        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let n = read_some(&mut self.reader, &mut buf[..want])?;
            if n == 0 {
                return Err(TransferError::TruncatedTransfer {
                    expected: size,
                    received: size - remaining,
                });
            }

            digest.update(&buf[..n]);
            sink.write_all(&buf[..n])?;
            remaining -= n as u64;
        }

        sink.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn writer_ref(&self) -> &W {
        self.writer.get_ref()
    }
}

/// Read once, retrying on interruption. Returns 0 only at end of stream.
fn read_some<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Fill `buf` unless the stream ends first; returns the number of bytes read
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match read_some(reader, &mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Digest;
    use crate::protocol::{Response, RetrievalRequest, StorageRequest};
    use std::io::Cursor;

    fn channel_over(input: Vec<u8>) -> FramedChannel<Cursor<Vec<u8>>, Vec<u8>> {
        FramedChannel::new(Cursor::new(input), Vec::new())
    }

    fn framed(envelope: &Envelope) -> Vec<u8> {
        let body = build_envelope(envelope);
        let mut out = (body.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(&body);
        out
    }

    /// Reader that hands out at most one byte per call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let limit = buf.len().min(1);
            self.0.read(&mut buf[..limit])
        }
    }

    #[test]
    fn test_send_writes_length_prefix() {
        let mut channel = channel_over(Vec::new());
        let envelope = Envelope::Response(Response::accept("Ready for data"));
        channel.send(&envelope).unwrap();

        assert_eq!(channel.writer_ref(), &framed(&envelope));
    }

    #[test]
    fn test_send_refuses_oversized_body() {
        let mut channel = channel_over(Vec::new());
        let envelope = Envelope::RetrievalRequest(RetrievalRequest {
            file_name: "x".repeat(MAX_FRAME_LEN),
        });

        assert!(matches!(channel.send(&envelope), Err(TransferError::MalformedFrame(_))));
        assert!(channel.writer_ref().is_empty());

        // Largest name that still fits: tag byte plus u32 length prefix
        let fits = Envelope::RetrievalRequest(RetrievalRequest {
            file_name: "x".repeat(MAX_FRAME_LEN - 5),
        });
        channel.send(&fits).unwrap();

        let mut peer = channel_over(channel.writer_ref().clone());
        assert_eq!(peer.receive().unwrap(), fits);
    }

    #[test]
    fn test_receive_sequence_then_end_of_stream() {
        let first = Envelope::StorageRequest(StorageRequest {
            file_name: "a.txt".to_string(),
            size: 5,
        });
        let second = Envelope::Empty;

        let mut input = framed(&first);
        input.extend(framed(&second));
        let mut channel = channel_over(input);

        assert_eq!(channel.receive().unwrap(), first);
        assert_eq!(channel.receive().unwrap(), second);
        assert!(matches!(channel.receive(), Err(TransferError::EndOfStream)));
    }

    #[test]
    fn test_receive_survives_fragmentation() {
        let envelope = Envelope::from(Digest::of(b"fragmented"));
        let mut channel = FramedChannel::new(Trickle(Cursor::new(framed(&envelope))), Vec::new());

        assert_eq!(channel.receive().unwrap(), envelope);
        assert!(matches!(channel.receive(), Err(TransferError::EndOfStream)));
    }

    #[test]
    fn test_partial_prefix_is_malformed() {
        let mut channel = channel_over(vec![0, 0]);
        assert!(matches!(channel.receive(), Err(TransferError::MalformedFrame(_))));
    }

    #[test]
    fn test_short_body_is_malformed() {
        let mut input = framed(&Envelope::Response(Response::accept("ok")));
        input.truncate(input.len() - 1);
        let mut channel = channel_over(input);

        assert!(matches!(channel.receive(), Err(TransferError::MalformedFrame(_))));
    }

    #[test]
    fn test_oversized_frame_is_malformed() {
        let input = ((MAX_FRAME_LEN as u32) + 1).to_be_bytes().to_vec();
        let mut channel = channel_over(input);
        assert!(matches!(channel.receive(), Err(TransferError::MalformedFrame(_))));
    }

    #[test]
    fn test_undecodable_body_is_malformed() {
        let input = vec![0, 0, 0, 2, 0x77, 0x00];
        let mut channel = channel_over(input);
        assert!(matches!(channel.receive(), Err(TransferError::MalformedFrame(_))));
    }

    #[test]
    fn test_payload_followed_by_frame() {
        let payload = b"hello".to_vec();
        let trailer = Envelope::from(Digest::of(&payload));

        let mut input = payload.clone();
        input.extend(framed(&trailer));
        let mut channel = FramedChannel::with_buffer_size(Cursor::new(input), Vec::new(), 2);

        let mut sink = Vec::new();
        let mut digest = Digester::new();
        channel.receive_payload(&mut sink, 5, &mut digest).unwrap();

        assert_eq!(sink, payload);
        assert_eq!(digest.finalize(), Digest::of(&payload));
        assert_eq!(channel.receive().unwrap(), trailer);
    }

    #[test]
    fn test_short_payload_is_truncated() {
        let mut channel = channel_over(b"abc".to_vec());
        let mut sink = Vec::new();
        let mut digest = Digester::new();

        let result = channel.receive_payload(&mut sink, 10, &mut digest);
        assert!(matches!(
            result,
            Err(TransferError::TruncatedTransfer {
                expected: 10,
                received: 3
            })
        ));
    }

    #[test]
    fn test_send_payload_stops_at_size() {
        let mut channel = channel_over(Vec::new());
        let mut source = Cursor::new(b"hello world".to_vec());
        let mut digest = Digester::new();

        channel.send_payload(&mut source, 5, &mut digest).unwrap();

        assert_eq!(channel.writer_ref(), b"hello");
        assert_eq!(digest.finalize(), Digest::of(b"hello"));
    }

    #[test]
    fn test_send_payload_source_too_short() {
        let mut channel = channel_over(Vec::new());
        let mut source = Cursor::new(b"hi".to_vec());
        let mut digest = Digester::new();

        let result = channel.send_payload(&mut source, 5, &mut digest);
        assert!(matches!(
            result,
            Err(TransferError::TruncatedTransfer {
                expected: 5,
                received: 2
            })
        ));
    }
}
