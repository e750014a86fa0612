//! Client side of the store and retrieve exchanges

use super::{
    expect_checksum, expect_response, expect_retrieval_response, Exchange, TransferError,
    TransferResult, Transferred,
};
use crate::channel::FramedChannel;
use crate::digest::Digester;
use crate::protocol::{Envelope, RetrievalRequest, StorageRequest};
use crate::storage::FileStore;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

/// Drives exchanges against a server, reading and writing local files
/// through a [`FileStore`]
pub struct TransferClient<R: Read, W: Write> {
    channel: FramedChannel<R, W>,
    local: FileStore,
}

impl TransferClient<TcpStream, TcpStream> {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A, local: FileStore) -> io::Result<Self> {
        let channel = FramedChannel::connect(addr)?;
        log::info!("Connected to {}", channel.peer_addr()?);
        Ok(Self::new(channel, local))
    }
}

impl<R: Read, W: Write> TransferClient<R, W> {
    pub fn new(channel: FramedChannel<R, W>, local: FileStore) -> Self {
        Self { channel, local }
    }

    /// Upload a local file under the same name
    pub fn store(&mut self, file_name: &str) -> TransferResult<Transferred> {
        log::info!("PUT {}", file_name);

        let size = self.local.size_of(file_name)?;
        let mut file = self.local.open(file_name)?;
        let mut exchange = Exchange::new(file_name);

        self.channel.send(
            &StorageRequest {
                file_name: file_name.to_string(),
                size,
            }
            .into(),
        )?;

        let ack = expect_response(self.channel.receive()?)?;
        if !ack.ok {
            exchange.fail();
            return Err(TransferError::ServerRejected(ack.message));
        }
        exchange.accept(size)?;

        let mut digest = Digester::new();
        self.channel
            .send_payload(&mut file, exchange.payload_size()?, &mut digest)?;

        let digest = digest.finalize();
        exchange.streamed(digest)?;
        self.channel.send(&Envelope::from(digest))?;

        let verdict = expect_response(self.channel.receive()?)?;
        if !verdict.ok {
            exchange.fail();
            return Err(TransferError::ServerRejected(verdict.message));
        }

        log::info!("Storage complete: {} ({} bytes, digest {})", file_name, size, digest);
        Ok(Transferred {
            bytes: size,
            digest,
        })
    }

    /// Download a remote file into a new local file of the same name.
    ///
    /// An existing local file is never overwritten. The local file is only
    /// created once the server has accepted the request, and is removed
    /// again if the payload is cut short or fails verification.
    pub fn retrieve(&mut self, file_name: &str) -> TransferResult<Transferred> {
        log::info!("GET {}", file_name);

        if self.local.exists(file_name) {
            return Err(TransferError::AlreadyExists(file_name.to_string()));
        }

        let mut exchange = Exchange::new(file_name);
        self.channel.send(
            &RetrievalRequest {
                file_name: file_name.to_string(),
            }
            .into(),
        )?;

        let ack = expect_retrieval_response(self.channel.receive()?)?;
        if !ack.ok {
            exchange.fail();
            return Err(TransferError::ServerRejected(ack.message));
        }
        exchange.accept(ack.size)?;

        let file = self.local.create_new(file_name)?;
        if let Err(e) = self.receive_and_verify(&mut exchange, file) {
            exchange.fail();
            self.local.discard(file_name);
            return Err(e);
        }

        let digest = exchange.local_digest()?;
        log::info!(
            "Successfully retrieved {} ({} bytes, digest {})",
            file_name,
            ack.size,
            digest
        );
        Ok(Transferred {
            bytes: ack.size,
            digest,
        })
    }

    fn receive_and_verify(&mut self, exchange: &mut Exchange, file: File) -> TransferResult<()> {
        let mut writer = BufWriter::new(file);
        let mut digest = Digester::new();
        self.channel
            .receive_payload(&mut writer, exchange.payload_size()?, &mut digest)?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        exchange.streamed(digest.finalize())?;

        let peer = expect_checksum(self.channel.receive()?)?;
        exchange.verify(&peer)
    }

    /// Tell the server there are no more requests
    pub fn close(mut self) -> TransferResult<()> {
        self.channel.send(&Envelope::Empty)
    }
}
