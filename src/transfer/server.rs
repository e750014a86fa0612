//! Server side of the store and retrieve exchanges

use super::{
    expect_checksum, Exchange, TransferError, TransferResult, Transferred, CHECKSUM_MISMATCH,
    READY_FOR_DATA, READY_TO_SEND, STORED_SUCCESSFULLY,
};
use crate::channel::FramedChannel;
use crate::digest::Digester;
use crate::protocol::{Envelope, Response, RetrievalRequest, RetrievalResponse, StorageRequest};
use crate::storage::FileStore;
use std::fs::File;
use std::io::{BufWriter, Read, Write};

/// Handle a storage request.
///
/// The destination is created exclusively before the client is told to
/// send data. Any failure after creation removes the file.
pub fn handle_storage<R: Read, W: Write>(
    channel: &mut FramedChannel<R, W>,
    store: &FileStore,
    request: &StorageRequest,
) -> TransferResult<Transferred> {
    let name = request.file_name.as_str();
    log::info!("Storing {:?} ({} bytes)", name, request.size);

    let file = match store.create_new(name) {
        Ok(file) => file,
        Err(e) => {
            send_rejection(channel, Response::reject(e.to_string()).into());
            return Err(e);
        }
    };

    let mut exchange = Exchange::new(name);
    if let Err(e) = receive_and_verify(channel, &mut exchange, file, request.size) {
        exchange.fail();
        store.discard(name);
        if matches!(e, TransferError::ChecksumMismatch { .. }) {
            send_rejection(channel, Response::reject(CHECKSUM_MISMATCH).into());
        }
        return Err(e);
    }

    channel.send(&Response::accept(STORED_SUCCESSFULLY).into())?;

    let digest = exchange.local_digest()?;
    log::info!("Stored {:?} successfully (digest {})", name, digest);
    Ok(Transferred {
        bytes: request.size,
        digest,
    })
}

fn receive_and_verify<R: Read, W: Write>(
    channel: &mut FramedChannel<R, W>,
    exchange: &mut Exchange,
    file: File,
    size: u64,
) -> TransferResult<()> {
    exchange.accept(size)?;
    channel.send(&Response::accept(READY_FOR_DATA).into())?;

    let mut writer = BufWriter::new(file);
    let mut digest = Digester::new();
    channel.receive_payload(&mut writer, exchange.payload_size()?, &mut digest)?;

    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    exchange.streamed(digest.finalize())?;

    let peer = expect_checksum(channel.receive()?)?;
    log::debug!(
        "{:?}: local digest {}, client digest {}",
        exchange.file_name(),
        exchange.local_digest()?,
        peer
    );
    exchange.verify(&peer)
}

/// Handle a retrieval request.
///
/// The size announced in the acceptance is the file length at stat time;
/// the trailing checksum is sent without waiting for acknowledgement.
pub fn handle_retrieval<R: Read, W: Write>(
    channel: &mut FramedChannel<R, W>,
    store: &FileStore,
    request: &RetrievalRequest,
) -> TransferResult<Transferred> {
    let name = request.file_name.as_str();
    log::info!("Retrieving {:?}", name);

    let opened = store
        .size_of(name)
        .and_then(|size| store.open(name).map(|file| (size, file)));

    let (size, mut file) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            send_rejection(channel, RetrievalResponse::reject(e.to_string()).into());
            return Err(e);
        }
    };

    let mut exchange = Exchange::new(name);
    exchange.accept(size)?;
    channel.send(&RetrievalResponse::accept(READY_TO_SEND, size).into())?;

    let mut digest = Digester::new();
    channel.send_payload(&mut file, exchange.payload_size()?, &mut digest)?;

    let digest = digest.finalize();
    exchange.streamed(digest)?;
    channel.send(&Envelope::from(digest))?;

    log::info!("Sent {:?} successfully ({} bytes, digest {})", name, size, digest);
    Ok(Transferred {
        bytes: size,
        digest,
    })
}

/// Best-effort rejection; the exchange error is what gets reported
fn send_rejection<R: Read, W: Write>(channel: &mut FramedChannel<R, W>, envelope: Envelope) {
    if let Err(e) = channel.send(&envelope) {
        log::warn!("Failed to send rejection: {}", e);
    }
}
