use crate::codec::MAX_PAYLOAD_LENGTH;
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::network::message::{HEADER_LENGTH, MAGIC};
use crate::network::NetworkMessage;
use log::warn;
use std::io::Read;
use std::sync::Arc;

const READ_CHUNK: usize = 8 * 1024;

/// Splits a byte stream into frames.
///
/// A broken frame (bad checksum, unknown command, garbage payload) is
/// reported and dropped; the reader then carries on with the next frame
/// instead of giving up on the connection.
pub struct MessageReader {
    crypto: Arc<dyn Cryptography>,
    buffer: Vec<u8>,
}

impl MessageReader {
    pub fn new(crypto: Arc<dyn Cryptography>) -> MessageReader {
        MessageReader {
            crypto,
            buffer: Vec::new(),
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Read one chunk from `source`; returns the number of bytes read
    pub fn fill_from<R: Read>(&mut self, source: &mut R) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let read = source.read(&mut chunk)?;
        self.push(&chunk[..read]);
        Ok(read)
    }

    /// Bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// The next complete frame, `None` if more bytes are needed
    pub fn next_message(&mut self) -> Option<Result<NetworkMessage>> {
        if !self.sync_to_magic() || self.buffer.len() < HEADER_LENGTH {
            return None;
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&self.buffer[16..20]);
        let length = u32::from_be_bytes(length_bytes) as usize;
        if length > MAX_PAYLOAD_LENGTH {
            warn!("Dropping frame announcing {length} bytes");
            self.buffer.drain(..MAGIC.len());
            return Some(Err(BitmessageError::Format(format!(
                "Payload of {length} bytes exceeds {MAX_PAYLOAD_LENGTH}"
            ))));
        }
        let frame_length = HEADER_LENGTH + length;
        if self.buffer.len() < frame_length {
            return None;
        }

        let result = NetworkMessage::read(self.crypto.as_ref(), &self.buffer[..frame_length]);
        self.buffer.drain(..frame_length);
        match result {
            Ok((message, _)) => Some(Ok(message)),
            Err(e) => {
                warn!("Dropping frame: {e}");
                Some(Err(e))
            }
        }
    }

    /// Skip to the next magic; false if none is buffered yet
    fn sync_to_magic(&mut self) -> bool {
        match self
            .buffer
            .windows(MAGIC.len())
            .position(|window| window == MAGIC)
        {
            Some(0) => true,
            Some(start) => {
                warn!("Skipping {start} bytes before frame magic");
                self.buffer.drain(..start);
                true
            }
            None => {
                // a magic may straddle the next chunk
                let keep = self.buffer.len().min(MAGIC.len() - 1);
                let skip = self.buffer.len() - keep;
                if skip > 0 {
                    warn!("Skipping {skip} bytes without frame magic");
                    self.buffer.drain(..skip);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InventoryVector;
    use crate::crypto::Secp256k1Cryptography;
    use crate::network::{InventoryList, MessagePayload};

    fn frame(crypto: &dyn Cryptography, payload: MessagePayload) -> Vec<u8> {
        NetworkMessage::new(payload).to_bytes(crypto).unwrap()
    }

    #[test]
    fn test_frames_split_across_chunks() {
        let crypto = Arc::new(Secp256k1Cryptography::new());
        let list = InventoryList::new(vec![InventoryVector::new([1u8; 32])]).unwrap();
        let mut bytes = frame(crypto.as_ref(), MessagePayload::VerAck);
        bytes.extend(frame(crypto.as_ref(), MessagePayload::Inv(list.clone())));

        let mut reader = MessageReader::new(crypto);
        let (first, second) = bytes.split_at(30);
        reader.push(first);
        assert!(matches!(
            reader.next_message(),
            Some(Ok(m)) if *m.payload() == MessagePayload::VerAck
        ));
        assert!(reader.next_message().is_none());
        reader.push(second);
        assert!(matches!(
            reader.next_message(),
            Some(Ok(m)) if *m.payload() == MessagePayload::Inv(list.clone())
        ));
        assert!(reader.next_message().is_none());
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn test_bad_frame_is_dropped_not_fatal() {
        let crypto = Arc::new(Secp256k1Cryptography::new());
        let list = InventoryList::new(vec![InventoryVector::new([1u8; 32])]).unwrap();
        let mut corrupted = frame(crypto.as_ref(), MessagePayload::Inv(list));
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;

        let mut reader = MessageReader::new(crypto.clone());
        reader.push(&[0x00, 0x01, 0x02]);
        reader.push(&corrupted);
        reader.push(&frame(crypto.as_ref(), MessagePayload::VerAck));

        assert!(matches!(
            reader.next_message(),
            Some(Err(BitmessageError::Checksum { .. }))
        ));
        assert!(matches!(reader.next_message(), Some(Ok(_))));
        assert!(reader.next_message().is_none());
    }

    #[test]
    fn test_fill_from_reader() {
        let crypto = Arc::new(Secp256k1Cryptography::new());
        let bytes = frame(crypto.as_ref(), MessagePayload::VerAck);
        let mut reader = MessageReader::new(crypto);
        let read = reader.fill_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(read, bytes.len());
        assert!(matches!(reader.next_message(), Some(Ok(_))));
    }
}
