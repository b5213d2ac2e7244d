//! Network frames
//!
//! ```text
//! magic(E9BEB4D9) | command(12, NUL padded) | length(u32) | checksum(4) | payload
//! ```
//!
//! The checksum is the first four bytes of SHA-512 over the payload.

use crate::codec::{encode, Reader, MAX_PAYLOAD_LENGTH};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::network::MessagePayload;
use std::io::Write;

pub const MAGIC: [u8; 4] = [0xE9, 0xBE, 0xB4, 0xD9];
pub const COMMAND_LENGTH: usize = 12;
pub const HEADER_LENGTH: usize = 4 + COMMAND_LENGTH + 4 + 4;

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMessage {
    payload: MessagePayload,
}

pub(crate) fn checksum(crypto: &dyn Cryptography, payload: &[u8]) -> [u8; 4] {
    let hash = crypto.sha512(&[payload]);
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

impl NetworkMessage {
    pub fn new(payload: MessagePayload) -> NetworkMessage {
        NetworkMessage { payload }
    }

    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    pub fn into_payload(self) -> MessagePayload {
        self.payload
    }

    pub fn command(&self) -> &'static str {
        self.payload.command()
    }

    pub fn to_bytes(&self, crypto: &dyn Cryptography) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        self.payload.write(&mut payload)?;
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(BitmessageError::Format(format!(
                "Payload of {} bytes exceeds {MAX_PAYLOAD_LENGTH}",
                payload.len()
            )));
        }

        let mut out = Vec::with_capacity(HEADER_LENGTH + payload.len());
        out.extend_from_slice(&MAGIC);
        let mut command = [0u8; COMMAND_LENGTH];
        let name = self.command().as_bytes();
        command[..name.len()].copy_from_slice(name);
        out.extend_from_slice(&command);
        encode::uint32(payload.len() as u32, &mut out);
        out.extend_from_slice(&checksum(crypto, &payload));
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Parse the frame at the start of `bytes`, returning it together with
    /// the number of bytes it occupied.
    pub fn read(crypto: &dyn Cryptography, bytes: &[u8]) -> Result<(NetworkMessage, usize)> {
        let mut reader = Reader::new(bytes);
        let magic = reader.array::<4>()?;
        if magic != MAGIC {
            return Err(BitmessageError::Format(format!(
                "Bad magic {}",
                hex::encode(magic)
            )));
        }
        let command = read_command(reader.bytes(COMMAND_LENGTH)?)?;
        let length = reader.uint32()? as usize;
        if length > MAX_PAYLOAD_LENGTH {
            return Err(BitmessageError::Format(format!(
                "Payload of {length} bytes exceeds {MAX_PAYLOAD_LENGTH}"
            )));
        }
        let expected = reader.array::<4>()?;
        let payload = reader.bytes(length)?;

        let actual = checksum(crypto, payload);
        if actual != expected {
            return Err(BitmessageError::Checksum { expected, actual });
        }

        let message = MessagePayload::read(&command, &mut Reader::new(payload))?;
        Ok((NetworkMessage::new(message), reader.position()))
    }

    /// Frame the message onto a socket or any other writer
    pub fn write_to<W: Write>(&self, crypto: &dyn Cryptography, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes(crypto)?)?;
        writer.flush()?;
        Ok(())
    }
}

fn read_command(raw: &[u8]) -> Result<String> {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    if raw[end..].iter().any(|b| *b != 0) || !raw[..end].is_ascii() {
        return Err(BitmessageError::Format(format!(
            "Malformed command {}",
            hex::encode(raw)
        )));
    }
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}
