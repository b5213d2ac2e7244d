//! Extended message encoding
//!
//! Content is a MessagePack map whose first entry has the empty key and
//! names the content type (`"message"` or `"vote"`). The packed map is zlib
//! compressed before it becomes the message body of an encoding-3 message.
//! Unknown keys are skipped with a warning so newer clients stay readable.

pub mod message;
pub mod vote;

pub use message::{Attachment, Disposition, ExtendedMessage};
pub use vote::Vote;

use crate::error::{BitmessageError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rmpv::Value;
use std::io::{Read, Write};

/// Largest inflated content accepted from the network
pub const MAX_DECOMPRESSED_LENGTH: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedEncoding {
    Message(ExtendedMessage),
    Vote(Vote),
}

impl ExtendedEncoding {
    pub fn to_value(&self) -> Value {
        match self {
            ExtendedEncoding::Message(message) => message.pack(),
            ExtendedEncoding::Vote(vote) => vote.pack(),
        }
    }

    pub fn from_value(value: &Value) -> Result<ExtendedEncoding> {
        let entries = value.as_map().ok_or_else(|| {
            BitmessageError::Format("Extended encoding must be a map".to_string())
        })?;
        let content_type = entries
            .iter()
            .find(|(key, _)| key.as_str() == Some(""))
            .and_then(|(_, value)| value.as_str())
            .ok_or_else(|| BitmessageError::Format("Missing content type".to_string()))?;
        match content_type {
            message::TYPE => Ok(ExtendedEncoding::Message(ExtendedMessage::unpack(entries)?)),
            vote::TYPE => Ok(ExtendedEncoding::Vote(Vote::unpack(entries)?)),
            other => Err(BitmessageError::Format(format!(
                "Unknown extended content type '{other}'"
            ))),
        }
    }

    /// MessagePack, then zlib
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut packed = Vec::new();
        rmpv::encode::write_value(&mut packed, &self.to_value())?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&packed)?;
        Ok(encoder.finish()?)
    }

    pub fn decode(data: &[u8]) -> Result<ExtendedEncoding> {
        let mut packed = Vec::new();
        ZlibDecoder::new(data)
            .take(MAX_DECOMPRESSED_LENGTH as u64 + 1)
            .read_to_end(&mut packed)
            .map_err(|e| BitmessageError::Format(format!("Invalid zlib stream: {e}")))?;
        if packed.len() > MAX_DECOMPRESSED_LENGTH {
            return Err(BitmessageError::Format(format!(
                "Extended content inflates beyond {MAX_DECOMPRESSED_LENGTH} bytes"
            )));
        }
        let value = rmpv::decode::read_value(&mut packed.as_slice())?;
        Self::from_value(&value)
    }

    pub fn message(&self) -> Option<&ExtendedMessage> {
        match self {
            ExtendedEncoding::Message(message) => Some(message),
            ExtendedEncoding::Vote(_) => None,
        }
    }
}
