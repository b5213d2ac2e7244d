//! Object payloads and their dispatch by object type and version

pub mod broadcast;
pub mod generic;
pub mod get_pubkey;
pub mod msg;
pub mod pubkey;

pub use broadcast::Broadcast;
pub use generic::GenericPayload;
pub use get_pubkey::GetPubkey;
pub use msg::Msg;
pub use pubkey::{Pubkey, PubkeyBody, DOES_ACK, INCLUDE_DESTINATION};

use crate::codec::{Reader, Streamable};
use crate::core::ObjectType;
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use log::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPayload {
    GetPubkey(GetPubkey),
    Pubkey(Pubkey),
    Msg(Msg),
    Broadcast(Broadcast),
    /// Unknown type or version, or a known one that did not parse
    Generic(GenericPayload),
}

impl ObjectPayload {
    /// Decode the rest of `reader`. Anything that is not a known
    /// `(type, version)` pair, or does not parse as one, is kept as a
    /// [`GenericPayload`] so it can still be relayed unchanged.
    pub fn read(object_type: u32, version: u64, stream: u64, reader: &mut Reader<'_>) -> ObjectPayload {
        let data = reader.rest();
        let mut payload_reader = Reader::new(data);
        let parsed = match (ObjectType::from_number(object_type), version) {
            (ObjectType::GetPubkey, 2..=4) => Some(
                GetPubkey::read(version, stream, &mut payload_reader).map(ObjectPayload::GetPubkey),
            ),
            (ObjectType::Pubkey, 2..=4) => Some(
                Pubkey::read(version, stream, &mut payload_reader).map(ObjectPayload::Pubkey),
            ),
            (ObjectType::Msg, Msg::VERSION) => {
                Some(Msg::read(stream, &mut payload_reader).map(ObjectPayload::Msg))
            }
            (ObjectType::Broadcast, 4 | 5) => Some(
                Broadcast::read(version, stream, &mut payload_reader).map(ObjectPayload::Broadcast),
            ),
            _ => None,
        };
        match parsed {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                debug!("Keeping object type {object_type} v{version} as generic payload: {e}");
                ObjectPayload::Generic(GenericPayload::new(object_type, version, stream, data.to_vec()))
            }
            None => {
                debug!("Unknown object type {object_type} v{version}");
                ObjectPayload::Generic(GenericPayload::new(object_type, version, stream, data.to_vec()))
            }
        }
    }

    pub fn object_type(&self) -> u32 {
        match self {
            ObjectPayload::GetPubkey(_) => ObjectType::GetPubkey.number(),
            ObjectPayload::Pubkey(_) => ObjectType::Pubkey.number(),
            ObjectPayload::Msg(_) => ObjectType::Msg.number(),
            ObjectPayload::Broadcast(_) => ObjectType::Broadcast.number(),
            ObjectPayload::Generic(generic) => generic.object_type(),
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            ObjectPayload::GetPubkey(request) => request.version(),
            ObjectPayload::Pubkey(pubkey) => pubkey.version(),
            ObjectPayload::Msg(_) => Msg::VERSION,
            ObjectPayload::Broadcast(broadcast) => broadcast.version(),
            ObjectPayload::Generic(generic) => generic.version(),
        }
    }

    pub fn stream(&self) -> u64 {
        match self {
            ObjectPayload::GetPubkey(request) => request.stream(),
            ObjectPayload::Pubkey(pubkey) => pubkey.stream(),
            ObjectPayload::Msg(msg) => msg.stream(),
            ObjectPayload::Broadcast(broadcast) => broadcast.stream(),
            ObjectPayload::Generic(generic) => generic.stream(),
        }
    }

    pub fn is_signed(&self) -> bool {
        match self {
            ObjectPayload::Pubkey(pubkey) => pubkey.is_signed(),
            ObjectPayload::Msg(_) | ObjectPayload::Broadcast(_) => true,
            ObjectPayload::GetPubkey(_) | ObjectPayload::Generic(_) => false,
        }
    }

    /// Payload part of the signed bytes, following the object header
    pub fn signed_part(&self) -> Result<Vec<u8>> {
        match self {
            ObjectPayload::Pubkey(pubkey) if pubkey.is_signed() => pubkey.signed_part(),
            ObjectPayload::Msg(msg) => msg.signed_part(),
            ObjectPayload::Broadcast(broadcast) => broadcast.signed_part(),
            _ => Err(BitmessageError::InvalidState(
                "Payload is not signed".to_string(),
            )),
        }
    }

    pub fn signature(&self) -> Option<&[u8]> {
        match self {
            ObjectPayload::Pubkey(pubkey) => pubkey.signature(),
            ObjectPayload::Msg(msg) => msg.signature(),
            ObjectPayload::Broadcast(broadcast) => broadcast.signature(),
            ObjectPayload::GetPubkey(_) | ObjectPayload::Generic(_) => None,
        }
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) -> Result<()> {
        match self {
            ObjectPayload::Pubkey(pubkey) => pubkey.set_signature(signature),
            ObjectPayload::Msg(msg) => msg.set_signature(signature),
            ObjectPayload::Broadcast(broadcast) => broadcast.set_signature(signature),
            _ => Err(BitmessageError::InvalidState(
                "Payload is not signed".to_string(),
            )),
        }
    }

    /// Public key that must have produced the signature, once known
    pub fn signing_key(&self) -> Result<Vec<u8>> {
        let from = match self {
            ObjectPayload::Pubkey(pubkey) => return Ok(pubkey.body()?.signing_key().to_vec()),
            ObjectPayload::Msg(msg) => msg.plaintext()?.from(),
            ObjectPayload::Broadcast(broadcast) => broadcast.plaintext()?.from(),
            _ => {
                return Err(BitmessageError::InvalidState(
                    "Payload is not signed".to_string(),
                ))
            }
        };
        let pubkey = from.pubkey().ok_or_else(|| {
            BitmessageError::InvalidState(format!("No pubkey known for {}", from.address()))
        })?;
        Ok(pubkey.body()?.signing_key().to_vec())
    }

    pub fn is_encrypted_type(&self) -> bool {
        match self {
            ObjectPayload::Pubkey(pubkey) => pubkey.version() >= 4,
            ObjectPayload::Msg(_) | ObjectPayload::Broadcast(_) => true,
            ObjectPayload::GetPubkey(_) | ObjectPayload::Generic(_) => false,
        }
    }

    pub fn is_decrypted(&self) -> bool {
        match self {
            ObjectPayload::Pubkey(pubkey) => pubkey.is_decrypted(),
            ObjectPayload::Msg(msg) => msg.is_decrypted(),
            ObjectPayload::Broadcast(broadcast) => broadcast.is_decrypted(),
            ObjectPayload::GetPubkey(_) | ObjectPayload::Generic(_) => true,
        }
    }

    pub fn encrypt(&mut self, crypto: &dyn Cryptography, public_key: &[u8]) -> Result<()> {
        match self {
            ObjectPayload::Pubkey(pubkey) => pubkey.encrypt(crypto, public_key),
            ObjectPayload::Msg(msg) => msg.encrypt(crypto, public_key),
            ObjectPayload::Broadcast(broadcast) => broadcast.encrypt(crypto, public_key),
            _ => Err(BitmessageError::InvalidState(
                "Payload cannot be encrypted".to_string(),
            )),
        }
    }

    pub fn decrypt(&mut self, crypto: &dyn Cryptography, private_key: &[u8]) -> Result<()> {
        match self {
            ObjectPayload::Pubkey(pubkey) => pubkey.decrypt(crypto, private_key),
            ObjectPayload::Msg(msg) => msg.decrypt(crypto, private_key),
            ObjectPayload::Broadcast(broadcast) => broadcast.decrypt(crypto, private_key),
            _ => Err(BitmessageError::InvalidState(
                "Payload is not encrypted".to_string(),
            )),
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            ObjectPayload::GetPubkey(request) => request.write_to(out),
            ObjectPayload::Pubkey(pubkey) => pubkey.write(out)?,
            ObjectPayload::Msg(msg) => msg.write(out)?,
            ObjectPayload::Broadcast(broadcast) => broadcast.write(out)?,
            ObjectPayload::Generic(generic) => generic.write_to(out),
        }
        Ok(())
    }
}
