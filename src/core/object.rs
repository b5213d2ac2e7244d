//! The object envelope
//!
//! ```text
//! nonce(8) | expiresTime(8) | objectType(4) | version(varint) | stream(varint) | payload
//! ```
//!
//! Signatures cover everything from `expiresTime` up to the signature
//! field of the payload, excluding the nonce.

use crate::codec::{encode, Reader};
use crate::core::payload::ObjectPayload;
use crate::core::InventoryVector;
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::wallet::PrivateKey;
use std::fmt;

/// Object types as numbered on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    GetPubkey,
    Pubkey,
    Msg,
    Broadcast,
    Other(u32),
}

impl ObjectType {
    pub fn number(self) -> u32 {
        match self {
            ObjectType::GetPubkey => 0,
            ObjectType::Pubkey => 1,
            ObjectType::Msg => 2,
            ObjectType::Broadcast => 3,
            ObjectType::Other(number) => number,
        }
    }

    pub fn from_number(number: u32) -> ObjectType {
        match number {
            0 => ObjectType::GetPubkey,
            1 => ObjectType::Pubkey,
            2 => ObjectType::Msg,
            3 => ObjectType::Broadcast,
            other => ObjectType::Other(other),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::GetPubkey => write!(f, "getpubkey"),
            ObjectType::Pubkey => write!(f, "pubkey"),
            ObjectType::Msg => write!(f, "msg"),
            ObjectType::Broadcast => write!(f, "broadcast"),
            ObjectType::Other(number) => write!(f, "type {number}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMessage {
    nonce: Option<[u8; 8]>,
    expires_time: u64,
    payload: ObjectPayload,
}

impl ObjectMessage {
    /// Unstamped object; `expires_time` is in unix seconds
    pub fn new(payload: ObjectPayload, expires_time: u64) -> ObjectMessage {
        ObjectMessage {
            nonce: None,
            expires_time,
            payload,
        }
    }

    /// Read a complete object, consuming the rest of `reader`
    pub fn read(reader: &mut Reader<'_>) -> Result<ObjectMessage> {
        let nonce = reader.array::<8>()?;
        let mut object = Self::read_without_nonce(reader)?;
        object.nonce = Some(nonce);
        Ok(object)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ObjectMessage> {
        Self::read(&mut Reader::new(bytes))
    }

    /// Read an object whose nonce has already been stripped
    pub fn read_without_nonce(reader: &mut Reader<'_>) -> Result<ObjectMessage> {
        let expires_time = reader.uint64()?;
        let object_type = reader.uint32()?;
        let version = reader.var_int()?;
        let stream = reader.var_int()?;
        let payload = ObjectPayload::read(object_type, version, stream, reader);
        Ok(ObjectMessage {
            nonce: None,
            expires_time,
            payload,
        })
    }

    pub fn nonce(&self) -> Option<[u8; 8]> {
        self.nonce
    }

    pub fn set_nonce(&mut self, nonce: [u8; 8]) {
        self.nonce = Some(nonce);
    }

    pub fn expires_time(&self) -> u64 {
        self.expires_time
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_time < now
    }

    pub fn object_type(&self) -> ObjectType {
        ObjectType::from_number(self.payload.object_type())
    }

    pub fn version(&self) -> u64 {
        self.payload.version()
    }

    pub fn stream(&self) -> u64 {
        self.payload.stream()
    }

    pub fn payload(&self) -> &ObjectPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut ObjectPayload {
        &mut self.payload
    }

    pub fn into_payload(self) -> ObjectPayload {
        self.payload
    }

    fn write_header(&self, out: &mut Vec<u8>) {
        encode::uint64(self.expires_time, out);
        encode::uint32(self.payload.object_type(), out);
        encode::var_int(self.payload.version(), out);
        encode::var_int(self.payload.stream(), out);
    }

    /// Everything but the nonce; this is what proof of work is done on
    pub fn payload_bytes_without_nonce(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_header(&mut out);
        self.payload.write(&mut out)?;
        Ok(out)
    }

    /// Object header followed by the payload's signed part
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_header(&mut out);
        out.extend_from_slice(&self.payload.signed_part()?);
        Ok(out)
    }

    /// Complete wire form; the object must be stamped
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let nonce = self.nonce.ok_or_else(|| {
            BitmessageError::InvalidState("Object has no proof of work yet".to_string())
        })?;
        let mut out = Vec::from(nonce);
        out.extend_from_slice(&self.payload_bytes_without_nonce()?);
        Ok(out)
    }

    pub fn inventory_vector(&self, crypto: &dyn Cryptography) -> Result<InventoryVector> {
        Ok(InventoryVector::of_object_bytes(crypto, &self.to_bytes()?))
    }

    /// Sign the payload with `key`'s signing key. Unsigned payload types
    /// are left untouched.
    pub fn sign(&mut self, crypto: &dyn Cryptography, key: &PrivateKey) -> Result<()> {
        if !self.payload.is_signed() {
            return Ok(());
        }
        let data = self.bytes_to_sign()?;
        let signature = crypto.sign(&data, key.private_signing_key())?;
        self.payload.set_signature(signature)
    }

    pub fn is_signature_valid(
        &self,
        crypto: &dyn Cryptography,
        public_signing_key: &[u8],
    ) -> Result<bool> {
        let signature = match self.payload.signature() {
            Some(signature) if !signature.is_empty() => signature,
            _ => return Ok(false),
        };
        let data = self.bytes_to_sign()?;
        Ok(crypto.is_signature_valid(&data, signature, public_signing_key))
    }

    /// Encrypt the payload to `public_key`
    pub fn encrypt(&mut self, crypto: &dyn Cryptography, public_key: &[u8]) -> Result<()> {
        self.payload.encrypt(crypto, public_key)
    }

    /// Decrypt the payload and check the signature it carries against the
    /// signing key found inside. On any failure the object is left as it
    /// was.
    pub fn decrypt(&mut self, crypto: &dyn Cryptography, private_key: &[u8]) -> Result<()> {
        let mut decrypted = self.clone();
        decrypted.payload.decrypt(crypto, private_key)?;
        if decrypted.payload.is_signed() {
            let signing_key = decrypted.payload.signing_key()?;
            if !decrypted.is_signature_valid(crypto, &signing_key)? {
                return Err(BitmessageError::SignatureInvalid(format!(
                    "{} object signature does not match its sender",
                    self.object_type()
                )));
            }
        }
        *self = decrypted;
        Ok(())
    }

    pub fn is_decrypted(&self) -> bool {
        self.payload.is_decrypted()
    }
}
