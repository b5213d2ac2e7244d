//! Public keys as published in `pubkey` objects
//!
//! ```text
//! v2: behavior(4) signingKey(64) encryptionKey(64)
//! v3: v2 | nonceTrialsPerByte(varint) extraBytes(varint) sigLength(varint) signature
//! v4: tag(32) | CryptoBox(v3 body)
//! ```
//!
//! Keys are held as 65-byte uncompressed points; the wire form drops the
//! leading `0x04`.

use crate::codec::{encode, Reader, MAX_SIGNATURE_LENGTH};
use crate::core::proof_of_work::{DEFAULT_EXTRA_BYTES, DEFAULT_NONCE_TRIALS_PER_BYTE};
use crate::crypto::{CryptoBox, Cryptography};
use crate::error::{BitmessageError, Result};

/// The receiving node sends acknowledgements
pub const DOES_ACK: u32 = 1;
/// Messages to this key must carry the destination ripe
pub const INCLUDE_DESTINATION: u32 = 2;

const WIRE_KEY_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubkeyBody {
    behavior_bitfield: u32,
    signing_key: Vec<u8>,
    encryption_key: Vec<u8>,
    nonce_trials_per_byte: u64,
    extra_bytes: u64,
    signature: Option<Vec<u8>>,
}

impl PubkeyBody {
    pub fn new(
        behavior_bitfield: u32,
        signing_key: &[u8],
        encryption_key: &[u8],
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<PubkeyBody> {
        Ok(PubkeyBody {
            behavior_bitfield,
            signing_key: full_key(signing_key)?,
            encryption_key: full_key(encryption_key)?,
            nonce_trials_per_byte,
            extra_bytes,
            signature: None,
        })
    }

    pub fn behavior_bitfield(&self) -> u32 {
        self.behavior_bitfield
    }

    pub fn has_behavior(&self, flag: u32) -> bool {
        self.behavior_bitfield & flag == flag
    }

    /// 65-byte uncompressed signing key
    pub fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }

    /// 65-byte uncompressed encryption key
    pub fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    pub fn nonce_trials_per_byte(&self) -> u64 {
        self.nonce_trials_per_byte
    }

    pub fn extra_bytes(&self) -> u64 {
        self.extra_bytes
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) {
        self.signature = Some(signature);
    }

    /// RIPEMD160(SHA512(signingKey || encryptionKey))
    pub fn ripe(&self, crypto: &dyn Cryptography) -> [u8; 20] {
        crypto.ripe_of(&[&self.signing_key, &self.encryption_key])
    }

    /// `behavior sign enc` without the `0x04` prefixes
    pub fn write_keys(&self, out: &mut Vec<u8>) {
        encode::uint32(self.behavior_bitfield, out);
        out.extend_from_slice(&self.signing_key[1..]);
        out.extend_from_slice(&self.encryption_key[1..]);
    }

    /// v3 fields covered by the signature
    pub fn write_signed_part(&self, out: &mut Vec<u8>) {
        self.write_keys(out);
        encode::var_int(self.nonce_trials_per_byte, out);
        encode::var_int(self.extra_bytes, out);
    }

    pub fn write_v3(&self, out: &mut Vec<u8>) {
        self.write_signed_part(out);
        encode::var_bytes(self.signature.as_deref().unwrap_or_default(), out);
    }

    /// v2 bodies have no difficulty fields; the network defaults apply
    pub fn read_v2(reader: &mut Reader<'_>) -> Result<PubkeyBody> {
        let behavior_bitfield = reader.uint32()?;
        let signing_key = reader.bytes(WIRE_KEY_LENGTH)?;
        let encryption_key = reader.bytes(WIRE_KEY_LENGTH)?;
        PubkeyBody::new(
            behavior_bitfield,
            signing_key,
            encryption_key,
            DEFAULT_NONCE_TRIALS_PER_BYTE,
            DEFAULT_EXTRA_BYTES,
        )
    }

    pub fn read_v3(reader: &mut Reader<'_>) -> Result<PubkeyBody> {
        let mut body = PubkeyBody::read_v2(reader)?;
        body.nonce_trials_per_byte = reader.var_int()?;
        body.extra_bytes = reader.var_int()?;
        let signature = reader.var_bytes(MAX_SIGNATURE_LENGTH)?;
        if !signature.is_empty() {
            body.signature = Some(signature.to_vec());
        }
        Ok(body)
    }
}

fn full_key(key: &[u8]) -> Result<Vec<u8>> {
    match key.len() {
        WIRE_KEY_LENGTH => {
            let mut full = Vec::with_capacity(WIRE_KEY_LENGTH + 1);
            full.push(0x04);
            full.extend_from_slice(key);
            Ok(full)
        }
        65 if key[0] == 0x04 => Ok(key.to_vec()),
        length => Err(BitmessageError::Crypto(format!(
            "Public key must be an uncompressed point, got {length} bytes"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pubkey {
    V2 {
        stream: u64,
        body: PubkeyBody,
    },
    V3 {
        stream: u64,
        body: PubkeyBody,
    },
    /// `body` is `None` until decrypted, `encrypted` until encrypted
    V4 {
        stream: u64,
        tag: [u8; 32],
        body: Option<PubkeyBody>,
        encrypted: Option<CryptoBox>,
    },
}

impl Pubkey {
    /// Wrap `body` for an address of `version`; v4 requires the address tag
    pub fn new(version: u64, stream: u64, body: PubkeyBody, tag: Option<[u8; 32]>) -> Result<Pubkey> {
        match (version, tag) {
            (2, _) => Ok(Pubkey::V2 { stream, body }),
            (3, _) => Ok(Pubkey::V3 { stream, body }),
            (4, Some(tag)) => Ok(Pubkey::V4 {
                stream,
                tag,
                body: Some(body),
                encrypted: None,
            }),
            (4, None) => Err(BitmessageError::InvalidState(
                "v4 pubkey needs the address tag".to_string(),
            )),
            (other, _) => Err(BitmessageError::Format(format!(
                "Unsupported pubkey version {other}"
            ))),
        }
    }

    pub fn read(version: u64, stream: u64, reader: &mut Reader<'_>) -> Result<Pubkey> {
        let pubkey = match version {
            2 => Pubkey::V2 {
                stream,
                body: PubkeyBody::read_v2(reader)?,
            },
            3 => Pubkey::V3 {
                stream,
                body: PubkeyBody::read_v3(reader)?,
            },
            4 => {
                let tag = reader.array()?;
                Pubkey::V4 {
                    stream,
                    tag,
                    body: None,
                    encrypted: Some(CryptoBox::read(reader)?),
                }
            }
            other => {
                return Err(BitmessageError::Format(format!(
                    "Unsupported pubkey version {other}"
                )))
            }
        };
        if !reader.is_empty() {
            return Err(BitmessageError::Format(format!(
                "{} unexpected bytes after pubkey",
                reader.remaining()
            )));
        }
        Ok(pubkey)
    }

    pub fn version(&self) -> u64 {
        match self {
            Pubkey::V2 { .. } => 2,
            Pubkey::V3 { .. } => 3,
            Pubkey::V4 { .. } => 4,
        }
    }

    pub fn stream(&self) -> u64 {
        match self {
            Pubkey::V2 { stream, .. } | Pubkey::V3 { stream, .. } | Pubkey::V4 { stream, .. } => {
                *stream
            }
        }
    }

    pub fn tag(&self) -> Option<&[u8; 32]> {
        match self {
            Pubkey::V4 { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Fails for a v4 pubkey that has not been decrypted yet
    pub fn body(&self) -> Result<&PubkeyBody> {
        match self {
            Pubkey::V2 { body, .. } | Pubkey::V3 { body, .. } => Ok(body),
            Pubkey::V4 { body: Some(body), .. } => Ok(body),
            Pubkey::V4 { body: None, .. } => Err(BitmessageError::InvalidState(
                "Pubkey is still encrypted".to_string(),
            )),
        }
    }

    fn body_mut(&mut self) -> Result<&mut PubkeyBody> {
        match self {
            Pubkey::V2 { body, .. } | Pubkey::V3 { body, .. } => Ok(body),
            Pubkey::V4 { body: Some(body), .. } => Ok(body),
            Pubkey::V4 { body: None, .. } => Err(BitmessageError::InvalidState(
                "Pubkey is still encrypted".to_string(),
            )),
        }
    }

    pub fn ripe(&self, crypto: &dyn Cryptography) -> Result<[u8; 20]> {
        Ok(self.body()?.ripe(crypto))
    }

    pub fn is_signed(&self) -> bool {
        !matches!(self, Pubkey::V2 { .. })
    }

    pub fn is_decrypted(&self) -> bool {
        self.body().is_ok()
    }

    /// Signed bytes after the object header; v4 includes the tag
    pub fn signed_part(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if let Some(tag) = self.tag() {
            out.extend_from_slice(tag);
        }
        self.body()?.write_signed_part(&mut out);
        Ok(out)
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.body().ok().and_then(|body| body.signature())
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) -> Result<()> {
        if !self.is_signed() {
            return Err(BitmessageError::InvalidState(
                "v2 pubkeys are not signed".to_string(),
            ));
        }
        self.body_mut()?.set_signature(signature);
        Ok(())
    }

    /// Encrypt the v4 body with the address' public decryption key
    pub fn encrypt(&mut self, crypto: &dyn Cryptography, public_key: &[u8]) -> Result<()> {
        if let Pubkey::V4 {
            body: Some(body),
            encrypted,
            ..
        } = self
        {
            let mut plain = Vec::new();
            body.write_v3(&mut plain);
            *encrypted = Some(CryptoBox::encrypt(crypto, &plain, public_key)?);
        }
        Ok(())
    }

    pub fn decrypt(&mut self, crypto: &dyn Cryptography, private_key: &[u8]) -> Result<()> {
        if let Pubkey::V4 {
            body,
            encrypted: Some(container),
            ..
        } = self
        {
            let plain = container.decrypt(crypto, private_key)?;
            let mut reader = Reader::new(&plain);
            *body = Some(PubkeyBody::read_v3(&mut reader)?);
        }
        Ok(())
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Pubkey::V2 { body, .. } => body.write_keys(out),
            Pubkey::V3 { body, .. } => body.write_v3(out),
            Pubkey::V4 { tag, encrypted, .. } => {
                let container = encrypted.as_ref().ok_or_else(|| {
                    BitmessageError::InvalidState("v4 pubkey is not encrypted".to_string())
                })?;
                out.extend_from_slice(tag);
                crate::codec::Streamable::write_to(container, out);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;

    fn body(crypto: &dyn Cryptography) -> PubkeyBody {
        let signing = crypto.create_public_key(&crypto.create_private_key()).unwrap();
        let encryption = crypto.create_public_key(&crypto.create_private_key()).unwrap();
        PubkeyBody::new(DOES_ACK, &signing, &encryption, 1000, 1000).unwrap()
    }

    #[test]
    fn test_v2_layout() {
        let crypto = Secp256k1Cryptography::new();
        let pubkey = Pubkey::new(2, 1, body(&crypto), None).unwrap();
        let mut out = Vec::new();
        pubkey.write(&mut out).unwrap();
        assert_eq!(out.len(), 4 + 64 + 64);
        assert_eq!(&out[..4], &[0, 0, 0, 1]);

        let read = Pubkey::read(2, 1, &mut Reader::new(&out)).unwrap();
        assert_eq!(read, pubkey);
        assert!(!read.is_signed());
    }

    #[test]
    fn test_v3_keeps_difficulty_and_signature() {
        let crypto = Secp256k1Cryptography::new();
        let mut body = body(&crypto);
        body.nonce_trials_per_byte = 2000;
        body.extra_bytes = 300;
        let mut pubkey = Pubkey::new(3, 1, body, None).unwrap();
        pubkey.set_signature(vec![0x30, 1, 2, 3]).unwrap();

        let mut out = Vec::new();
        pubkey.write(&mut out).unwrap();
        let read = Pubkey::read(3, 1, &mut Reader::new(&out)).unwrap();
        let read_body = read.body().unwrap();
        assert_eq!(read_body.nonce_trials_per_byte(), 2000);
        assert_eq!(read_body.extra_bytes(), 300);
        assert_eq!(read.signature(), Some(&[0x30, 1, 2, 3][..]));
    }

    #[test]
    fn test_v4_encrypt_decrypt() {
        let crypto = Secp256k1Cryptography::new();
        let decryption_key = crypto.create_private_key();
        let public_key = crypto.create_public_key(&decryption_key).unwrap();
        let original = body(&crypto);

        let mut pubkey = Pubkey::new(4, 1, original.clone(), Some([9u8; 32])).unwrap();
        pubkey.set_signature(vec![1, 2, 3]).unwrap();
        assert!(pubkey.signed_part().unwrap().starts_with(&[9u8; 32]));
        pubkey.encrypt(&crypto, &public_key).unwrap();

        let mut out = Vec::new();
        pubkey.write(&mut out).unwrap();
        assert_eq!(&out[..32], &[9u8; 32]);

        let mut read = Pubkey::read(4, 1, &mut Reader::new(&out)).unwrap();
        assert!(matches!(read.body(), Err(BitmessageError::InvalidState(_))));
        read.decrypt(&crypto, &decryption_key).unwrap();
        assert_eq!(
            read.body().unwrap().signing_key(),
            original.signing_key()
        );
        assert_eq!(read.signature(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_unencrypted_v4_cannot_be_written() {
        let crypto = Secp256k1Cryptography::new();
        let pubkey = Pubkey::new(4, 1, body(&crypto), Some([0u8; 32])).unwrap();
        assert!(matches!(
            pubkey.write(&mut Vec::new()),
            Err(BitmessageError::InvalidState(_))
        ));
    }

    #[test]
    fn test_key_length_validation() {
        assert!(PubkeyBody::new(0, &[4u8; 63], &[4u8; 64], 1, 1).is_err());
        let body = PubkeyBody::new(0, &[4u8; 64], &[4u8; 65], 1, 1).unwrap();
        assert_eq!(body.signing_key().len(), 65);
        assert_eq!(body.signing_key()[0], 0x04);
    }

    #[test]
    fn test_behavior_flags() {
        let body = PubkeyBody::new(DOES_ACK | INCLUDE_DESTINATION, &[4u8; 64], &[4u8; 64], 1, 1)
            .unwrap();
        assert!(body.has_behavior(DOES_ACK));
        assert!(body.has_behavior(INCLUDE_DESTINATION));
        let body = PubkeyBody::new(0, &[4u8; 64], &[4u8; 64], 1, 1).unwrap();
        assert!(!body.has_behavior(DOES_ACK));
    }
}
