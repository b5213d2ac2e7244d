//! Broadcasts, readable by everyone who knows the sender's address
//!
//! v4 broadcasts (sent from v2/v3 addresses) are encrypted with
//! `sha512(version stream ripe)[..32]`. v5 broadcasts (sent from v4
//! addresses) use the first half of the address' double hash and carry the
//! tag in front of the box so subscribers can find them.

use crate::codec::Reader;
use crate::crypto::{CryptoBox, Cryptography};
use crate::error::{BitmessageError, Result};
use crate::message::{Plaintext, PlaintextType};

#[derive(Debug, Clone, PartialEq)]
pub struct Broadcast {
    version: u64,
    stream: u64,
    tag: Option<[u8; 32]>,
    plaintext: Option<Plaintext>,
    encrypted: Option<CryptoBox>,
}

impl Broadcast {
    /// The version is chosen by the sender's address version
    pub fn new(plaintext: Plaintext) -> Result<Broadcast> {
        if plaintext.message_type() != PlaintextType::Broadcast {
            return Err(BitmessageError::InvalidState(
                "Msg content cannot be broadcast".to_string(),
            ));
        }
        let from = plaintext.from();
        let (version, tag) = if from.version() >= 4 {
            let tag = from.tag().copied().ok_or_else(|| {
                BitmessageError::InvalidState(format!("{} has no tag", from.address()))
            })?;
            (5, Some(tag))
        } else {
            (4, None)
        };
        Ok(Broadcast {
            version,
            stream: from.stream(),
            tag,
            plaintext: Some(plaintext),
            encrypted: None,
        })
    }

    pub fn read(version: u64, stream: u64, reader: &mut Reader<'_>) -> Result<Broadcast> {
        let tag = match version {
            4 => None,
            5 => Some(reader.array::<32>()?),
            other => {
                return Err(BitmessageError::Format(format!(
                    "Unsupported broadcast version {other}"
                )))
            }
        };
        Ok(Broadcast {
            version,
            stream,
            tag,
            plaintext: None,
            encrypted: Some(CryptoBox::read(reader)?),
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    pub fn tag(&self) -> Option<&[u8; 32]> {
        self.tag.as_ref()
    }

    pub fn plaintext(&self) -> Result<&Plaintext> {
        self.plaintext.as_ref().ok_or_else(|| {
            BitmessageError::InvalidState("Broadcast is not decrypted".to_string())
        })
    }

    pub fn plaintext_mut(&mut self) -> Result<&mut Plaintext> {
        self.plaintext.as_mut().ok_or_else(|| {
            BitmessageError::InvalidState("Broadcast is not decrypted".to_string())
        })
    }

    pub fn into_plaintext(self) -> Option<Plaintext> {
        self.plaintext
    }

    pub fn is_decrypted(&self) -> bool {
        self.plaintext.is_some()
    }

    /// v5 signs the tag in front of the plaintext
    pub fn signed_part(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if let Some(tag) = &self.tag {
            out.extend_from_slice(tag);
        }
        out.extend_from_slice(&self.plaintext()?.bytes_without_signature()?);
        Ok(out)
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.plaintext.as_ref().and_then(|p| p.signature())
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) -> Result<()> {
        self.plaintext_mut()?.set_signature(signature);
        Ok(())
    }

    /// Encrypt with the public key of the sender's broadcast key
    pub fn encrypt_with_sender_key(&mut self, crypto: &dyn Cryptography) -> Result<()> {
        let public_key = crypto.create_public_key(self.plaintext()?.from().broadcast_key())?;
        self.encrypt(crypto, &public_key)
    }

    pub fn encrypt(&mut self, crypto: &dyn Cryptography, public_key: &[u8]) -> Result<()> {
        let plain = self.plaintext()?.to_bytes()?;
        self.encrypted = Some(CryptoBox::encrypt(crypto, &plain, public_key)?);
        Ok(())
    }

    /// Decrypt with a subscribed address' broadcast key
    pub fn decrypt(&mut self, crypto: &dyn Cryptography, private_key: &[u8]) -> Result<()> {
        let container = self.encrypted.as_ref().ok_or_else(|| {
            BitmessageError::InvalidState("Broadcast is not encrypted".to_string())
        })?;
        let plain = container.decrypt(crypto, private_key)?;
        let mut reader = Reader::new(&plain);
        let plaintext = Plaintext::read(crypto, PlaintextType::Broadcast, &mut reader)
            .map_err(|e| BitmessageError::DecryptionFailed(format!("Unreadable broadcast: {e}")))?;
        if let Some(tag) = &self.tag {
            if plaintext.from().tag() != Some(tag) {
                return Err(BitmessageError::DecryptionFailed(format!(
                    "Broadcast tag does not belong to {}",
                    plaintext.from().address()
                )));
            }
        }
        self.plaintext = Some(plaintext);
        Ok(())
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let container = self.encrypted.as_ref().ok_or_else(|| {
            BitmessageError::InvalidState("Broadcast is not encrypted".to_string())
        })?;
        if let Some(tag) = &self.tag {
            out.extend_from_slice(tag);
        }
        crate::codec::Streamable::write_to(container, out);
        Ok(())
    }
}
