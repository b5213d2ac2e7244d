use crate::codec::Reader;
use crate::crypto::{CryptoBox, Cryptography};
use crate::error::{BitmessageError, Result};
use crate::message::{Plaintext, PlaintextType};

/// A person-to-person message. On the wire it is only a [`CryptoBox`]; the
/// plaintext is known after encryption by the sender or decryption by the
/// recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct Msg {
    stream: u64,
    plaintext: Option<Plaintext>,
    encrypted: Option<CryptoBox>,
}

impl Msg {
    pub const VERSION: u64 = 1;

    pub fn new(plaintext: Plaintext) -> Result<Msg> {
        if plaintext.message_type() != PlaintextType::Msg {
            return Err(BitmessageError::InvalidState(
                "Broadcast content cannot be sent as msg".to_string(),
            ));
        }
        Ok(Msg {
            stream: plaintext.stream(),
            plaintext: Some(plaintext),
            encrypted: None,
        })
    }

    pub fn read(stream: u64, reader: &mut Reader<'_>) -> Result<Msg> {
        Ok(Msg {
            stream,
            plaintext: None,
            encrypted: Some(CryptoBox::read(reader)?),
        })
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    pub fn plaintext(&self) -> Result<&Plaintext> {
        self.plaintext
            .as_ref()
            .ok_or_else(|| BitmessageError::InvalidState("Msg is not decrypted".to_string()))
    }

    pub fn plaintext_mut(&mut self) -> Result<&mut Plaintext> {
        self.plaintext
            .as_mut()
            .ok_or_else(|| BitmessageError::InvalidState("Msg is not decrypted".to_string()))
    }

    pub fn into_plaintext(self) -> Option<Plaintext> {
        self.plaintext
    }

    pub fn is_decrypted(&self) -> bool {
        self.plaintext.is_some()
    }

    pub fn signed_part(&self) -> Result<Vec<u8>> {
        self.plaintext()?.bytes_without_signature()
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.plaintext.as_ref().and_then(|p| p.signature())
    }

    pub fn set_signature(&mut self, signature: Vec<u8>) -> Result<()> {
        self.plaintext_mut()?.set_signature(signature);
        Ok(())
    }

    /// Encrypt the signed plaintext to the recipient's encryption key
    pub fn encrypt(&mut self, crypto: &dyn Cryptography, public_key: &[u8]) -> Result<()> {
        let plain = self.plaintext()?.to_bytes()?;
        self.encrypted = Some(CryptoBox::encrypt(crypto, &plain, public_key)?);
        Ok(())
    }

    pub fn decrypt(&mut self, crypto: &dyn Cryptography, private_key: &[u8]) -> Result<()> {
        let container = self
            .encrypted
            .as_ref()
            .ok_or_else(|| BitmessageError::InvalidState("Msg is not encrypted".to_string()))?;
        let plain = container.decrypt(crypto, private_key)?;
        let mut reader = Reader::new(&plain);
        let plaintext = Plaintext::read(crypto, PlaintextType::Msg, &mut reader)
            .map_err(|e| BitmessageError::DecryptionFailed(format!("Unreadable msg: {e}")))?;
        self.plaintext = Some(plaintext);
        Ok(())
    }

    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let container = self
            .encrypted
            .as_ref()
            .ok_or_else(|| BitmessageError::InvalidState("Msg is not encrypted".to_string()))?;
        crate::codec::Streamable::write_to(container, out);
        Ok(())
    }
}
