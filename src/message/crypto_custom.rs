use crate::codec::{encode, Reader, Readable, Streamable};
use crate::crypto::{CryptoBox, Cryptography};
use crate::error::{BitmessageError, Result};
use crate::message::{read_sender, write_sender, SignatureCheckingReader};
use crate::network::CustomMessage;
use crate::wallet::BitmessageAddress;

/// Command of the `custom` frame that carries these messages
pub const COMMAND_ENCRYPTED: &str = "ENCRYPTED";

/// Arbitrary data signed by one identity and encrypted for another.
///
/// The encrypted bytes are the sender block, the data, and a signature over
/// both.
#[derive(Debug, Clone)]
pub struct CryptoCustomMessage<T> {
    sender: Option<BitmessageAddress>,
    plain: Option<T>,
    container: Option<CryptoBox>,
}

impl<T: Streamable + Readable> CryptoCustomMessage<T> {
    pub fn new(plain: T) -> Self {
        CryptoCustomMessage {
            sender: None,
            plain: Some(plain),
            container: None,
        }
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(CryptoCustomMessage {
            sender: None,
            plain: None,
            container: Some(CryptoBox::read(reader)?),
        })
    }

    pub fn from_custom_message(message: &CustomMessage) -> Result<Self> {
        if message.command() != COMMAND_ENCRYPTED {
            return Err(BitmessageError::Format(format!(
                "Expected custom command {COMMAND_ENCRYPTED}, got {}",
                message.command()
            )));
        }
        Self::read(&mut Reader::new(message.data()))
    }

    /// Sign with `identity`'s private signing key and encrypt to
    /// `public_encryption_key`
    pub fn sign_and_encrypt(
        &mut self,
        crypto: &dyn Cryptography,
        identity: &BitmessageAddress,
        public_encryption_key: &[u8],
    ) -> Result<()> {
        let private_key = identity.private_key().ok_or_else(|| {
            BitmessageError::InvalidState(format!(
                "{} is not one of our identities",
                identity.address()
            ))
        })?;
        let plain = self.plain.as_ref().ok_or_else(|| {
            BitmessageError::InvalidState("Nothing to encrypt".to_string())
        })?;

        let mut out = Vec::new();
        write_sender(identity, &mut out)?;
        plain.write_to(&mut out);
        let signature = crypto.sign(&out, private_key.private_signing_key())?;
        encode::var_bytes(&signature, &mut out);

        self.container = Some(CryptoBox::encrypt(crypto, &out, public_encryption_key)?);
        self.sender = Some(identity.clone());
        Ok(())
    }

    /// Decrypt and check the sender's signature; any failure is fatal
    pub fn decrypt(&mut self, crypto: &dyn Cryptography, private_key: &[u8]) -> Result<&T> {
        let container = self.container.as_ref().ok_or_else(|| {
            BitmessageError::InvalidState("Nothing to decrypt".to_string())
        })?;
        let plain_bytes = container.decrypt(crypto, private_key)?;

        let mut reader = Reader::new(&plain_bytes);
        let mut checking = SignatureCheckingReader::new(&mut reader);
        let sender = read_sender(crypto, &mut checking)?;
        let data = T::read_from(&mut checking)?;
        let signing_key = match sender.pubkey() {
            Some(pubkey) => pubkey.body()?.signing_key().to_vec(),
            None => {
                return Err(BitmessageError::SignatureInvalid(
                    "Sender has no signing key".to_string(),
                ))
            }
        };
        checking.verify(crypto, &signing_key)?;

        self.sender = Some(sender);
        Ok(self.plain.insert(data))
    }

    pub fn sender(&self) -> Option<&BitmessageAddress> {
        self.sender.as_ref()
    }

    pub fn plain(&self) -> Option<&T> {
        self.plain.as_ref()
    }

    pub fn to_custom_message(&self) -> Result<CustomMessage> {
        let container = self.container.as_ref().ok_or_else(|| {
            BitmessageError::InvalidState("Message is not encrypted".to_string())
        })?;
        Ok(CustomMessage::new(COMMAND_ENCRYPTED, container.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;
    use crate::wallet::PrivateKey;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        topic: String,
        count: u64,
    }

    impl Streamable for Note {
        fn write_to(&self, out: &mut Vec<u8>) {
            encode::var_string(&self.topic, out);
            encode::var_int(self.count, out);
        }
    }

    impl Readable for Note {
        fn read_from(reader: &mut Reader<'_>) -> Result<Note> {
            Ok(Note {
                topic: reader.var_string(256)?,
                count: reader.var_int()?,
            })
        }
    }

    fn identity(crypto: &dyn Cryptography, passphrase: &str, version: u64) -> BitmessageAddress {
        let key = PrivateKey::deterministic(crypto, passphrase, 1, version, 1, false)
            .unwrap()
            .remove(0);
        BitmessageAddress::from_private_key(crypto, key).unwrap()
    }

    fn encryption_key(address: &BitmessageAddress) -> Vec<u8> {
        address
            .pubkey()
            .unwrap()
            .body()
            .unwrap()
            .encryption_key()
            .to_vec()
    }

    #[test]
    fn test_sign_encrypt_decrypt() {
        let crypto = Secp256k1Cryptography::new();
        let sender = identity(&crypto, "custom sender", 4);
        let recipient = identity(&crypto, "custom recipient", 4);
        let note = Note {
            topic: "status".to_string(),
            count: 42,
        };

        let mut message = CryptoCustomMessage::new(note.clone());
        message
            .sign_and_encrypt(&crypto, &sender, &encryption_key(&recipient))
            .unwrap();
        let custom = message.to_custom_message().unwrap();
        assert_eq!(custom.command(), COMMAND_ENCRYPTED);

        let mut received = CryptoCustomMessage::<Note>::from_custom_message(&custom).unwrap();
        let private_key = recipient.private_key().unwrap().private_encryption_key().to_vec();
        assert_eq!(received.decrypt(&crypto, &private_key).unwrap(), &note);
        assert_eq!(received.sender().unwrap().address(), sender.address());
    }

    #[test]
    fn test_v3_sender() {
        let crypto = Secp256k1Cryptography::new();
        let sender = identity(&crypto, "v3 sender", 3);
        let recipient = identity(&crypto, "custom recipient", 4);
        let mut message = CryptoCustomMessage::new(Note {
            topic: "x".to_string(),
            count: 1,
        });
        message
            .sign_and_encrypt(&crypto, &sender, &encryption_key(&recipient))
            .unwrap();
        let private_key = recipient.private_key().unwrap().private_encryption_key().to_vec();
        message.decrypt(&crypto, &private_key).unwrap();
        assert_eq!(message.sender().unwrap().version(), 3);
    }

    #[test]
    fn test_forged_signature_is_fatal() {
        let crypto = Secp256k1Cryptography::new();
        let sender = identity(&crypto, "custom sender", 4);
        let impostor = identity(&crypto, "impostor", 4);
        let recipient = identity(&crypto, "custom recipient", 4);

        // Sender block of `sender`, signature by `impostor`
        let mut out = Vec::new();
        write_sender(&sender, &mut out).unwrap();
        Note {
            topic: "forged".to_string(),
            count: 0,
        }
        .write_to(&mut out);
        let signature = crypto
            .sign(&out, impostor.private_key().unwrap().private_signing_key())
            .unwrap();
        encode::var_bytes(&signature, &mut out);
        let container = CryptoBox::encrypt(&crypto, &out, &encryption_key(&recipient)).unwrap();

        let mut message =
            CryptoCustomMessage::<Note>::read(&mut Reader::new(&container.to_bytes())).unwrap();
        let private_key = recipient.private_key().unwrap().private_encryption_key().to_vec();
        assert!(matches!(
            message.decrypt(&crypto, &private_key),
            Err(BitmessageError::SignatureInvalid(_))
        ));
        assert!(message.sender().is_none());
    }

    #[test]
    fn test_wrong_recipient_key() {
        let crypto = Secp256k1Cryptography::new();
        let sender = identity(&crypto, "custom sender", 4);
        let recipient = identity(&crypto, "custom recipient", 4);
        let mut message = CryptoCustomMessage::new(Note {
            topic: "x".to_string(),
            count: 1,
        });
        message
            .sign_and_encrypt(&crypto, &sender, &encryption_key(&recipient))
            .unwrap();
        let wrong = sender.private_key().unwrap().private_encryption_key().to_vec();
        assert!(matches!(
            message.decrypt(&crypto, &wrong),
            Err(BitmessageError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_wrong_command_rejected() {
        let custom = CustomMessage::new("PLAIN", vec![0u8; 10]);
        assert!(matches!(
            CryptoCustomMessage::<Note>::from_custom_message(&custom),
            Err(BitmessageError::Format(_))
        ));
    }
}
