use crate::error::{BitmessageError, Result};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::ZeroizeOnDrop;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Secure key wrapper that automatically zeros memory on drop
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureKey {
    key: Vec<u8>,
}

impl SecureKey {
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl std::fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureKey")
            .field("length", &self.key.len())
            .finish()
    }
}

/// AES-256-CBC with PKCS7 padding, the symmetric half of the message box
pub struct Aes256CbcCipher {
    key: SecureKey,
}

impl Aes256CbcCipher {
    pub fn new(key: SecureKey) -> Result<Self> {
        Self::validate_key(key.as_bytes())?;
        Ok(Self { key })
    }

    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self> {
        Self::new(SecureKey::new(key_bytes.to_vec()))
    }

    pub fn encrypt(&self, plaintext: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        Self::validate_iv(iv)?;
        let cipher = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), iv).map_err(|e| {
            BitmessageError::Crypto(format!("AES-256-CBC initialisation failed: {e}"))
        })?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    /// Fails on bad padding; a tampered or wrongly keyed ciphertext never
    /// yields plaintext.
    pub fn decrypt(&self, ciphertext: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        Self::validate_iv(iv)?;
        if ciphertext.is_empty() || ciphertext.len() % Self::block_length() != 0 {
            return Err(BitmessageError::DecryptionFailed(format!(
                "Ciphertext length {} is not a positive multiple of the block size",
                ciphertext.len()
            )));
        }
        let cipher = Aes256CbcDec::new_from_slices(self.key.as_bytes(), iv).map_err(|e| {
            BitmessageError::Crypto(format!("AES-256-CBC initialisation failed: {e}"))
        })?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| BitmessageError::DecryptionFailed("Invalid padding".to_string()))
    }

    pub fn validate_key(key: &[u8]) -> Result<()> {
        if key.len() != Self::key_length() {
            return Err(BitmessageError::Crypto(
                "AES-256-CBC requires a 32-byte key".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_iv(iv: &[u8]) -> Result<()> {
        if iv.len() != Self::iv_length() {
            return Err(BitmessageError::Crypto(
                "AES-256-CBC requires a 16-byte IV".to_string(),
            ));
        }
        Ok(())
    }

    pub const fn key_length() -> usize {
        32
    }

    pub const fn iv_length() -> usize {
        16
    }

    pub const fn block_length() -> usize {
        16
    }
}
