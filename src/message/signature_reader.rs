use crate::codec::{Reader, MAX_SIGNATURE_LENGTH};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use std::ops::{Deref, DerefMut};

/// Reader that remembers where signed data starts.
///
/// Everything read through it is signed data; [`verify`](Self::verify)
/// then reads the trailing signature and checks it against those bytes.
pub struct SignatureCheckingReader<'r, 'a> {
    reader: &'r mut Reader<'a>,
    start: usize,
}

impl<'r, 'a> SignatureCheckingReader<'r, 'a> {
    pub fn new(reader: &'r mut Reader<'a>) -> Self {
        let start = reader.position();
        SignatureCheckingReader { reader, start }
    }

    /// Bytes consumed so far
    pub fn signed_bytes(&self) -> &'a [u8] {
        self.reader.consumed_since(self.start)
    }

    pub fn verify(self, crypto: &dyn Cryptography, public_signing_key: &[u8]) -> Result<()> {
        let signed = self.reader.consumed_since(self.start);
        let signature = self.reader.var_bytes(MAX_SIGNATURE_LENGTH)?;
        if signature.is_empty() {
            return Err(BitmessageError::SignatureInvalid(
                "Signature missing".to_string(),
            ));
        }
        if !crypto.is_signature_valid(signed, signature, public_signing_key) {
            return Err(BitmessageError::SignatureInvalid(
                "Signature does not match the signed data".to_string(),
            ));
        }
        Ok(())
    }
}

impl<'r, 'a> Deref for SignatureCheckingReader<'r, 'a> {
    type Target = Reader<'a>;

    fn deref(&self) -> &Reader<'a> {
        self.reader
    }
}

impl<'r, 'a> DerefMut for SignatureCheckingReader<'r, 'a> {
    fn deref_mut(&mut self) -> &mut Reader<'a> {
        self.reader
    }
}
