use crate::codec::{encode, Reader, MAX_SIGNATURE_LENGTH};
use crate::core::payload::{Pubkey, PubkeyBody, DOES_ACK};
use crate::core::proof_of_work::{DEFAULT_EXTRA_BYTES, DEFAULT_NONCE_TRIALS_PER_BYTE};
use crate::crypto::{Cryptography, SecureKey};
use crate::error::{BitmessageError, Result};
use crate::wallet::address::{address_tag, RIPE_LENGTH};
use log::debug;

/// Random key generation gives up after this many candidate pairs. A
/// shorter address needs ~65536 attempts on average.
pub const MAX_KEY_ATTEMPTS: u32 = 10_000_000;

const PRIVATE_KEY_LENGTH: usize = 32;

/// Signing and encryption keys of one of our identities, with the pubkey
/// they produce. Secret bytes are wiped when dropped.
#[derive(Debug, Clone)]
pub struct PrivateKey {
    version: u64,
    stream: u64,
    private_signing_key: SecureKey,
    private_encryption_key: SecureKey,
    pubkey: Pubkey,
}

fn leading_zeros_ok(ripe: &[u8; RIPE_LENGTH], shorter: bool) -> bool {
    let required = if shorter { 2 } else { 1 };
    ripe[..required].iter().all(|b| *b == 0)
}

impl PrivateKey {
    /// Fresh random v4 identity whose ripe starts with one zero byte, or
    /// two if `shorter`.
    pub fn random(
        crypto: &dyn Cryptography,
        shorter: bool,
        stream: u64,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
        behavior_bitfield: u32,
    ) -> Result<PrivateKey> {
        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let signing = crypto.create_private_key();
            let encryption = crypto.create_private_key();
            let signing_public = crypto.create_public_key(&signing)?;
            let encryption_public = crypto.create_public_key(&encryption)?;
            let ripe = crypto.ripe_of(&[&signing_public, &encryption_public]);
            if leading_zeros_ok(&ripe, shorter) {
                debug!("Found suitable key pair after {attempt} attempts");
                let body = PubkeyBody::new(
                    behavior_bitfield,
                    &signing_public,
                    &encryption_public,
                    nonce_trials_per_byte,
                    extra_bytes,
                )?;
                return Self::assemble(crypto, 4, stream, &signing, &encryption, body, ripe);
            }
        }
        Err(BitmessageError::Crypto(format!(
            "No suitable key pair in {MAX_KEY_ATTEMPTS} attempts"
        )))
    }

    /// `count` identities derived from `passphrase`.
    ///
    /// Candidate keys are `sha512(passphrase || varint(nonce))[..32]` with the
    /// signing nonce starting at 0 and the encryption nonce at 1, both
    /// advancing by 2 per candidate and carrying over between identities.
    pub fn deterministic(
        crypto: &dyn Cryptography,
        passphrase: &str,
        count: usize,
        version: u64,
        stream: u64,
        shorter: bool,
    ) -> Result<Vec<PrivateKey>> {
        let mut keys = Vec::with_capacity(count);
        let mut signing_nonce = 0u64;
        let mut encryption_nonce = 1u64;

        for _ in 0..count {
            let mut found = None;
            for _ in 0..MAX_KEY_ATTEMPTS {
                let signing = derive(crypto, passphrase, signing_nonce);
                let encryption = derive(crypto, passphrase, encryption_nonce);
                signing_nonce += 2;
                encryption_nonce += 2;

                let signing_public = crypto.create_public_key(&signing)?;
                let encryption_public = crypto.create_public_key(&encryption)?;
                let ripe = crypto.ripe_of(&[&signing_public, &encryption_public]);
                if leading_zeros_ok(&ripe, shorter) {
                    let body = PubkeyBody::new(
                        DOES_ACK,
                        &signing_public,
                        &encryption_public,
                        DEFAULT_NONCE_TRIALS_PER_BYTE,
                        DEFAULT_EXTRA_BYTES,
                    )?;
                    found = Some(Self::assemble(
                        crypto,
                        version,
                        stream,
                        &signing,
                        &encryption,
                        body,
                        ripe,
                    )?);
                    break;
                }
            }
            match found {
                Some(key) => keys.push(key),
                None => {
                    return Err(BitmessageError::Crypto(format!(
                        "No suitable key pair in {MAX_KEY_ATTEMPTS} attempts"
                    )))
                }
            }
        }
        Ok(keys)
    }

    /// Identity from known private keys (e.g. WIF imports)
    #[allow(clippy::too_many_arguments)]
    pub fn from_keys(
        crypto: &dyn Cryptography,
        version: u64,
        stream: u64,
        private_signing_key: &[u8],
        private_encryption_key: &[u8],
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
        behavior_bitfield: u32,
    ) -> Result<PrivateKey> {
        let signing_public = crypto.create_public_key(private_signing_key)?;
        let encryption_public = crypto.create_public_key(private_encryption_key)?;
        let body = PubkeyBody::new(
            behavior_bitfield,
            &signing_public,
            &encryption_public,
            nonce_trials_per_byte,
            extra_bytes,
        )?;
        let ripe = body.ripe(crypto);
        Self::assemble(
            crypto,
            version,
            stream,
            private_signing_key,
            private_encryption_key,
            body,
            ripe,
        )
    }

    fn assemble(
        crypto: &dyn Cryptography,
        version: u64,
        stream: u64,
        private_signing_key: &[u8],
        private_encryption_key: &[u8],
        body: PubkeyBody,
        ripe: [u8; RIPE_LENGTH],
    ) -> Result<PrivateKey> {
        if private_signing_key.len() != PRIVATE_KEY_LENGTH
            || private_encryption_key.len() != PRIVATE_KEY_LENGTH
        {
            return Err(BitmessageError::Crypto(
                "Private keys must be 32 bytes".to_string(),
            ));
        }
        let tag = (version >= 4).then(|| address_tag(crypto, version, stream, &ripe));
        Ok(PrivateKey {
            version,
            stream,
            private_signing_key: SecureKey::new(private_signing_key.to_vec()),
            private_encryption_key: SecureKey::new(private_encryption_key.to_vec()),
            pubkey: Pubkey::new(version, stream, body, tag)?,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    pub fn private_signing_key(&self) -> &[u8] {
        self.private_signing_key.as_bytes()
    }

    pub fn private_encryption_key(&self) -> &[u8] {
        self.private_encryption_key.as_bytes()
    }

    pub fn pubkey(&self) -> &Pubkey {
        &self.pubkey
    }

    /// `varint(version) varint(stream) varbytes(pubkey) varbytes(signingKey)
    /// varbytes(encryptionKey)`; the pubkey is in its unencrypted v2/v3 form.
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        let body = self.pubkey.body()?;
        let mut pubkey_bytes = Vec::new();
        if self.version == 2 {
            body.write_keys(&mut pubkey_bytes);
        } else {
            body.write_v3(&mut pubkey_bytes);
        }
        encode::var_int(self.version, out);
        encode::var_int(self.stream, out);
        encode::var_bytes(&pubkey_bytes, out);
        encode::var_bytes(self.private_signing_key.as_bytes(), out);
        encode::var_bytes(self.private_encryption_key.as_bytes(), out);
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    /// Inverse of [`PrivateKey::write`]; the stored pubkey must match the
    /// private keys.
    pub fn read(crypto: &dyn Cryptography, reader: &mut Reader<'_>) -> Result<PrivateKey> {
        let version = reader.var_int()?;
        let stream = reader.var_int()?;
        let pubkey_bytes = reader.var_bytes(4 + 128 + 18 + MAX_SIGNATURE_LENGTH)?;
        let signing = reader.var_bytes(PRIVATE_KEY_LENGTH)?.to_vec();
        let encryption = reader.var_bytes(PRIVATE_KEY_LENGTH)?.to_vec();

        let mut pubkey_reader = Reader::new(pubkey_bytes);
        let body = if version == 2 {
            PubkeyBody::read_v2(&mut pubkey_reader)?
        } else {
            PubkeyBody::read_v3(&mut pubkey_reader)?
        };

        if crypto.create_public_key(&signing)? != body.signing_key()
            || crypto.create_public_key(&encryption)? != body.encryption_key()
        {
            return Err(BitmessageError::Crypto(
                "Stored pubkey does not match the private keys".to_string(),
            ));
        }
        let ripe = body.ripe(crypto);
        Self::assemble(crypto, version, stream, &signing, &encryption, body, ripe)
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.stream == other.stream
            && self.private_signing_key.as_bytes() == other.private_signing_key.as_bytes()
            && self.private_encryption_key.as_bytes() == other.private_encryption_key.as_bytes()
    }
}

fn derive(crypto: &dyn Cryptography, passphrase: &str, nonce: u64) -> [u8; 32] {
    let hash = crypto.sha512(&[passphrase.as_bytes(), &encode::var_int_bytes(nonce)]);
    let mut key = [0u8; 32];
    key.copy_from_slice(&hash[..32]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;
    use crate::wallet::BitmessageAddress;

    #[test]
    fn test_random_key_has_leading_zero() {
        let crypto = Secp256k1Cryptography::new();
        let key = PrivateKey::random(&crypto, false, 1, 1000, 1000, DOES_ACK).unwrap();
        assert_eq!(key.version(), 4);
        let ripe = key.pubkey().ripe(&crypto).unwrap();
        assert_eq!(ripe[0], 0);
        assert!(key.pubkey().tag().is_some());
    }

    #[test]
    fn test_deterministic_fixture() {
        let crypto = Secp256k1Cryptography::new();
        let keys = PrivateKey::deterministic(&crypto, "test", 2, 4, 1, false).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(
            hex::encode(keys[0].private_signing_key()),
            "5eb980c820acf2d44c2864716e0504f70e4139dbd27aecd0a56aed875eea122a"
        );
        assert_eq!(
            hex::encode(keys[0].private_encryption_key()),
            "1a231b18a4174df1c5c3a502dc13af885cf735e377ae4b8bd886e810b556ca1c"
        );

        let first = BitmessageAddress::from_private_key(&crypto, keys[0].clone()).unwrap();
        let second = BitmessageAddress::from_private_key(&crypto, keys[1].clone()).unwrap();
        assert_eq!(first.address(), "BM-2cWFkyuXXFw6d393RGnin2RpSXj8wxtt6F");
        assert_eq!(second.address(), "BM-2cX8TF9vuQZEWvT7UrEeq1HN9dgiSUPLEN");
    }

    #[test]
    fn test_deterministic_v3_fixture() {
        let crypto = Secp256k1Cryptography::new();
        let keys = PrivateKey::deterministic(&crypto, "test", 1, 3, 1, false).unwrap();
        let address = BitmessageAddress::from_private_key(&crypto, keys[0].clone()).unwrap();
        assert_eq!(address.address(), "BM-2DAemscEp5UDobzxPrTQHuA2p2UCCqUDKz");
    }

    #[test]
    fn test_deterministic_is_repeatable() {
        let crypto = Secp256k1Cryptography::new();
        let a = PrivateKey::deterministic(&crypto, "correct horse", 1, 4, 1, false).unwrap();
        let b = PrivateKey::deterministic(&crypto, "correct horse", 1, 4, 1, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_blob_round_trip() {
        let crypto = Secp256k1Cryptography::new();
        let key = PrivateKey::deterministic(&crypto, "blob", 1, 4, 1, false)
            .unwrap()
            .remove(0);
        let bytes = key.to_bytes().unwrap();
        let mut reader = Reader::new(&bytes);
        let read = PrivateKey::read(&crypto, &mut reader).unwrap();
        assert!(reader.is_empty());
        assert_eq!(read, key);
        assert_eq!(read.pubkey(), key.pubkey());
    }

    #[test]
    fn test_blob_with_foreign_pubkey_rejected() {
        let crypto = Secp256k1Cryptography::new();
        let mut keys = PrivateKey::deterministic(&crypto, "mix", 2, 3, 1, false).unwrap();
        let second = keys.remove(1);
        let first = keys.remove(0);

        let mut pubkey_bytes = Vec::new();
        second.pubkey().body().unwrap().write_v3(&mut pubkey_bytes);
        let mut blob = Vec::new();
        encode::var_int(3, &mut blob);
        encode::var_int(1, &mut blob);
        encode::var_bytes(&pubkey_bytes, &mut blob);
        encode::var_bytes(first.private_signing_key(), &mut blob);
        encode::var_bytes(first.private_encryption_key(), &mut blob);

        assert!(matches!(
            PrivateKey::read(&crypto, &mut Reader::new(&blob)),
            Err(BitmessageError::Crypto(_))
        ));
    }

    #[test]
    fn test_from_keys_matches_deterministic() {
        let crypto = Secp256k1Cryptography::new();
        let key = PrivateKey::deterministic(&crypto, "test", 1, 4, 1, false)
            .unwrap()
            .remove(0);
        let rebuilt = PrivateKey::from_keys(
            &crypto,
            4,
            1,
            key.private_signing_key(),
            key.private_encryption_key(),
            DEFAULT_NONCE_TRIALS_PER_BYTE,
            DEFAULT_EXTRA_BYTES,
            DOES_ACK,
        )
        .unwrap();
        assert_eq!(rebuilt.pubkey(), key.pubkey());
    }
}
