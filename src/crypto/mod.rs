//! Cryptography port
//!
//! Everything that hashes, signs, encrypts or derives keys goes through the
//! [`Cryptography`] trait. Components receive an implementation explicitly
//! (usually as `Arc<dyn Cryptography>`); there is no process-wide instance.
//! [`Secp256k1Cryptography`] is the implementation used in production.

pub mod cipher;
pub mod crypto_box;
pub mod secp256k1;

pub use cipher::{Aes256CbcCipher, SecureKey};
pub use crypto_box::CryptoBox;
pub use secp256k1::Secp256k1Cryptography;

use crate::core::{proof_of_work, ObjectMessage};
use crate::error::Result;
use crate::pow::{PowCallback, ProofOfWorkEngine};
use crate::utils::unix_time;

/// Hashing, ECDSA, ECDH and AES primitives over secp256k1.
///
/// Hash functions take their input as a list of parts that are hashed as
/// if concatenated.
pub trait Cryptography: Send + Sync {
    fn sha1(&self, data: &[&[u8]]) -> [u8; 20];

    fn sha256(&self, data: &[&[u8]]) -> [u8; 32];

    fn sha512(&self, data: &[&[u8]]) -> [u8; 64];

    fn ripemd160(&self, data: &[&[u8]]) -> [u8; 20];

    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> [u8; 32];

    /// Constant-time check of `tag` against HMAC-SHA256(key, data)
    fn hmac_sha256_verify(&self, key: &[u8], data: &[u8], tag: &[u8]) -> bool;

    fn random_bytes(&self, length: usize) -> Vec<u8>;

    /// A random scalar that is a valid secp256k1 private key
    fn create_private_key(&self) -> [u8; 32];

    /// Uncompressed (65 byte, `0x04` prefixed) public key for `private_key`
    fn create_public_key(&self, private_key: &[u8]) -> Result<Vec<u8>>;

    /// DER-encoded ECDSA signature over the SHA-256 digest of `data`
    fn sign(&self, data: &[u8], private_key: &[u8]) -> Result<Vec<u8>>;

    /// Accepts SHA-256 or SHA-1 signed digests in either S form
    fn is_signature_valid(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool;

    /// AES-256-CBC with PKCS7 padding
    fn crypt(&self, encrypt: bool, data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>>;

    /// Point multiplication, returns the uncompressed product point
    fn multiply(&self, point: &[u8], scalar: &[u8]) -> Result<Vec<u8>>;

    fn double_sha512(&self, data: &[&[u8]]) -> [u8; 64] {
        let first = self.sha512(data);
        self.sha512(&[&first])
    }

    fn double_sha256(&self, data: &[&[u8]]) -> [u8; 32] {
        let first = self.sha256(data);
        self.sha256(&[&first])
    }

    /// RIPEMD160(SHA512(data))
    fn ripe_of(&self, data: &[&[u8]]) -> [u8; 20] {
        let sha = self.sha512(data);
        self.ripemd160(&[&sha])
    }

    /// SHA-512 over the object without its nonce
    fn initial_hash(&self, object: &ObjectMessage) -> Result<[u8; 64]> {
        let bytes = object.payload_bytes_without_nonce()?;
        Ok(self.sha512(&[&bytes]))
    }

    fn proof_of_work_target(
        &self,
        object: &ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<u64> {
        let length = object.payload_bytes_without_nonce()?.len() as u64;
        let ttl = object.expires_time().saturating_sub(unix_time());
        Ok(proof_of_work::target(
            length,
            nonce_trials_per_byte,
            extra_bytes,
            ttl,
        ))
    }

    /// Fails with `InsufficientProofOfWork` unless the object's nonce
    /// meets its target.
    fn check_proof_of_work(
        &self,
        object: &ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<()> {
        let target = self.proof_of_work_target(object, nonce_trials_per_byte, extra_bytes)?;
        let initial_hash = self.initial_hash(object)?;
        let nonce = object.nonce().unwrap_or([0u8; 8]);
        let value = proof_of_work::trial_value(self, &nonce, &initial_hash);
        proof_of_work::check(target, value)
    }

    /// Hand the object's initial hash and target to `engine`
    fn do_proof_of_work(
        &self,
        object: &ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
        engine: &dyn ProofOfWorkEngine,
        callback: PowCallback,
    ) -> Result<()> {
        let initial_hash = self.initial_hash(object)?;
        let target = self.proof_of_work_target(object, nonce_trials_per_byte, extra_bytes)?;
        engine.calculate_nonce(initial_hash, target, callback);
        Ok(())
    }
}
