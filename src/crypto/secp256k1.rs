use crate::crypto::{Aes256CbcCipher, Cryptography};
use crate::error::{BitmessageError, Result};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use ring::digest::{Context, Algorithm, SHA1_FOR_LEGACY_USE_ONLY, SHA256, SHA512};
use ring::hmac;
use ripemd::{Digest as RipemdDigest, Ripemd160};

/// Production [`Cryptography`]: `ring` digests and HMAC, `ripemd` for
/// RIPEMD-160, `k256` for secp256k1 and `aes`/`cbc` for AES-256-CBC.
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Cryptography;

impl Secp256k1Cryptography {
    pub fn new() -> Self {
        Secp256k1Cryptography
    }
}

fn digest<const N: usize>(algorithm: &'static Algorithm, data: &[&[u8]]) -> [u8; N] {
    let mut context = Context::new(algorithm);
    for part in data {
        context.update(part);
    }
    let digest = context.finish();
    let mut out = [0u8; N];
    out.copy_from_slice(digest.as_ref());
    out
}

/// Wire keys omit the `0x04` prefix; accept both forms.
fn parse_public_key(public_key: &[u8]) -> Result<PublicKey> {
    let parsed = if public_key.len() == 64 {
        let mut full = Vec::with_capacity(65);
        full.push(0x04);
        full.extend_from_slice(public_key);
        PublicKey::from_sec1_bytes(&full)
    } else {
        PublicKey::from_sec1_bytes(public_key)
    };
    parsed.map_err(|e| BitmessageError::Crypto(format!("Invalid public key: {e}")))
}

impl Cryptography for Secp256k1Cryptography {
    fn sha1(&self, data: &[&[u8]]) -> [u8; 20] {
        digest(&SHA1_FOR_LEGACY_USE_ONLY, data)
    }

    fn sha256(&self, data: &[&[u8]]) -> [u8; 32] {
        digest(&SHA256, data)
    }

    fn sha512(&self, data: &[&[u8]]) -> [u8; 64] {
        digest(&SHA512, data)
    }

    fn ripemd160(&self, data: &[&[u8]]) -> [u8; 20] {
        let mut hasher = Ripemd160::new();
        for part in data {
            hasher.update(part);
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> [u8; 32] {
        let key = hmac::Key::new(hmac::HMAC_SHA256, key);
        let tag = hmac::sign(&key, data);
        let mut out = [0u8; 32];
        out.copy_from_slice(tag.as_ref());
        out
    }

    fn hmac_sha256_verify(&self, key: &[u8], data: &[u8], tag: &[u8]) -> bool {
        let key = hmac::Key::new(hmac::HMAC_SHA256, key);
        hmac::verify(&key, data, tag).is_ok()
    }

    fn random_bytes(&self, length: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; length];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }

    fn create_private_key(&self) -> [u8; 32] {
        loop {
            let mut candidate = [0u8; 32];
            OsRng.fill_bytes(&mut candidate);
            // Zero and values >= the curve order are rejected
            if SecretKey::from_slice(&candidate).is_ok() {
                return candidate;
            }
        }
    }

    fn create_public_key(&self, private_key: &[u8]) -> Result<Vec<u8>> {
        let secret = SecretKey::from_slice(private_key)
            .map_err(|e| BitmessageError::Crypto(format!("Invalid private key: {e}")))?;
        Ok(secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec())
    }

    fn sign(&self, data: &[u8], private_key: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::from_slice(private_key)
            .map_err(|e| BitmessageError::Crypto(format!("Invalid signing key: {e}")))?;
        let digest = self.sha256(&[data]);
        let signature: Signature = signing_key
            .sign_prehash(&digest)
            .map_err(|e| BitmessageError::Crypto(format!("Failed to sign: {e}")))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn is_signature_valid(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(public_key) = parse_public_key(public_key) else {
            return false;
        };
        let verifying_key = VerifyingKey::from(&public_key);
        let Ok(signature) = Signature::from_der(signature) else {
            return false;
        };
        let signature = signature.normalize_s().unwrap_or(signature);

        let sha256 = self.sha256(&[data]);
        if verifying_key.verify_prehash(&sha256, &signature).is_ok() {
            return true;
        }
        let sha1 = self.sha1(&[data]);
        verifying_key.verify_prehash(&sha1, &signature).is_ok()
    }

    fn crypt(&self, encrypt: bool, data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256CbcCipher::from_key_bytes(key)?;
        if encrypt {
            cipher.encrypt(data, iv)
        } else {
            cipher.decrypt(data, iv)
        }
    }

    fn multiply(&self, point: &[u8], scalar: &[u8]) -> Result<Vec<u8>> {
        let public_key = parse_public_key(point)?;
        let secret = SecretKey::from_slice(scalar)
            .map_err(|e| BitmessageError::Crypto(format!("Invalid scalar: {e}")))?;
        let product = (public_key.to_projective() * *secret.to_nonzero_scalar()).to_affine();
        Ok(product.to_encoded_point(false).as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> Secp256k1Cryptography {
        Secp256k1Cryptography::new()
    }

    #[test]
    fn test_hash_vectors() {
        let c = crypto();
        assert_eq!(
            hex::encode(c.ripemd160(&[b""])),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
        assert_eq!(
            hex::encode(c.sha256(&[b"abc"])),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            hex::encode(c.sha1(&[b"abc"])),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(&c.sha512(&[b"abc"])[..8]),
            "ddaf35a193617aba"
        );
    }

    #[test]
    fn test_chained_input_equals_concatenation() {
        let c = crypto();
        assert_eq!(c.sha512(&[b"ab", b"c"]), c.sha512(&[b"abc"]));
        assert_eq!(c.double_sha512(&[b"a", b"bc"]), c.sha512(&[&c.sha512(&[b"abc"])]));
        assert_eq!(c.ripemd160(&[b"a", b"b"]), c.ripemd160(&[b"ab"]));
    }

    #[test]
    fn test_public_key_derivation() {
        let c = crypto();
        // Private key 1 maps to the generator point
        let mut one = [0u8; 32];
        one[31] = 1;
        let public_key = c.create_public_key(&one).unwrap();
        assert_eq!(public_key.len(), 65);
        assert_eq!(
            hex::encode(&public_key[1..33]),
            "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert!(c.create_public_key(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let c = crypto();
        let private_key = c.create_private_key();
        let public_key = c.create_public_key(&private_key).unwrap();
        let data = b"object bytes to sign".to_vec();

        let signature = c.sign(&data, &private_key).unwrap();
        assert!(c.is_signature_valid(&data, &signature, &public_key));
        assert!(c.is_signature_valid(&data, &signature, &public_key[1..]));

        for i in 0..data.len() {
            let mut tampered = data.clone();
            tampered[i] ^= 0x01;
            assert!(!c.is_signature_valid(&tampered, &signature, &public_key));
        }
    }

    #[test]
    fn test_verify_rejects_garbage() {
        let c = crypto();
        let private_key = c.create_private_key();
        let public_key = c.create_public_key(&private_key).unwrap();
        assert!(!c.is_signature_valid(b"data", &[0x30, 0x00], &public_key));
        assert!(!c.is_signature_valid(b"data", &[], &[1, 2, 3]));
    }

    #[test]
    fn test_ecdh_is_symmetric() {
        let c = crypto();
        let a = c.create_private_key();
        let b = c.create_private_key();
        let a_pub = c.create_public_key(&a).unwrap();
        let b_pub = c.create_public_key(&b).unwrap();
        assert_eq!(
            c.multiply(&b_pub, &a).unwrap(),
            c.multiply(&a_pub, &b).unwrap()
        );
    }

    #[test]
    fn test_crypt_round_trip() {
        let c = crypto();
        let key = c.random_bytes(32);
        let iv = c.random_bytes(16);
        let encrypted = c.crypt(true, b"payload", &key, &iv).unwrap();
        assert_eq!(c.crypt(false, &encrypted, &key, &iv).unwrap(), b"payload");
    }

    #[test]
    fn test_hmac_sha256_vector() {
        // RFC 4231 test case 2
        let c = crypto();
        let tag = c.hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_hmac_sha256_verify() {
        let c = crypto();
        let data = b"what do ya want for nothing?";
        let tag = c.hmac_sha256(b"Jefe", data);
        assert!(c.hmac_sha256_verify(b"Jefe", data, &tag));

        let mut wrong = tag;
        wrong[31] ^= 1;
        assert!(!c.hmac_sha256_verify(b"Jefe", data, &wrong));
        assert!(!c.hmac_sha256_verify(b"Jefe", data, &tag[..16]));
        assert!(!c.hmac_sha256_verify(b"jefe", data, &tag));
    }

    #[test]
    fn test_random_private_keys_differ() {
        let c = crypto();
        assert_ne!(c.create_private_key(), c.create_private_key());
    }
}
