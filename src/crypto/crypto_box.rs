//! ECIES container used for `msg`, `broadcast` and v4 `pubkey` payloads.
//!
//! ```text
//! IV(16) | curve(u16 = 0x02CA) | xLen(u16) | X | yLen(u16) | Y | ciphertext | MAC(32)
//! ```
//!
//! The ephemeral point `R = (X, Y)` is multiplied with the recipient's key;
//! SHA-512 of the shared x-coordinate yields the AES key (first half) and
//! the HMAC key (second half). The MAC covers everything before it.

use crate::codec::{encode, Reader, Streamable};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};

/// secp256k1 as numbered by OpenSSL
pub const CURVE_SECP256K1: u16 = 0x02CA;

const IV_LENGTH: usize = 16;
const MAC_LENGTH: usize = 32;
const COORDINATE_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoBox {
    iv: [u8; IV_LENGTH],
    curve_type: u16,
    r_x: Vec<u8>,
    r_y: Vec<u8>,
    encrypted: Vec<u8>,
    mac: [u8; MAC_LENGTH],
}

impl CryptoBox {
    /// Encrypt `data` for the holder of the private key behind `public_key`
    pub fn encrypt(crypto: &dyn Cryptography, data: &[u8], public_key: &[u8]) -> Result<CryptoBox> {
        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(&crypto.random_bytes(IV_LENGTH));

        let ephemeral = crypto.create_private_key();
        let r = crypto.create_public_key(&ephemeral)?;
        let shared = crypto.multiply(public_key, &ephemeral)?;
        let key_material = crypto.sha512(&[&shared[1..1 + COORDINATE_LENGTH]]);

        let encrypted = crypto.crypt(true, data, &key_material[..32], &iv)?;
        let mut container = CryptoBox {
            iv,
            curve_type: CURVE_SECP256K1,
            r_x: r[1..1 + COORDINATE_LENGTH].to_vec(),
            r_y: r[1 + COORDINATE_LENGTH..].to_vec(),
            encrypted,
            mac: [0u8; MAC_LENGTH],
        };
        container.mac = crypto.hmac_sha256(&key_material[32..], &container.authenticated_bytes());
        Ok(container)
    }

    /// Verify the MAC, then decrypt. Any mismatch is `DecryptionFailed`.
    pub fn decrypt(&self, crypto: &dyn Cryptography, private_key: &[u8]) -> Result<Vec<u8>> {
        let shared = crypto
            .multiply(&self.ephemeral_point(), private_key)
            .map_err(|e| BitmessageError::DecryptionFailed(e.to_string()))?;
        let key_material = crypto.sha512(&[&shared[1..1 + COORDINATE_LENGTH]]);

        if !crypto.hmac_sha256_verify(
            &key_material[32..],
            &self.authenticated_bytes(),
            &self.mac,
        ) {
            return Err(BitmessageError::DecryptionFailed(
                "MAC does not match".to_string(),
            ));
        }
        crypto
            .crypt(false, &self.encrypted, &key_material[..32], &self.iv)
            .map_err(|e| match e {
                BitmessageError::DecryptionFailed(_) => e,
                other => BitmessageError::DecryptionFailed(other.to_string()),
            })
    }

    /// Consume a container that occupies the rest of `reader`.
    pub fn read(reader: &mut Reader<'_>) -> Result<CryptoBox> {
        let iv = reader.array::<IV_LENGTH>()?;
        let curve_type = reader.uint16()?;
        if curve_type != CURVE_SECP256K1 {
            return Err(BitmessageError::Format(format!(
                "Unsupported curve type {curve_type:#06x}"
            )));
        }
        let r_x = read_coordinate(reader)?;
        let r_y = read_coordinate(reader)?;
        if reader.remaining() < MAC_LENGTH {
            return Err(BitmessageError::TruncatedInput {
                needed: MAC_LENGTH,
                available: reader.remaining(),
            });
        }
        let encrypted = reader.bytes(reader.remaining() - MAC_LENGTH)?.to_vec();
        let mac = reader.array::<MAC_LENGTH>()?;
        Ok(CryptoBox {
            iv,
            curve_type,
            r_x,
            r_y,
            encrypted,
            mac,
        })
    }

    pub fn ephemeral_point(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(1 + 2 * COORDINATE_LENGTH);
        point.push(0x04);
        point.extend(pad_coordinate(&self.r_x));
        point.extend(pad_coordinate(&self.r_y));
        point
    }

    fn authenticated_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_without_mac(&mut out);
        out
    }

    fn write_without_mac(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.iv);
        encode::uint16(self.curve_type, out);
        encode::uint16(self.r_x.len() as u16, out);
        out.extend_from_slice(&self.r_x);
        encode::uint16(self.r_y.len() as u16, out);
        out.extend_from_slice(&self.r_y);
        out.extend_from_slice(&self.encrypted);
    }
}

impl Streamable for CryptoBox {
    fn write_to(&self, out: &mut Vec<u8>) {
        self.write_without_mac(out);
        out.extend_from_slice(&self.mac);
    }
}

fn read_coordinate(reader: &mut Reader<'_>) -> Result<Vec<u8>> {
    let length = reader.uint16()? as usize;
    if length > COORDINATE_LENGTH {
        return Err(BitmessageError::Format(format!(
            "Point coordinate of {length} bytes"
        )));
    }
    Ok(reader.bytes(length)?.to_vec())
}

/// Some encoders strip leading zero bytes from coordinates
fn pad_coordinate(coordinate: &[u8]) -> Vec<u8> {
    let mut padded = vec![0u8; COORDINATE_LENGTH - coordinate.len()];
    padded.extend_from_slice(coordinate);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;

    fn key_pair(crypto: &dyn Cryptography) -> ([u8; 32], Vec<u8>) {
        let private_key = crypto.create_private_key();
        let public_key = crypto.create_public_key(&private_key).unwrap();
        (private_key, public_key)
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let crypto = Secp256k1Cryptography::new();
        let (private_key, public_key) = key_pair(&crypto);
        let plaintext = b"The quick brown fox jumps over the lazy dog".to_vec();

        let container = CryptoBox::encrypt(&crypto, &plaintext, &public_key).unwrap();
        assert_eq!(container.decrypt(&crypto, &private_key).unwrap(), plaintext);
    }

    #[test]
    fn test_serialized_round_trip() {
        let crypto = Secp256k1Cryptography::new();
        let (private_key, public_key) = key_pair(&crypto);
        let container = CryptoBox::encrypt(&crypto, b"hello", &public_key).unwrap();

        let bytes = container.to_bytes();
        assert_eq!(bytes.len(), 16 + 2 + 2 + 32 + 2 + 32 + 16 + 32);
        let mut reader = Reader::new(&bytes);
        let read = CryptoBox::read(&mut reader).unwrap();
        assert!(reader.is_empty());
        assert_eq!(read, container);
        assert_eq!(read.decrypt(&crypto, &private_key).unwrap(), b"hello");
    }

    #[test]
    fn test_wrong_key_fails() {
        let crypto = Secp256k1Cryptography::new();
        let (_, public_key) = key_pair(&crypto);
        let (other_private, _) = key_pair(&crypto);
        let container = CryptoBox::encrypt(&crypto, b"secret", &public_key).unwrap();
        assert!(matches!(
            container.decrypt(&crypto, &other_private).unwrap_err(),
            BitmessageError::DecryptionFailed(_)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let crypto = Secp256k1Cryptography::new();
        let (private_key, public_key) = key_pair(&crypto);
        let container = CryptoBox::encrypt(&crypto, b"secret message", &public_key).unwrap();

        let mut bytes = container.to_bytes();
        // Flip a bit inside the ciphertext section
        let index = 16 + 2 + 2 + 32 + 2 + 32 + 3;
        bytes[index] ^= 0x80;
        let tampered = CryptoBox::read(&mut Reader::new(&bytes)).unwrap();
        assert!(matches!(
            tampered.decrypt(&crypto, &private_key).unwrap_err(),
            BitmessageError::DecryptionFailed(_)
        ));
    }

    #[test]
    fn test_tampered_mac_fails() {
        let crypto = Secp256k1Cryptography::new();
        let (private_key, public_key) = key_pair(&crypto);
        let mut container = CryptoBox::encrypt(&crypto, b"secret message", &public_key).unwrap();

        container.mac[0] ^= 0x01;
        assert!(matches!(
            container.decrypt(&crypto, &private_key).unwrap_err(),
            BitmessageError::DecryptionFailed(_)
        ));
    }

    #[test]
    fn test_unknown_curve_rejected() {
        let crypto = Secp256k1Cryptography::new();
        let (_, public_key) = key_pair(&crypto);
        let mut bytes = CryptoBox::encrypt(&crypto, b"x", &public_key)
            .unwrap()
            .to_bytes();
        bytes[16] = 0x01;
        assert!(matches!(
            CryptoBox::read(&mut Reader::new(&bytes)).unwrap_err(),
            BitmessageError::Format(_)
        ));
    }

    #[test]
    fn test_truncated_container() {
        let mut reader = Reader::new(&[0u8; 10]);
        assert!(matches!(
            CryptoBox::read(&mut reader).unwrap_err(),
            BitmessageError::TruncatedInput { .. }
        ));
    }
}
