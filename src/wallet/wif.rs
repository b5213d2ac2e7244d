//! Wallet Import Format for single private keys
//!
//! `Base58(0x80 || key || doubleSha256(0x80 || key)[..4])`

use crate::core::payload::DOES_ACK;
use crate::core::proof_of_work::{DEFAULT_EXTRA_BYTES, DEFAULT_NONCE_TRIALS_PER_BYTE};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::utils::{base58_decode, base58_encode};
use crate::wallet::{BitmessageAddress, PrivateKey};

const WIF_VERSION: u8 = 0x80;
const WIF_CHECK_SUM_LEN: usize = 4;

pub fn export_wif(crypto: &dyn Cryptography, private_key: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + private_key.len() + WIF_CHECK_SUM_LEN);
    payload.push(WIF_VERSION);
    payload.extend_from_slice(private_key);
    let checksum = crypto.double_sha256(&[&payload]);
    payload.extend_from_slice(&checksum[..WIF_CHECK_SUM_LEN]);
    base58_encode(&payload)
}

pub fn import_wif(crypto: &dyn Cryptography, wif: &str) -> Result<[u8; 32]> {
    let bytes = base58_decode(wif.trim())
        .map_err(|e| BitmessageError::Crypto(format!("Invalid WIF: {e}")))?;
    if bytes.len() != 1 + 32 + WIF_CHECK_SUM_LEN || bytes[0] != WIF_VERSION {
        return Err(BitmessageError::Crypto(
            "WIF must encode a 32-byte key with version 0x80".to_string(),
        ));
    }
    let (payload, checksum) = bytes.split_at(1 + 32);
    if crypto.double_sha256(&[payload])[..WIF_CHECK_SUM_LEN] != *checksum {
        return Err(BitmessageError::Crypto("WIF checksum mismatch".to_string()));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&payload[1..]);
    Ok(key)
}

/// Rebuild an identity from its exported signing and encryption keys
pub fn address_from_wif(
    crypto: &dyn Cryptography,
    version: u64,
    stream: u64,
    signing_wif: &str,
    encryption_wif: &str,
) -> Result<BitmessageAddress> {
    let signing = import_wif(crypto, signing_wif)?;
    let encryption = import_wif(crypto, encryption_wif)?;
    let private_key = PrivateKey::from_keys(
        crypto,
        version,
        stream,
        &signing,
        &encryption,
        DEFAULT_NONCE_TRIALS_PER_BYTE,
        DEFAULT_EXTRA_BYTES,
        DOES_ACK,
    )?;
    BitmessageAddress::from_private_key(crypto, private_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;

    const SIGNING_KEY: &str = "5eb980c820acf2d44c2864716e0504f70e4139dbd27aecd0a56aed875eea122a";
    const SIGNING_WIF: &str = "5JY1CFeeyN4eyfL35guWAuUqu5VLmd7LojtkNP6wmt5msZxxZ57";
    const ENCRYPTION_WIF: &str = "5J1oDgZDicNhUgbfzBDQqi2m5jUPnDrfZinnTqEEEaLv63jVFTM";

    #[test]
    fn test_export_fixture() {
        let crypto = Secp256k1Cryptography::new();
        let key = hex::decode(SIGNING_KEY).unwrap();
        assert_eq!(export_wif(&crypto, &key), SIGNING_WIF);
    }

    #[test]
    fn test_import_round_trip() {
        let crypto = Secp256k1Cryptography::new();
        let key = import_wif(&crypto, SIGNING_WIF).unwrap();
        assert_eq!(hex::encode(key), SIGNING_KEY);
        assert_eq!(export_wif(&crypto, &key), SIGNING_WIF);
    }

    #[test]
    fn test_import_rejects_bad_checksum() {
        let crypto = Secp256k1Cryptography::new();
        let mut wif = SIGNING_WIF.to_string();
        wif.replace_range(10..11, if &wif[10..11] == "a" { "b" } else { "a" });
        assert!(matches!(
            import_wif(&crypto, &wif),
            Err(BitmessageError::Crypto(_))
        ));
    }

    #[test]
    fn test_address_from_wif_fixture() {
        let crypto = Secp256k1Cryptography::new();
        let address = address_from_wif(&crypto, 4, 1, SIGNING_WIF, ENCRYPTION_WIF).unwrap();
        assert_eq!(address.address(), "BM-2cWFkyuXXFw6d393RGnin2RpSXj8wxtt6F");
        assert!(address.private_key().is_some());
    }
}
