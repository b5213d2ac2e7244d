use crate::codec::{encode, Reader};
use crate::core::payload::{Pubkey, PubkeyBody};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::utils::{base58_decode, base58_encode};
use crate::wallet::PrivateKey;
use std::fmt;

pub const ADDRESS_PREFIX: &str = "BM-";
pub const ADDRESS_CHECK_SUM_LEN: usize = 4;
pub const RIPE_LENGTH: usize = 20;

/// A Bitmessage address together with whatever key material is known for it.
///
/// The string form is `BM-` + Base58(varint(version) varint(stream)
/// ripe-without-leading-zeros checksum). Versions 2 and 3 strip at most two
/// leading zero bytes, version 4 strips all of them.
#[derive(Debug, Clone)]
pub struct BitmessageAddress {
    version: u64,
    stream: u64,
    ripe: [u8; RIPE_LENGTH],
    tag: Option<[u8; 32]>,
    public_decryption_key: [u8; 32],
    broadcast_key: [u8; 32],
    address: String,
    pubkey: Option<Pubkey>,
    private_key: Option<PrivateKey>,
    alias: Option<String>,
    subscribed: bool,
}

/// `doubleSha512(varint(version) varint(stream) ripe)`; the first half
/// decrypts v4 pubkeys and v5 broadcasts, the second half is the tag.
pub fn address_hash(
    crypto: &dyn Cryptography,
    version: u64,
    stream: u64,
    ripe: &[u8; RIPE_LENGTH],
) -> [u8; 64] {
    crypto.double_sha512(&[&address_prefix(version, stream, ripe)])
}

/// The v4 tag of an address
pub fn address_tag(
    crypto: &dyn Cryptography,
    version: u64,
    stream: u64,
    ripe: &[u8; RIPE_LENGTH],
) -> [u8; 32] {
    let hash = address_hash(crypto, version, stream, ripe);
    let mut tag = [0u8; 32];
    tag.copy_from_slice(&hash[32..]);
    tag
}

fn address_prefix(version: u64, stream: u64, ripe: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + RIPE_LENGTH);
    encode::var_int(version, &mut out);
    encode::var_int(stream, &mut out);
    out.extend_from_slice(ripe);
    out
}

fn checksum(crypto: &dyn Cryptography, payload: &[u8]) -> [u8; ADDRESS_CHECK_SUM_LEN] {
    let hash = crypto.double_sha512(&[payload]);
    let mut out = [0u8; ADDRESS_CHECK_SUM_LEN];
    out.copy_from_slice(&hash[..ADDRESS_CHECK_SUM_LEN]);
    out
}

fn stripped_ripe(version: u64, ripe: &[u8; RIPE_LENGTH]) -> &[u8] {
    let zeros = ripe.iter().take_while(|b| **b == 0).count();
    let strip = if version < 4 { zeros.min(2) } else { zeros };
    &ripe[strip..]
}

fn check_version(version: u64) -> Result<()> {
    if !(2..=4).contains(&version) {
        return Err(BitmessageError::InvalidAddress(format!(
            "Unsupported address version {version}"
        )));
    }
    Ok(())
}

impl BitmessageAddress {
    pub fn from_ripe(
        crypto: &dyn Cryptography,
        version: u64,
        stream: u64,
        ripe: [u8; RIPE_LENGTH],
    ) -> Result<BitmessageAddress> {
        check_version(version)?;

        let mut payload = Vec::with_capacity(2 + RIPE_LENGTH + ADDRESS_CHECK_SUM_LEN);
        encode::var_int(version, &mut payload);
        encode::var_int(stream, &mut payload);
        payload.extend_from_slice(stripped_ripe(version, &ripe));
        let check = checksum(crypto, &payload);
        payload.extend_from_slice(&check);
        let address = format!("{ADDRESS_PREFIX}{}", base58_encode(&payload));

        let hash = address_hash(crypto, version, stream, &ripe);
        let mut public_decryption_key = [0u8; 32];
        public_decryption_key.copy_from_slice(&hash[..32]);
        let mut tag = [0u8; 32];
        tag.copy_from_slice(&hash[32..]);

        let broadcast_key = if version >= 4 {
            public_decryption_key
        } else {
            let single = crypto.sha512(&[&address_prefix(version, stream, &ripe)]);
            let mut key = [0u8; 32];
            key.copy_from_slice(&single[..32]);
            key
        };

        Ok(BitmessageAddress {
            version,
            stream,
            ripe,
            tag: (version >= 4).then_some(tag),
            public_decryption_key,
            broadcast_key,
            address,
            pubkey: None,
            private_key: None,
            alias: None,
            subscribed: false,
        })
    }

    /// Parse `BM-...`; the prefix is optional.
    pub fn parse(crypto: &dyn Cryptography, address: &str) -> Result<BitmessageAddress> {
        let trimmed = address.trim();
        let encoded = trimmed.strip_prefix(ADDRESS_PREFIX).unwrap_or(trimmed);
        let bytes = base58_decode(encoded)?;
        if bytes.len() < ADDRESS_CHECK_SUM_LEN + 2 {
            return Err(BitmessageError::InvalidAddress(format!(
                "Address {address} is too short"
            )));
        }

        let (payload, actual) = bytes.split_at(bytes.len() - ADDRESS_CHECK_SUM_LEN);
        if checksum(crypto, payload) != actual {
            return Err(BitmessageError::InvalidAddress(format!(
                "Checksum mismatch for {address}"
            )));
        }

        let mut reader = Reader::new(payload);
        let version = reader
            .var_int()
            .map_err(|e| BitmessageError::InvalidAddress(e.to_string()))?;
        let stream = reader
            .var_int()
            .map_err(|e| BitmessageError::InvalidAddress(e.to_string()))?;
        check_version(version)?;

        let stripped = reader.rest();
        let valid_length = if version < 4 {
            (RIPE_LENGTH - 2..=RIPE_LENGTH).contains(&stripped.len())
        } else {
            (4..=RIPE_LENGTH).contains(&stripped.len()) && stripped[0] != 0
        };
        if !valid_length {
            return Err(BitmessageError::InvalidAddress(format!(
                "Invalid ripe encoding in {address}"
            )));
        }
        let mut ripe = [0u8; RIPE_LENGTH];
        ripe[RIPE_LENGTH - stripped.len()..].copy_from_slice(stripped);

        Self::from_ripe(crypto, version, stream, ripe)
    }

    /// Address of one of our own identities
    pub fn from_private_key(
        crypto: &dyn Cryptography,
        private_key: PrivateKey,
    ) -> Result<BitmessageAddress> {
        let ripe = private_key.pubkey().ripe(crypto)?;
        let mut address =
            Self::from_ripe(crypto, private_key.version(), private_key.stream(), ripe)?;
        address.pubkey = Some(private_key.pubkey().clone());
        address.private_key = Some(private_key);
        Ok(address)
    }

    /// Address of a sender whose keys arrived inside a message
    pub fn from_pubkey_body(
        crypto: &dyn Cryptography,
        version: u64,
        stream: u64,
        body: PubkeyBody,
    ) -> Result<BitmessageAddress> {
        let ripe = body.ripe(crypto);
        let mut address = Self::from_ripe(crypto, version, stream, ripe)?;
        address.pubkey = Some(Pubkey::new(version, stream, body, address.tag)?);
        Ok(address)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    pub fn ripe(&self) -> &[u8; RIPE_LENGTH] {
        &self.ripe
    }

    /// Only v4 addresses have a tag
    pub fn tag(&self) -> Option<&[u8; 32]> {
        self.tag.as_ref()
    }

    /// Private key that decrypts this address' v4 pubkey objects
    pub fn public_decryption_key(&self) -> &[u8; 32] {
        &self.public_decryption_key
    }

    /// Private key that decrypts this address' broadcasts
    pub fn broadcast_key(&self) -> &[u8; 32] {
        &self.broadcast_key
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn pubkey(&self) -> Option<&Pubkey> {
        self.pubkey.as_ref()
    }

    /// Attach a (decrypted) pubkey, which must hash to this address' ripe
    pub fn set_pubkey(&mut self, crypto: &dyn Cryptography, pubkey: Pubkey) -> Result<()> {
        if pubkey.ripe(crypto)? != self.ripe {
            return Err(BitmessageError::InvalidAddress(format!(
                "Pubkey does not belong to {}",
                self.address
            )));
        }
        self.pubkey = Some(pubkey);
        Ok(())
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = Some(alias.into());
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn set_subscribed(&mut self, subscribed: bool) {
        self.subscribed = subscribed;
    }

    /// Whether a getpubkey request asks for this address
    pub fn is_requested_by(&self, ripe_tag: &[u8]) -> bool {
        match &self.tag {
            Some(tag) => ripe_tag == tag,
            None => ripe_tag == self.ripe,
        }
    }
}

impl PartialEq for BitmessageAddress {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for BitmessageAddress {}

impl std::hash::Hash for BitmessageAddress {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for BitmessageAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{alias} <{}>", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;

    const ADDRESS: &str = "BM-2cSqjfJ8xK6UUn5Rw3RpdGQ9RsDkBhWnS8";

    #[test]
    fn test_parse_v4_address() {
        let crypto = Secp256k1Cryptography::new();
        let address = BitmessageAddress::parse(&crypto, ADDRESS).unwrap();
        assert_eq!(address.version(), 4);
        assert_eq!(address.stream(), 1);
        assert_eq!(
            hex::encode(address.ripe()),
            "0006c780441208a9b3891c235c6bd9d9d52cfce4"
        );
        assert_eq!(
            hex::encode(address.public_decryption_key()),
            "3e46237b2cee151ff40795737ec68dbaab2f6ffcf93fcd01ae9db81a7a1f537b"
        );
        assert_eq!(
            hex::encode(address.tag().unwrap()),
            "ab6653ca3ef2929b09f60486201521306856575809e67971a2db8277a8ab60f4"
        );
        assert_eq!(address.address(), ADDRESS);
    }

    #[test]
    fn test_ripe_round_trip() {
        let crypto = Secp256k1Cryptography::new();
        let parsed = BitmessageAddress::parse(&crypto, ADDRESS).unwrap();
        let rebuilt =
            BitmessageAddress::from_ripe(&crypto, 4, 1, *parsed.ripe()).unwrap();
        assert_eq!(rebuilt.address(), ADDRESS);
        assert_eq!(rebuilt, parsed);
    }

    #[test]
    fn test_prefix_is_optional() {
        let crypto = Secp256k1Cryptography::new();
        let without = BitmessageAddress::parse(&crypto, &ADDRESS[3..]).unwrap();
        assert_eq!(without.address(), ADDRESS);
    }

    #[test]
    fn test_checksum_rejected() {
        let crypto = Secp256k1Cryptography::new();
        let mut corrupted = ADDRESS.to_string();
        corrupted.pop();
        corrupted.push('9');
        assert!(matches!(
            BitmessageAddress::parse(&crypto, &corrupted),
            Err(BitmessageError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_v3_keeps_all_but_two_zeros() {
        let crypto = Secp256k1Cryptography::new();
        let mut ripe = [0u8; RIPE_LENGTH];
        ripe[3] = 0x42;
        ripe[19] = 0x01;
        let address = BitmessageAddress::from_ripe(&crypto, 3, 1, ripe).unwrap();
        assert!(address.tag().is_none());
        let parsed = BitmessageAddress::parse(&crypto, address.address()).unwrap();
        assert_eq!(parsed.ripe(), &ripe);
        assert_eq!(parsed.version(), 3);
    }

    #[test]
    fn test_v3_broadcast_key_is_single_sha512() {
        let crypto = Secp256k1Cryptography::new();
        let ripe = [0x11u8; RIPE_LENGTH];
        let address = BitmessageAddress::from_ripe(&crypto, 3, 1, ripe).unwrap();
        let mut prefix = vec![3u8, 1];
        prefix.extend_from_slice(&ripe);
        assert_eq!(
            address.broadcast_key()[..],
            crypto.sha512(&[&prefix])[..32]
        );
    }

    #[test]
    fn test_unsupported_version() {
        let crypto = Secp256k1Cryptography::new();
        assert!(matches!(
            BitmessageAddress::from_ripe(&crypto, 5, 1, [1u8; RIPE_LENGTH]),
            Err(BitmessageError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_is_requested_by_tag() {
        let crypto = Secp256k1Cryptography::new();
        let address = BitmessageAddress::parse(&crypto, ADDRESS).unwrap();
        let tag = *address.tag().unwrap();
        assert!(address.is_requested_by(&tag));
        assert!(!address.is_requested_by(address.ripe()));
    }
}
