//! Identities and addresses
//!
//! Address encoding and derived keys, private key generation (random and
//! passphrase based) and WIF import/export.

pub mod address;
pub mod private_key;
pub mod wif;

pub use address::{address_hash, address_tag, BitmessageAddress, ADDRESS_PREFIX, RIPE_LENGTH};
pub use private_key::{PrivateKey, MAX_KEY_ATTEMPTS};
pub use wif::{address_from_wif, export_wif, import_wif};
