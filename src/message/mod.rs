//! Logical messages and the signed, encrypted containers that carry them

pub mod crypto_custom;
pub mod label;
pub mod plaintext;
pub mod signature_reader;
pub mod status;

pub use crypto_custom::{CryptoCustomMessage, COMMAND_ENCRYPTED};
pub use label::{Label, LabelType};
pub use plaintext::{Encoding, Plaintext, PlaintextBuilder, PlaintextType};
pub use signature_reader::SignatureCheckingReader;
pub use status::Status;

use crate::codec::{encode, Reader};
use crate::core::payload::PubkeyBody;
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::wallet::BitmessageAddress;

/// `addrVersion stream behavior sign enc [ntpb extra]`, the sender block at
/// the start of every signed message.
pub(crate) fn write_sender(from: &BitmessageAddress, out: &mut Vec<u8>) -> Result<()> {
    let pubkey = from.pubkey().ok_or_else(|| {
        BitmessageError::InvalidState(format!("No pubkey known for {}", from.address()))
    })?;
    let body = pubkey.body()?;
    encode::var_int(from.version(), out);
    encode::var_int(from.stream(), out);
    body.write_keys(out);
    if from.version() >= 3 {
        encode::var_int(body.nonce_trials_per_byte(), out);
        encode::var_int(body.extra_bytes(), out);
    }
    Ok(())
}

pub(crate) fn read_sender(
    crypto: &dyn Cryptography,
    reader: &mut Reader<'_>,
) -> Result<BitmessageAddress> {
    let version = reader.var_int()?;
    let stream = reader.var_int()?;
    let mut body = PubkeyBody::read_v2(reader)?;
    if version >= 3 {
        let nonce_trials_per_byte = reader.var_int()?;
        let extra_bytes = reader.var_int()?;
        body = PubkeyBody::new(
            body.behavior_bitfield(),
            body.signing_key(),
            body.encryption_key(),
            nonce_trials_per_byte,
            extra_bytes,
        )?;
    }
    BitmessageAddress::from_pubkey_body(crypto, version, stream, body)
}
