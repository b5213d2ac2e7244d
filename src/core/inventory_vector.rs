use crate::codec::{Reader, Readable, Streamable};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an object on the network: the first 32 bytes of
/// `doubleSha512` over the complete object including its nonce.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, bincode::Encode,
    bincode::Decode,
)]
pub struct InventoryVector([u8; 32]);

impl InventoryVector {
    pub fn new(hash: [u8; 32]) -> InventoryVector {
        InventoryVector(hash)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<InventoryVector> {
        let hash: [u8; 32] = bytes.try_into().map_err(|_| {
            BitmessageError::Format(format!(
                "Inventory vector must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(InventoryVector(hash))
    }

    /// IV of serialized object bytes (nonce included)
    pub fn of_object_bytes(crypto: &dyn Cryptography, object: &[u8]) -> InventoryVector {
        let hash = crypto.double_sha512(&[object]);
        let mut iv = [0u8; 32];
        iv.copy_from_slice(&hash[..32]);
        InventoryVector(iv)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Streamable for InventoryVector {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl Readable for InventoryVector {
    fn read_from(reader: &mut Reader<'_>) -> Result<InventoryVector> {
        Ok(InventoryVector(reader.array()?))
    }
}

impl fmt::Display for InventoryVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HEXLOWER.encode(&self.0))
    }
}

impl fmt::Debug for InventoryVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InventoryVector({self})")
    }
}
