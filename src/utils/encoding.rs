use crate::error::{BitmessageError, Result};

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| BitmessageError::InvalidAddress(format!("Invalid base58 encoding: {e}")))
}
