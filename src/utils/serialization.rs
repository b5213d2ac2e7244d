// bincode 2 helpers for the sled-backed stores
use crate::error::{BitmessageError, Result};
use serde::{Deserialize, Serialize};

/// Serialize a stored record with the standard bincode configuration
pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BitmessageError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize a stored record with the standard bincode configuration
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BitmessageError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}
