use crate::codec::{Reader, Streamable};
use crate::error::{BitmessageError, Result};
use crate::wallet::BitmessageAddress;

/// Request for the pubkey of an address: the ripe for v2/v3 addresses, the
/// tag for v4 addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPubkey {
    version: u64,
    stream: u64,
    ripe_tag: Vec<u8>,
}

impl GetPubkey {
    pub fn new(address: &BitmessageAddress) -> GetPubkey {
        let ripe_tag = match address.tag() {
            Some(tag) if address.version() >= 4 => tag.to_vec(),
            _ => address.ripe().to_vec(),
        };
        GetPubkey {
            version: address.version(),
            stream: address.stream(),
            ripe_tag,
        }
    }

    pub fn read(version: u64, stream: u64, reader: &mut Reader<'_>) -> Result<GetPubkey> {
        let length = if version >= 4 { 32 } else { 20 };
        let ripe_tag = reader.bytes(length)?.to_vec();
        if !reader.is_empty() {
            return Err(BitmessageError::Format(format!(
                "{} unexpected bytes after getpubkey identifier",
                reader.remaining()
            )));
        }
        Ok(GetPubkey {
            version,
            stream,
            ripe_tag,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// Ripe (20 bytes) or tag (32 bytes), depending on the version
    pub fn ripe_tag(&self) -> &[u8] {
        &self.ripe_tag
    }
}

impl Streamable for GetPubkey {
    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.ripe_tag);
    }
}
