use crate::codec::{encode, Reader, Readable, Streamable};
use crate::core::{InventoryVector, NetworkAddress, ObjectMessage, NODE_NETWORK};
use crate::error::{BitmessageError, Result};
use crate::utils::unix_time;

/// Protocol version announced in `version` messages
pub const PROTOCOL_VERSION: i32 = 3;
/// Most addresses an `addr` message may carry
pub const MAX_ADDR_COUNT: usize = 1_000;
/// Most inventory vectors an `inv` or `getdata` message may carry
pub const MAX_INV_COUNT: usize = 50_000;
pub const MAX_USER_AGENT_LENGTH: usize = 5_000;
pub const MAX_STREAM_COUNT: usize = 160_000;
pub const MAX_COMMAND_LENGTH: usize = 64;

pub const COMMAND_VERSION: &str = "version";
pub const COMMAND_VERACK: &str = "verack";
pub const COMMAND_ADDR: &str = "addr";
pub const COMMAND_INV: &str = "inv";
pub const COMMAND_GETDATA: &str = "getdata";
pub const COMMAND_OBJECT: &str = "object";
pub const COMMAND_CUSTOM: &str = "custom";

/// Handshake message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    version: i32,
    services: u64,
    timestamp: i64,
    addr_recv: NetworkAddress,
    addr_from: NetworkAddress,
    nonce: u64,
    user_agent: String,
    streams: Vec<u64>,
}

impl Version {
    pub fn new(
        addr_recv: NetworkAddress,
        addr_from: NetworkAddress,
        nonce: u64,
        user_agent: impl Into<String>,
        streams: Vec<u64>,
    ) -> Version {
        Version {
            version: PROTOCOL_VERSION,
            services: NODE_NETWORK,
            timestamp: i64::try_from(unix_time()).unwrap_or(i64::MAX),
            addr_recv,
            addr_from,
            nonce,
            user_agent: user_agent.into(),
            streams,
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn services(&self) -> u64 {
        self.services
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn addr_recv(&self) -> &NetworkAddress {
        &self.addr_recv
    }

    pub fn addr_from(&self) -> &NetworkAddress {
        &self.addr_from
    }

    /// Random per-node value used to detect connections to ourselves
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn streams(&self) -> &[u64] {
        &self.streams
    }
}

impl Streamable for Version {
    fn write_to(&self, out: &mut Vec<u8>) {
        encode::int32(self.version, out);
        encode::uint64(self.services, out);
        encode::int64(self.timestamp, out);
        self.addr_recv.write_light(out);
        self.addr_from.write_light(out);
        encode::uint64(self.nonce, out);
        encode::var_string(&self.user_agent, out);
        encode::var_int_list(&self.streams, out);
    }
}

impl Readable for Version {
    fn read_from(reader: &mut Reader<'_>) -> Result<Version> {
        Ok(Version {
            version: reader.int32()?,
            services: reader.uint64()?,
            timestamp: reader.int64()?,
            addr_recv: NetworkAddress::read_light(reader)?,
            addr_from: NetworkAddress::read_light(reader)?,
            nonce: reader.uint64()?,
            user_agent: reader.var_string(MAX_USER_AGENT_LENGTH)?,
            streams: reader.var_int_list(MAX_STREAM_COUNT)?,
        })
    }
}

/// Known node addresses, in full encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addr {
    addresses: Vec<NetworkAddress>,
}

impl Addr {
    pub fn new(addresses: Vec<NetworkAddress>) -> Result<Addr> {
        if addresses.len() > MAX_ADDR_COUNT {
            return Err(BitmessageError::Format(format!(
                "addr carries at most {MAX_ADDR_COUNT} addresses, got {}",
                addresses.len()
            )));
        }
        Ok(Addr { addresses })
    }

    pub fn addresses(&self) -> &[NetworkAddress] {
        &self.addresses
    }
}

impl Streamable for Addr {
    fn write_to(&self, out: &mut Vec<u8>) {
        encode::var_int(self.addresses.len() as u64, out);
        for address in &self.addresses {
            address.write_to(out);
        }
    }
}

impl Readable for Addr {
    fn read_from(reader: &mut Reader<'_>) -> Result<Addr> {
        let count = reader.var_len(MAX_ADDR_COUNT)?;
        let mut addresses = Vec::with_capacity(count);
        for _ in 0..count {
            addresses.push(NetworkAddress::read_full(reader)?);
        }
        Ok(Addr { addresses })
    }
}

/// Body of `inv` and `getdata`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryList {
    items: Vec<InventoryVector>,
}

impl InventoryList {
    pub fn new(items: Vec<InventoryVector>) -> Result<InventoryList> {
        if items.len() > MAX_INV_COUNT {
            return Err(BitmessageError::Format(format!(
                "Inventory lists carry at most {MAX_INV_COUNT} items, got {}",
                items.len()
            )));
        }
        Ok(InventoryList { items })
    }

    pub fn items(&self) -> &[InventoryVector] {
        &self.items
    }

    pub fn into_items(self) -> Vec<InventoryVector> {
        self.items
    }
}

impl Streamable for InventoryList {
    fn write_to(&self, out: &mut Vec<u8>) {
        encode::var_int(self.items.len() as u64, out);
        for iv in &self.items {
            iv.write_to(out);
        }
    }
}

impl Readable for InventoryList {
    fn read_from(reader: &mut Reader<'_>) -> Result<InventoryList> {
        let count = reader.var_len(MAX_INV_COUNT)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(InventoryVector::read_from(reader)?);
        }
        Ok(InventoryList { items })
    }
}

/// Application-defined data: `var_str(command) data`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomMessage {
    command: String,
    data: Vec<u8>,
}

impl CustomMessage {
    pub fn new(command: impl Into<String>, data: Vec<u8>) -> CustomMessage {
        CustomMessage {
            command: command.into(),
            data,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Streamable for CustomMessage {
    fn write_to(&self, out: &mut Vec<u8>) {
        encode::var_string(&self.command, out);
        out.extend_from_slice(&self.data);
    }
}

impl Readable for CustomMessage {
    fn read_from(reader: &mut Reader<'_>) -> Result<CustomMessage> {
        let command = reader.var_string(MAX_COMMAND_LENGTH)?;
        Ok(CustomMessage {
            command,
            data: reader.rest().to_vec(),
        })
    }
}

/// Everything a network frame can carry
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    Version(Version),
    VerAck,
    Addr(Addr),
    Inv(InventoryList),
    GetData(InventoryList),
    Object(ObjectMessage),
    Custom(CustomMessage),
}

impl MessagePayload {
    pub fn command(&self) -> &'static str {
        match self {
            MessagePayload::Version(_) => COMMAND_VERSION,
            MessagePayload::VerAck => COMMAND_VERACK,
            MessagePayload::Addr(_) => COMMAND_ADDR,
            MessagePayload::Inv(_) => COMMAND_INV,
            MessagePayload::GetData(_) => COMMAND_GETDATA,
            MessagePayload::Object(_) => COMMAND_OBJECT,
            MessagePayload::Custom(_) => COMMAND_CUSTOM,
        }
    }

    pub fn read(command: &str, reader: &mut Reader<'_>) -> Result<MessagePayload> {
        match command {
            COMMAND_VERSION => Ok(MessagePayload::Version(Version::read_from(reader)?)),
            COMMAND_VERACK => Ok(MessagePayload::VerAck),
            COMMAND_ADDR => Ok(MessagePayload::Addr(Addr::read_from(reader)?)),
            COMMAND_INV => Ok(MessagePayload::Inv(InventoryList::read_from(reader)?)),
            COMMAND_GETDATA => Ok(MessagePayload::GetData(InventoryList::read_from(reader)?)),
            COMMAND_OBJECT => Ok(MessagePayload::Object(ObjectMessage::read(reader)?)),
            COMMAND_CUSTOM => Ok(MessagePayload::Custom(CustomMessage::read_from(reader)?)),
            other => Err(BitmessageError::Format(format!("Unknown command '{other}'"))),
        }
    }

    /// Objects must be stamped before they can be framed
    pub fn write(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            MessagePayload::Version(version) => version.write_to(out),
            MessagePayload::VerAck => {}
            MessagePayload::Addr(addr) => addr.write_to(out),
            MessagePayload::Inv(list) | MessagePayload::GetData(list) => list.write_to(out),
            MessagePayload::Object(object) => out.extend_from_slice(&object.to_bytes()?),
            MessagePayload::Custom(custom) => custom.write_to(out),
        }
        Ok(())
    }
}
