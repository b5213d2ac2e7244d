//! Wire framing for the node-to-node protocol
//!
//! [`NetworkMessage`] frames one [`MessagePayload`]; [`MessageReader`]
//! splits an incoming byte stream into frames. The synchronization loop
//! itself lives outside this crate and talks to the core through
//! [`NetworkHandler`].

pub mod handler;
pub mod message;
pub mod payloads;
pub mod reader;

pub use handler::NetworkHandler;
pub use message::{NetworkMessage, HEADER_LENGTH, MAGIC};
pub use payloads::{
    Addr, CustomMessage, InventoryList, MessagePayload, Version, MAX_ADDR_COUNT, MAX_INV_COUNT,
    PROTOCOL_VERSION,
};
pub use reader::MessageReader;
