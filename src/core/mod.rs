//! Object model
//!
//! Wire objects and their payloads, the inventory vector that identifies
//! them, network addresses, and the proof-of-work arithmetic that gates
//! every object on the network.

pub mod inventory_vector;
pub mod network_address;
pub mod object;
pub mod payload;
pub mod proof_of_work;

pub use inventory_vector::InventoryVector;
pub use network_address::{NetworkAddress, NODE_NETWORK};
pub use object::{ObjectMessage, ObjectType};
pub use payload::ObjectPayload;
