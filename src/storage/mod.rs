//! Stores the core depends on
//!
//! [`Inventory`] holds the objects this node knows, keyed by inventory
//! vector. [`ProofOfWorkRepository`] queues objects waiting for their
//! nonce so unfinished work survives a restart. Both come with an
//! in-memory and a sled-backed implementation.

pub mod memory_inventory;
pub mod pow_repository;
pub mod sled_inventory;

pub use memory_inventory::MemoryInventory;
pub use pow_repository::{MemoryProofOfWorkRepository, SledProofOfWorkRepository};
pub use sled_inventory::SledInventory;

use crate::core::{InventoryVector, ObjectMessage, ObjectType};
use crate::error::Result;

/// Objects are purged this long after they expire
pub const CLEANUP_GRACE_PERIOD: u64 = 5 * 60;

pub trait Inventory: Send + Sync {
    /// Unexpired objects in any of `streams`
    fn get_inventory(&self, streams: &[u64]) -> Result<Vec<InventoryVector>>;

    /// The part of `offered` we do not have yet
    fn get_missing(&self, offered: &[InventoryVector], streams: &[u64])
        -> Result<Vec<InventoryVector>>;

    fn get_object(&self, iv: &InventoryVector) -> Result<Option<ObjectMessage>>;

    /// Objects of `stream`, optionally restricted by version and types
    fn get_objects(
        &self,
        stream: u64,
        version: Option<u64>,
        types: &[ObjectType],
    ) -> Result<Vec<ObjectMessage>>;

    /// Store a stamped object; storing it again is a no-op
    fn store_object(&self, object: &ObjectMessage) -> Result<InventoryVector>;

    fn contains(&self, iv: &InventoryVector) -> Result<bool>;

    /// Purge expired objects, returning how many were removed
    fn cleanup(&self) -> Result<usize>;
}

/// An object waiting for its proof of work
#[derive(Debug, Clone, PartialEq)]
pub struct ProofOfWorkItem {
    pub object: ObjectMessage,
    pub nonce_trials_per_byte: u64,
    pub extra_bytes: u64,
}

pub trait ProofOfWorkRepository: Send + Sync {
    /// Initial hashes of all pending items
    fn get_items(&self) -> Result<Vec<[u8; 64]>>;

    fn get_item(&self, initial_hash: &[u8; 64]) -> Result<Option<ProofOfWorkItem>>;

    /// Queue `object`, returning its initial hash
    fn put_object(
        &self,
        object: ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<[u8; 64]>;

    fn remove_object(&self, initial_hash: &[u8; 64]) -> Result<()>;
}

pub(crate) fn matches_filter(
    object_stream: u64,
    object_version: u64,
    object_type: ObjectType,
    stream: u64,
    version: Option<u64>,
    types: &[ObjectType],
) -> bool {
    object_stream == stream
        && version.map_or(true, |v| v == object_version)
        && (types.is_empty() || types.contains(&object_type))
}
