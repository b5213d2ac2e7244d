use crate::core::{InventoryVector, ObjectMessage, ObjectType};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::storage::{matches_filter, Inventory, CLEANUP_GRACE_PERIOD};
use crate::utils::{deserialize, serialize, unix_time};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

const INVENTORY_TREE: &str = "inventory";

/// Index fields next to the wire bytes so queries need not parse objects
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
struct InventoryRecord {
    stream: u64,
    version: u64,
    object_type: u32,
    expires_time: u64,
    object: Vec<u8>,
}

impl InventoryRecord {
    fn matches(&self, stream: u64, version: Option<u64>, types: &[ObjectType]) -> bool {
        matches_filter(
            self.stream,
            self.version,
            ObjectType::from_number(self.object_type),
            stream,
            version,
            types,
        )
    }
}

/// Inventory in a sled tree: ( K -> inventory vector, V => InventoryRecord )
pub struct SledInventory {
    crypto: Arc<dyn Cryptography>,
    tree: sled::Tree,
}

impl SledInventory {
    pub fn open(path: impl AsRef<Path>, crypto: Arc<dyn Cryptography>) -> Result<SledInventory> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            BitmessageError::Database(format!(
                "Failed to open inventory at {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::new(&db, crypto)
    }

    pub fn new(db: &sled::Db, crypto: Arc<dyn Cryptography>) -> Result<SledInventory> {
        let tree = db.open_tree(INVENTORY_TREE).map_err(|e| {
            BitmessageError::Database(format!("Failed to open inventory tree: {e}"))
        })?;
        Ok(SledInventory { crypto, tree })
    }

    pub fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }

    fn records(&self) -> impl Iterator<Item = Result<(InventoryVector, InventoryRecord)>> + '_ {
        self.tree.iter().map(|item| {
            let (key, value) = item.map_err(|e| {
                BitmessageError::Database(format!("Failed to iterate inventory: {e}"))
            })?;
            Ok((InventoryVector::from_slice(&key)?, deserialize(&value)?))
        })
    }
}

impl Inventory for SledInventory {
    fn get_inventory(&self, streams: &[u64]) -> Result<Vec<InventoryVector>> {
        let now = unix_time();
        let mut result = Vec::new();
        for record in self.records() {
            let (iv, record) = record?;
            if record.expires_time >= now && streams.contains(&record.stream) {
                result.push(iv);
            }
        }
        Ok(result)
    }

    fn get_missing(
        &self,
        offered: &[InventoryVector],
        streams: &[u64],
    ) -> Result<Vec<InventoryVector>> {
        let mut missing = Vec::new();
        for iv in offered {
            let known = match self.tree.get(iv.as_bytes())? {
                Some(value) => {
                    let record: InventoryRecord = deserialize(&value)?;
                    streams.contains(&record.stream)
                }
                None => false,
            };
            if !known {
                missing.push(*iv);
            }
        }
        Ok(missing)
    }

    fn get_object(&self, iv: &InventoryVector) -> Result<Option<ObjectMessage>> {
        match self.tree.get(iv.as_bytes())? {
            Some(value) => {
                let record: InventoryRecord = deserialize(&value)?;
                Ok(Some(ObjectMessage::from_bytes(&record.object)?))
            }
            None => Ok(None),
        }
    }

    fn get_objects(
        &self,
        stream: u64,
        version: Option<u64>,
        types: &[ObjectType],
    ) -> Result<Vec<ObjectMessage>> {
        let mut objects = Vec::new();
        for record in self.records() {
            let (_, record) = record?;
            if record.matches(stream, version, types) {
                objects.push(ObjectMessage::from_bytes(&record.object)?);
            }
        }
        Ok(objects)
    }

    fn store_object(&self, object: &ObjectMessage) -> Result<InventoryVector> {
        let bytes = object.to_bytes()?;
        let iv = InventoryVector::of_object_bytes(self.crypto.as_ref(), &bytes);
        if self.tree.contains_key(iv.as_bytes())? {
            debug!("Object {iv} already in inventory");
            return Ok(iv);
        }
        let record = InventoryRecord {
            stream: object.stream(),
            version: object.version(),
            object_type: object.object_type().number(),
            expires_time: object.expires_time(),
            object: bytes,
        };
        self.tree.insert(iv.as_bytes(), serialize(&record)?)?;
        Ok(iv)
    }

    fn contains(&self, iv: &InventoryVector) -> Result<bool> {
        Ok(self.tree.contains_key(iv.as_bytes())?)
    }

    fn cleanup(&self) -> Result<usize> {
        let cutoff = unix_time().saturating_sub(CLEANUP_GRACE_PERIOD);
        let mut expired = Vec::new();
        for record in self.records() {
            let (iv, record) = record?;
            if record.expires_time < cutoff {
                expired.push(iv);
            }
        }
        for iv in &expired {
            self.tree.remove(iv.as_bytes())?;
        }
        self.tree.flush()?;
        info!("Removed {} expired objects", expired.len());
        Ok(expired.len())
    }
}
