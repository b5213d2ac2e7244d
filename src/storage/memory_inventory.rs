use crate::core::{InventoryVector, ObjectMessage, ObjectType};
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::storage::{matches_filter, Inventory, CLEANUP_GRACE_PERIOD};
use crate::utils::unix_time;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// ( K -> inventory vector, V => stamped object )
pub struct MemoryInventory {
    crypto: Arc<dyn Cryptography>,
    inner: RwLock<HashMap<InventoryVector, ObjectMessage>>,
}

impl MemoryInventory {
    pub fn new(crypto: Arc<dyn Cryptography>) -> MemoryInventory {
        MemoryInventory {
            crypto,
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<InventoryVector, ObjectMessage>>> {
        self.inner.read().map_err(|_| {
            BitmessageError::Database("Failed to acquire read lock on inventory".to_string())
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<InventoryVector, ObjectMessage>>> {
        self.inner.write().map_err(|_| {
            BitmessageError::Database("Failed to acquire write lock on inventory".to_string())
        })
    }
}

impl Inventory for MemoryInventory {
    fn get_inventory(&self, streams: &[u64]) -> Result<Vec<InventoryVector>> {
        let now = unix_time();
        Ok(self
            .read()?
            .iter()
            .filter(|(_, object)| !object.is_expired(now) && streams.contains(&object.stream()))
            .map(|(iv, _)| *iv)
            .collect())
    }

    fn get_missing(
        &self,
        offered: &[InventoryVector],
        streams: &[u64],
    ) -> Result<Vec<InventoryVector>> {
        let objects = self.read()?;
        Ok(offered
            .iter()
            .filter(|iv| match objects.get(*iv) {
                Some(object) => !streams.contains(&object.stream()),
                None => true,
            })
            .copied()
            .collect())
    }

    fn get_object(&self, iv: &InventoryVector) -> Result<Option<ObjectMessage>> {
        Ok(self.read()?.get(iv).cloned())
    }

    fn get_objects(
        &self,
        stream: u64,
        version: Option<u64>,
        types: &[ObjectType],
    ) -> Result<Vec<ObjectMessage>> {
        Ok(self
            .read()?
            .values()
            .filter(|object| {
                matches_filter(
                    object.stream(),
                    object.version(),
                    object.object_type(),
                    stream,
                    version,
                    types,
                )
            })
            .cloned()
            .collect())
    }

    fn store_object(&self, object: &ObjectMessage) -> Result<InventoryVector> {
        let iv = object.inventory_vector(self.crypto.as_ref())?;
        self.write()?.entry(iv).or_insert_with(|| object.clone());
        Ok(iv)
    }

    fn contains(&self, iv: &InventoryVector) -> Result<bool> {
        Ok(self.read()?.contains_key(iv))
    }

    fn cleanup(&self) -> Result<usize> {
        let cutoff = unix_time().saturating_sub(CLEANUP_GRACE_PERIOD);
        let mut objects = self.write()?;
        let before = objects.len();
        objects.retain(|_, object| !object.is_expired(cutoff));
        let removed = before - objects.len();
        debug!("Removed {removed} expired objects");
        Ok(removed)
    }
}
