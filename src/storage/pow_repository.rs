use crate::core::ObjectMessage;
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::storage::{ProofOfWorkItem, ProofOfWorkRepository};
use crate::utils::{deserialize, serialize};
use data_encoding::HEXLOWER;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

const POW_TREE: &str = "proof_of_work";

fn short(initial_hash: &[u8; 64]) -> String {
    HEXLOWER.encode(&initial_hash[..8])
}

/// ( K -> initial hash, V => pending item )
pub struct MemoryProofOfWorkRepository {
    crypto: Arc<dyn Cryptography>,
    inner: RwLock<HashMap<[u8; 64], ProofOfWorkItem>>,
}

impl MemoryProofOfWorkRepository {
    pub fn new(crypto: Arc<dyn Cryptography>) -> MemoryProofOfWorkRepository {
        MemoryProofOfWorkRepository {
            crypto,
            inner: RwLock::new(HashMap::new()),
        }
    }
}

fn lock_error() -> BitmessageError {
    BitmessageError::Database("Failed to acquire lock on proof of work queue".to_string())
}

impl ProofOfWorkRepository for MemoryProofOfWorkRepository {
    fn get_items(&self) -> Result<Vec<[u8; 64]>> {
        Ok(self.inner.read().map_err(|_| lock_error())?.keys().copied().collect())
    }

    fn get_item(&self, initial_hash: &[u8; 64]) -> Result<Option<ProofOfWorkItem>> {
        Ok(self
            .inner
            .read()
            .map_err(|_| lock_error())?
            .get(initial_hash)
            .cloned())
    }

    fn put_object(
        &self,
        object: ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<[u8; 64]> {
        let initial_hash = self.crypto.initial_hash(&object)?;
        debug!("Queued object {} for proof of work", short(&initial_hash));
        self.inner.write().map_err(|_| lock_error())?.insert(
            initial_hash,
            ProofOfWorkItem {
                object,
                nonce_trials_per_byte,
                extra_bytes,
            },
        );
        Ok(initial_hash)
    }

    fn remove_object(&self, initial_hash: &[u8; 64]) -> Result<()> {
        self.inner
            .write()
            .map_err(|_| lock_error())?
            .remove(initial_hash);
        Ok(())
    }
}

/// Objects are kept in their wire form without nonce
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
struct PowRecord {
    object: Vec<u8>,
    nonce_trials_per_byte: u64,
    extra_bytes: u64,
}

/// Pending proof of work in a sled tree, so it can be resumed after a
/// restart
pub struct SledProofOfWorkRepository {
    crypto: Arc<dyn Cryptography>,
    tree: sled::Tree,
}

impl SledProofOfWorkRepository {
    pub fn open(
        path: impl AsRef<Path>,
        crypto: Arc<dyn Cryptography>,
    ) -> Result<SledProofOfWorkRepository> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            BitmessageError::Database(format!(
                "Failed to open proof of work queue at {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::new(&db, crypto)
    }

    pub fn new(db: &sled::Db, crypto: Arc<dyn Cryptography>) -> Result<SledProofOfWorkRepository> {
        let tree = db.open_tree(POW_TREE).map_err(|e| {
            BitmessageError::Database(format!("Failed to open proof of work tree: {e}"))
        })?;
        Ok(SledProofOfWorkRepository { crypto, tree })
    }
}

impl ProofOfWorkRepository for SledProofOfWorkRepository {
    fn get_items(&self) -> Result<Vec<[u8; 64]>> {
        let mut items = Vec::new();
        for key in self.tree.iter().keys() {
            let key = key.map_err(|e| {
                BitmessageError::Database(format!("Failed to iterate proof of work queue: {e}"))
            })?;
            let hash: [u8; 64] = key.as_ref().try_into().map_err(|_| {
                BitmessageError::Database(format!("Malformed queue key of {} bytes", key.len()))
            })?;
            items.push(hash);
        }
        Ok(items)
    }

    fn get_item(&self, initial_hash: &[u8; 64]) -> Result<Option<ProofOfWorkItem>> {
        let value = match self.tree.get(initial_hash)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let record: PowRecord = deserialize(&value)?;
        let object = ObjectMessage::read_without_nonce(&mut crate::codec::Reader::new(&record.object))?;
        Ok(Some(ProofOfWorkItem {
            object,
            nonce_trials_per_byte: record.nonce_trials_per_byte,
            extra_bytes: record.extra_bytes,
        }))
    }

    fn put_object(
        &self,
        object: ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<[u8; 64]> {
        let bytes = object.payload_bytes_without_nonce()?;
        let initial_hash = self.crypto.sha512(&[&bytes]);
        let record = PowRecord {
            object: bytes,
            nonce_trials_per_byte,
            extra_bytes,
        };
        self.tree.insert(initial_hash, serialize(&record)?)?;
        self.tree.flush()?;
        debug!("Queued object {} for proof of work", short(&initial_hash));
        Ok(initial_hash)
    }

    fn remove_object(&self, initial_hash: &[u8; 64]) -> Result<()> {
        self.tree.remove(initial_hash)?;
        self.tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payload::{GenericPayload, ObjectPayload};
    use crate::crypto::Secp256k1Cryptography;
    use tempfile::TempDir;

    fn object() -> ObjectMessage {
        ObjectMessage::new(
            ObjectPayload::Generic(GenericPayload::new(30, 1, 1, vec![5, 6, 7])),
            1_900_000_000,
        )
    }

    fn exercise(repository: &dyn ProofOfWorkRepository, crypto: &dyn Cryptography) {
        let hash = repository.put_object(object(), 1000, 1000).unwrap();
        assert_eq!(hash, crypto.initial_hash(&object()).unwrap());
        assert_eq!(repository.get_items().unwrap(), vec![hash]);

        let item = repository.get_item(&hash).unwrap().unwrap();
        assert_eq!(item.object, object());
        assert_eq!(item.nonce_trials_per_byte, 1000);
        assert_eq!(item.extra_bytes, 1000);

        repository.remove_object(&hash).unwrap();
        assert!(repository.get_item(&hash).unwrap().is_none());
        assert!(repository.get_items().unwrap().is_empty());
    }

    #[test]
    fn test_memory_repository() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let repository = MemoryProofOfWorkRepository::new(Arc::clone(&crypto));
        exercise(&repository, crypto.as_ref());
    }

    #[test]
    fn test_sled_repository() {
        let dir = TempDir::new().unwrap();
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let repository = SledProofOfWorkRepository::open(dir.path(), Arc::clone(&crypto)).unwrap();
        exercise(&repository, crypto.as_ref());
    }

    #[test]
    fn test_sled_repository_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let hash = {
            let repository =
                SledProofOfWorkRepository::open(dir.path(), Arc::clone(&crypto)).unwrap();
            repository.put_object(object(), 1, 1).unwrap()
        };
        let repository = SledProofOfWorkRepository::open(dir.path(), crypto).unwrap();
        assert_eq!(repository.get_items().unwrap(), vec![hash]);
        assert_eq!(repository.get_item(&hash).unwrap().unwrap().object, object());
    }
}
