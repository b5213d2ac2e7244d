use crate::core::ObjectMessage;
use crate::crypto::Cryptography;
use crate::error::{BitmessageError, Result};
use crate::network::NetworkHandler;
use crate::pow::ProofOfWorkEngine;
use crate::storage::{Inventory, ProofOfWorkRepository};
use data_encoding::HEXLOWER;
use log::{debug, error, info};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Queues objects for proof of work and, once a nonce is found, stamps
/// them, stores them in the inventory and offers them to the network.
///
/// Pending work lives in a [`ProofOfWorkRepository`]; after a restart
/// [`ProofOfWorkService::resume`] picks it up again.
#[derive(Clone)]
pub struct ProofOfWorkService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    crypto: Arc<dyn Cryptography>,
    engine: Arc<dyn ProofOfWorkEngine>,
    repository: Arc<dyn ProofOfWorkRepository>,
    inventory: Arc<dyn Inventory>,
    network: Arc<dyn NetworkHandler>,
    in_flight: Mutex<HashSet<[u8; 64]>>,
}

fn short(initial_hash: &[u8; 64]) -> String {
    HEXLOWER.encode(&initial_hash[..8])
}

impl ProofOfWorkService {
    pub fn new(
        crypto: Arc<dyn Cryptography>,
        engine: Arc<dyn ProofOfWorkEngine>,
        repository: Arc<dyn ProofOfWorkRepository>,
        inventory: Arc<dyn Inventory>,
        network: Arc<dyn NetworkHandler>,
    ) -> ProofOfWorkService {
        ProofOfWorkService {
            inner: Arc::new(ServiceInner {
                crypto,
                engine,
                repository,
                inventory,
                network,
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Queue `object` and start searching for its nonce. Returns the
    /// initial hash identifying the pending item.
    pub fn do_proof_of_work(
        &self,
        object: ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<[u8; 64]> {
        let initial_hash =
            self.inner
                .repository
                .put_object(object.clone(), nonce_trials_per_byte, extra_bytes)?;
        ServiceInner::start(
            &self.inner,
            initial_hash,
            &object,
            nonce_trials_per_byte,
            extra_bytes,
        )?;
        Ok(initial_hash)
    }

    /// Restart every item still in the repository, returning how many
    /// were started
    pub fn resume(&self) -> Result<usize> {
        let mut started = 0;
        for initial_hash in self.inner.repository.get_items()? {
            let item = match self.inner.repository.get_item(&initial_hash)? {
                Some(item) => item,
                None => continue,
            };
            if ServiceInner::start(
                &self.inner,
                initial_hash,
                &item.object,
                item.nonce_trials_per_byte,
                item.extra_bytes,
            )? {
                started += 1;
            }
        }
        info!("Resumed proof of work for {started} objects");
        Ok(started)
    }

    /// Number of searches that have not reported back yet
    pub fn in_flight(&self) -> usize {
        self.inner
            .in_flight
            .lock()
            .map(|in_flight| in_flight.len())
            .unwrap_or(0)
    }
}

impl ServiceInner {
    /// Returns false if a search for `initial_hash` is already running
    fn start(
        inner: &Arc<ServiceInner>,
        initial_hash: [u8; 64],
        object: &ObjectMessage,
        nonce_trials_per_byte: u64,
        extra_bytes: u64,
    ) -> Result<bool> {
        {
            let mut in_flight = inner.in_flight.lock().map_err(|_| {
                BitmessageError::InvalidState("Proof of work bookkeeping is poisoned".to_string())
            })?;
            if !in_flight.insert(initial_hash) {
                debug!("Proof of work for {} already running", short(&initial_hash));
                return Ok(false);
            }
        }

        let completion = Arc::clone(inner);
        let result = inner.crypto.do_proof_of_work(
            object,
            nonce_trials_per_byte,
            extra_bytes,
            inner.engine.as_ref(),
            Box::new(move |hash, nonce| completion.on_nonce_found(hash, nonce)),
        );
        if let Err(e) = result {
            if let Ok(mut in_flight) = inner.in_flight.lock() {
                in_flight.remove(&initial_hash);
            }
            return Err(e);
        }
        debug!("Started proof of work for {}", short(&initial_hash));
        Ok(true)
    }

    /// The hash stays in flight until the item has left the repository,
    /// so a concurrent `resume` never starts a second search for it
    fn on_nonce_found(&self, initial_hash: [u8; 64], nonce: [u8; 8]) {
        if let Err(e) = self.complete(initial_hash, nonce) {
            error!(
                "Failed to complete proof of work for {}: {e}",
                short(&initial_hash)
            );
        }
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&initial_hash);
        }
    }

    fn complete(&self, initial_hash: [u8; 64], nonce: [u8; 8]) -> Result<()> {
        let item = match self.repository.get_item(&initial_hash)? {
            Some(item) => item,
            None => {
                debug!("Ignoring nonce for unknown object {}", short(&initial_hash));
                return Ok(());
            }
        };

        let mut object = item.object;
        object.set_nonce(nonce);
        self.crypto
            .check_proof_of_work(&object, item.nonce_trials_per_byte, item.extra_bytes)?;

        let iv = self.inventory.store_object(&object)?;
        self.repository.remove_object(&initial_hash)?;
        self.network.offer(iv);
        info!("Proof of work done, offering {} object {iv}", object.object_type());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::payload::{GenericPayload, ObjectPayload};
    use crate::core::InventoryVector;
    use crate::crypto::Secp256k1Cryptography;
    use crate::pow::{PowCallback, SimplePowEngine};
    use crate::storage::{MemoryInventory, MemoryProofOfWorkRepository, ProofOfWorkItem};
    use crate::utils::unix_time;
    use once_cell::sync::OnceCell;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::Duration;

    struct ChannelHandler(Mutex<Sender<InventoryVector>>);

    impl NetworkHandler for ChannelHandler {
        fn offer(&self, iv: InventoryVector) {
            let _ = self.0.lock().unwrap().send(iv);
        }
    }

    /// Remembers callbacks instead of running them
    #[derive(Default)]
    struct ManualEngine {
        pending: Mutex<Vec<([u8; 64], PowCallback)>>,
    }

    impl ProofOfWorkEngine for ManualEngine {
        fn calculate_nonce(&self, initial_hash: [u8; 64], _target: u64, callback: PowCallback) {
            self.pending.lock().unwrap().push((initial_hash, callback));
        }
    }

    struct Fixture {
        crypto: Arc<dyn Cryptography>,
        repository: Arc<MemoryProofOfWorkRepository>,
        inventory: Arc<MemoryInventory>,
        offered: Receiver<InventoryVector>,
        service: ProofOfWorkService,
    }

    fn fixture(engine: Arc<dyn ProofOfWorkEngine>) -> Fixture {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let repository = Arc::new(MemoryProofOfWorkRepository::new(Arc::clone(&crypto)));
        let inventory = Arc::new(MemoryInventory::new(Arc::clone(&crypto)));
        let (sender, offered) = mpsc::channel();
        let service = ProofOfWorkService::new(
            Arc::clone(&crypto),
            engine,
            repository.clone(),
            inventory.clone(),
            Arc::new(ChannelHandler(Mutex::new(sender))),
        );
        Fixture {
            crypto,
            repository,
            inventory,
            offered,
            service,
        }
    }

    fn object() -> ObjectMessage {
        ObjectMessage::new(
            ObjectPayload::Generic(GenericPayload::new(42, 1, 1, b"pow service".to_vec())),
            unix_time() + 600,
        )
    }

    #[test]
    fn test_stores_and_offers_stamped_object() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let f = fixture(Arc::new(SimplePowEngine::new(crypto)));

        f.service.do_proof_of_work(object(), 1, 1).unwrap();

        let iv = f.offered.recv_timeout(Duration::from_secs(90)).unwrap();
        let stored = f.inventory.get_object(&iv).unwrap().unwrap();
        assert!(stored.nonce().is_some());
        f.crypto.check_proof_of_work(&stored, 1, 1).unwrap();
        assert_eq!(f.inventory.len(), 1);
        assert!(f.repository.get_items().unwrap().is_empty());
        assert!(f.offered.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_duplicate_start_is_ignored() {
        let engine = Arc::new(ManualEngine::default());
        let f = fixture(engine.clone());

        let first = f.service.do_proof_of_work(object(), 1, 1).unwrap();
        assert_eq!(f.service.resume().unwrap(), 0);
        assert_eq!(engine.pending.lock().unwrap().len(), 1);
        assert_eq!(f.service.in_flight(), 1);
        assert_eq!(f.repository.get_items().unwrap(), vec![first]);
    }

    #[test]
    fn test_stray_callback_is_ignored() {
        let engine = Arc::new(ManualEngine::default());
        let f = fixture(engine.clone());
        let initial_hash = f.service.do_proof_of_work(object(), 1, 1).unwrap();

        let (hash, callback) = engine.pending.lock().unwrap().pop().unwrap();
        assert_eq!(hash, initial_hash);
        f.repository.remove_object(&initial_hash).unwrap();
        callback(hash, [0u8; 8]);

        assert!(f.inventory.is_empty());
        assert!(f.offered.try_recv().is_err());
        assert_eq!(f.service.in_flight(), 0);
    }

    #[test]
    fn test_bad_nonce_keeps_item_queued() {
        let engine = Arc::new(ManualEngine::default());
        let f = fixture(engine.clone());
        let queued = object();
        // hard enough that most nonces fail
        let initial_hash = f
            .service
            .do_proof_of_work(queued.clone(), 1_000_000, 1000)
            .unwrap();

        let (hash, callback) = engine.pending.lock().unwrap().pop().unwrap();
        let nonce = (0u64..)
            .map(u64::to_be_bytes)
            .find(|nonce| {
                let mut stamped = queued.clone();
                stamped.set_nonce(*nonce);
                f.crypto.check_proof_of_work(&stamped, 1_000_000, 1000).is_err()
            })
            .unwrap();
        callback(hash, nonce);

        assert!(f.inventory.is_empty());
        assert_eq!(f.repository.get_items().unwrap(), vec![initial_hash]);
        assert_eq!(f.service.resume().unwrap(), 1);
    }

    #[test]
    fn test_resume_restarts_pending_items() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let f = fixture(Arc::new(SimplePowEngine::new(crypto)));
        f.repository.put_object(object(), 1, 1).unwrap();

        assert_eq!(f.service.resume().unwrap(), 1);
        let iv = f.offered.recv_timeout(Duration::from_secs(90)).unwrap();
        assert!(f.inventory.contains(&iv).unwrap());
        assert!(f.repository.get_items().unwrap().is_empty());
    }

    /// Calls `resume` on the service the first time an item is read,
    /// which happens while a found nonce is being completed
    struct ResumingRepository {
        inner: MemoryProofOfWorkRepository,
        service: OnceCell<ProofOfWorkService>,
        armed: AtomicBool,
        resumed: Mutex<Option<usize>>,
    }

    impl ProofOfWorkRepository for ResumingRepository {
        fn get_items(&self) -> Result<Vec<[u8; 64]>> {
            self.inner.get_items()
        }

        fn get_item(&self, initial_hash: &[u8; 64]) -> Result<Option<ProofOfWorkItem>> {
            if self.armed.swap(false, Ordering::SeqCst) {
                let service = self.service.get().unwrap();
                *self.resumed.lock().unwrap() = Some(service.resume().unwrap());
            }
            self.inner.get_item(initial_hash)
        }

        fn put_object(
            &self,
            object: ObjectMessage,
            nonce_trials_per_byte: u64,
            extra_bytes: u64,
        ) -> Result<[u8; 64]> {
            self.inner.put_object(object, nonce_trials_per_byte, extra_bytes)
        }

        fn remove_object(&self, initial_hash: &[u8; 64]) -> Result<()> {
            self.inner.remove_object(initial_hash)
        }
    }

    #[test]
    fn test_resume_during_completion_starts_nothing() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let engine = Arc::new(ManualEngine::default());
        let repository = Arc::new(ResumingRepository {
            inner: MemoryProofOfWorkRepository::new(Arc::clone(&crypto)),
            service: OnceCell::new(),
            armed: AtomicBool::new(false),
            resumed: Mutex::new(None),
        });
        let inventory = Arc::new(MemoryInventory::new(Arc::clone(&crypto)));
        let (sender, offered) = mpsc::channel();
        let service = ProofOfWorkService::new(
            Arc::clone(&crypto),
            engine.clone(),
            repository.clone(),
            inventory.clone(),
            Arc::new(ChannelHandler(Mutex::new(sender))),
        );
        let _ = repository.service.set(service.clone());

        let queued = object();
        let initial_hash = service.do_proof_of_work(queued.clone(), 1, 1).unwrap();
        let (hash, callback) = engine.pending.lock().unwrap().pop().unwrap();
        let nonce = (0u64..)
            .map(u64::to_be_bytes)
            .find(|nonce| {
                let mut stamped = queued.clone();
                stamped.set_nonce(*nonce);
                crypto.check_proof_of_work(&stamped, 1, 1).is_ok()
            })
            .unwrap();

        repository.armed.store(true, Ordering::SeqCst);
        callback(hash, nonce);

        assert_eq!(*repository.resumed.lock().unwrap(), Some(0));
        assert!(engine.pending.lock().unwrap().is_empty());
        assert_eq!(hash, initial_hash);
        assert!(offered.try_recv().is_ok());
        assert_eq!(inventory.len(), 1);
        assert_eq!(service.in_flight(), 0);
        assert!(repository.get_items().unwrap().is_empty());
    }
}
