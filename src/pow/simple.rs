use crate::core::proof_of_work;
use crate::crypto::Cryptography;
use crate::pow::{PowCallback, ProofOfWorkEngine};
use log::info;
use std::sync::Arc;
use std::thread;

/// Sequential search from nonce 0 on one background thread
pub struct SimplePowEngine {
    crypto: Arc<dyn Cryptography>,
}

impl SimplePowEngine {
    pub fn new(crypto: Arc<dyn Cryptography>) -> SimplePowEngine {
        SimplePowEngine { crypto }
    }
}

impl ProofOfWorkEngine for SimplePowEngine {
    fn calculate_nonce(&self, initial_hash: [u8; 64], target: u64, callback: PowCallback) {
        let crypto = Arc::clone(&self.crypto);
        thread::spawn(move || {
            let nonce = proof_of_work::solve(crypto.as_ref(), &initial_hash, target);
            info!("Found nonce {}", u64::from_be_bytes(nonce));
            callback(initial_hash, nonce);
        });
    }
}
