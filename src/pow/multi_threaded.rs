use crate::core::proof_of_work;
use crate::crypto::Cryptography;
use crate::pow::{PowCallback, ProofOfWorkEngine};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

/// Splits the nonce space over `threads` workers: worker `i` tries
/// `i, i + n, i + 2n, ...`. The first worker to flip the shared stop flag
/// delivers its nonce; everybody else stops at the next iteration.
pub struct MultiThreadedPowEngine {
    crypto: Arc<dyn Cryptography>,
    threads: usize,
}

impl MultiThreadedPowEngine {
    /// One worker per available core
    pub fn new(crypto: Arc<dyn Cryptography>) -> MultiThreadedPowEngine {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::with_threads(crypto, threads)
    }

    pub fn with_threads(crypto: Arc<dyn Cryptography>, threads: usize) -> MultiThreadedPowEngine {
        MultiThreadedPowEngine {
            crypto,
            threads: threads.max(1),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

impl ProofOfWorkEngine for MultiThreadedPowEngine {
    fn calculate_nonce(&self, initial_hash: [u8; 64], target: u64, callback: PowCallback) {
        let stop = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel();
        let step = self.threads as u64;

        for worker in 0..self.threads {
            let crypto = Arc::clone(&self.crypto);
            let stop = Arc::clone(&stop);
            let sender = sender.clone();
            thread::spawn(move || {
                search(
                    crypto.as_ref(),
                    &initial_hash,
                    target,
                    worker as u64,
                    step,
                    &stop,
                    sender,
                )
            });
        }
        drop(sender);

        thread::spawn(move || match receiver.recv() {
            Ok(nonce) => {
                info!("Found nonce {}", u64::from_be_bytes(nonce));
                callback(initial_hash, nonce);
            }
            Err(_) => error!("All proof of work workers ended without a nonce"),
        });
    }
}

fn search(
    crypto: &dyn Cryptography,
    initial_hash: &[u8; 64],
    target: u64,
    start: u64,
    step: u64,
    stop: &AtomicBool,
    result: Sender<[u8; 8]>,
) {
    let mut nonce = start;
    while !stop.load(Ordering::Acquire) {
        let candidate = nonce.to_be_bytes();
        if proof_of_work::trial_value(crypto, &candidate, initial_hash) <= target {
            if stop
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                let _ = result.send(candidate);
            } else {
                debug!("Worker {start} found a nonce after another worker won");
            }
            return;
        }
        nonce = nonce.wrapping_add(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Secp256k1Cryptography;
    use crate::pow::SimplePowEngine;
    use std::time::{Duration, Instant};

    fn run(engine: &dyn ProofOfWorkEngine, initial_hash: [u8; 64], target: u64) -> [u8; 8] {
        let (sender, receiver) = mpsc::channel();
        engine.calculate_nonce(
            initial_hash,
            target,
            Box::new(move |_, nonce| {
                let _ = sender.send(nonce);
            }),
        );
        let nonce = receiver.recv_timeout(Duration::from_secs(90)).unwrap();
        // exactly one callback
        assert!(receiver.recv_timeout(Duration::from_millis(200)).is_err());
        nonce
    }

    #[test]
    fn test_finds_valid_nonce() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let engine = MultiThreadedPowEngine::with_threads(Arc::clone(&crypto), 4);
        let initial_hash = crypto.sha512(&[b"multi threaded".as_slice()]);
        let target = u64::MAX / 5_000;

        let nonce = run(&engine, initial_hash, target);
        assert!(proof_of_work::trial_value(crypto.as_ref(), &nonce, &initial_hash) <= target);
    }

    #[test]
    fn test_easy_target_races_to_single_callback() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let engine = MultiThreadedPowEngine::with_threads(Arc::clone(&crypto), 8);
        let initial_hash = crypto.sha512(&[b"race".as_slice()]);
        // every worker succeeds on its first nonce
        run(&engine, initial_hash, u64::MAX);
    }

    #[test]
    fn test_at_least_one_worker() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        assert_eq!(MultiThreadedPowEngine::with_threads(crypto.clone(), 0).threads(), 1);
        assert!(MultiThreadedPowEngine::new(crypto).threads() >= 1);
    }

    #[test]
    fn test_workers_split_the_sequential_search() {
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let initial_hash = crypto.sha512(&[b"lanes".as_slice()]);
        let target = u64::MAX / 3_000;
        let step = 4u64;

        let first = u64::from_be_bytes(proof_of_work::solve(
            crypto.as_ref(),
            &initial_hash,
            target,
        ));
        let lane = first % step;

        let (sender, receiver) = mpsc::channel();
        let stop = AtomicBool::new(false);
        search(crypto.as_ref(), &initial_hash, target, lane, step, &stop, sender);

        // the owning worker reaches it after first / step + 1 trials
        assert_eq!(u64::from_be_bytes(receiver.recv().unwrap()), first);
        assert!(stop.load(Ordering::Acquire));
    }

    #[test]
    fn test_faster_than_simple_engine() {
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        if cores < 2 {
            // one core gives the workers nothing to share
            return;
        }
        let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());
        let multi = MultiThreadedPowEngine::new(Arc::clone(&crypto));
        let simple = SimplePowEngine::new(Arc::clone(&crypto));
        let target = u64::MAX / 400_000;

        let mut multi_time = Duration::ZERO;
        let mut simple_time = Duration::ZERO;
        for round in 0u8..6 {
            let initial_hash = crypto.sha512(&[&[round][..], b"timing".as_slice()]);
            let started = Instant::now();
            run(&simple, initial_hash, target);
            simple_time += started.elapsed();
            let started = Instant::now();
            run(&multi, initial_hash, target);
            multi_time += started.elapsed();
        }
        assert!(multi_time < simple_time);
    }
}
