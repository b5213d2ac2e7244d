//! Proof-of-work engines
//!
//! An engine searches for a nonce on background threads and reports it
//! through a callback; [`ProofOfWorkService`] ties engines to the pending
//! work queue, the inventory and the network.

pub mod multi_threaded;
pub mod service;
pub mod simple;

pub use multi_threaded::MultiThreadedPowEngine;
pub use service::ProofOfWorkService;
pub use simple::SimplePowEngine;

/// Receives `(initial_hash, nonce)` once the search succeeds
pub type PowCallback = Box<dyn FnOnce([u8; 64], [u8; 8]) + Send>;

pub trait ProofOfWorkEngine: Send + Sync {
    /// Start searching and return immediately. The callback is invoked
    /// exactly once, from a worker thread, with a nonce whose trial value
    /// does not exceed `target`.
    fn calculate_nonce(&self, initial_hash: [u8; 64], target: u64, callback: PowCallback);
}
