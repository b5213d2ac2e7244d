//! Utility functions and helpers
//!
//! Base58, wall-clock time and the bincode layer used by the stores.

pub mod encoding;
pub mod serialization;
pub mod time;

pub use encoding::{base58_decode, base58_encode};
pub use serialization::{deserialize, serialize};
pub use time::{unix_time, unix_time_plus};
