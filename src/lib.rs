//! # bitmessage-core
//!
//! Core of a Bitmessage client: the wire protocol, the object model with
//! its encryption and signatures, proof of work, and the stores a node
//! needs to hold objects and pending work.
//!
//! ## Layout
//! - `codec/`: varints, var strings and the byte reader everything parses with
//! - `crypto/`: the [`Cryptography`] port, secp256k1 implementation, ECIES boxes
//! - `core/`: objects, payloads, inventory vectors, network addresses, PoW math
//! - `message/`: plaintext messages, labels, status, encrypted custom messages
//! - `extended/`: the MessagePack + zlib extended message encoding
//! - `network/`: frames, control payloads and a stream reader for sockets
//! - `pow/`: proof of work engines and the service that finishes objects
//! - `storage/`: inventory and pending proof of work, in memory or in sled
//! - `wallet/`: addresses, private keys, WIF
//! - `config/`, `cli/`: operator settings and commands
//!
//! Every component receives its [`Cryptography`] explicitly; nothing here
//! keeps global state.

pub mod cli;
pub mod codec;
pub mod config;
pub mod core;
pub mod crypto;
pub mod error;
pub mod extended;
pub mod message;
pub mod network;
pub mod pow;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use cli::{Command, Opt};
pub use config::Config;
pub use core::payload::{Broadcast, GetPubkey, Msg, Pubkey, DOES_ACK, INCLUDE_DESTINATION};
pub use core::{InventoryVector, NetworkAddress, ObjectMessage, ObjectPayload, ObjectType};
pub use crypto::{CryptoBox, Cryptography, Secp256k1Cryptography};
pub use error::{BitmessageError, Result};
pub use extended::ExtendedEncoding;
pub use message::{CryptoCustomMessage, Plaintext, PlaintextType, Status};
pub use network::{MessagePayload, MessageReader, NetworkHandler, NetworkMessage};
pub use pow::{MultiThreadedPowEngine, ProofOfWorkEngine, ProofOfWorkService, SimplePowEngine};
pub use storage::{
    Inventory, MemoryInventory, MemoryProofOfWorkRepository, ProofOfWorkRepository,
    SledInventory, SledProofOfWorkRepository,
};
pub use utils::{unix_time, unix_time_plus};
pub use wallet::{export_wif, import_wif, BitmessageAddress, PrivateKey};
