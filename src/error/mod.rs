//! Error handling for the Bitmessage core
//!
//! One error type covers the codec, the object model, the cryptographic
//! pipeline and the reference stores. Callers decide what a failure means
//! for a connection: frame-level errors drop the frame, crypto errors make a
//! message unreadable.

use std::fmt;

/// Result type alias for Bitmessage operations
pub type Result<T> = std::result::Result<T, BitmessageError>;

/// Error taxonomy for wire decoding, cryptography and persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmessageError {
    /// Malformed wire bytes (bad marker, bad length, out of range value)
    Format(String),
    /// Input ended before a complete value could be read
    TruncatedInput { needed: usize, available: usize },
    /// Network frame checksum did not match its payload
    Checksum { expected: [u8; 4], actual: [u8; 4] },
    /// Object nonce does not satisfy the proof-of-work target
    InsufficientProofOfWork { target: u64, value: u64 },
    /// Wrong key, tampered ciphertext or tampered MAC
    DecryptionFailed(String),
    /// Signature missing or not valid for the claimed signing key
    SignatureInvalid(String),
    /// Address string could not be parsed
    InvalidAddress(String),
    /// Key handling or other cryptographic operation errors
    Crypto(String),
    /// Operation not allowed in the current state (e.g. status transition)
    InvalidState(String),
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors for stored records
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
}

impl fmt::Display for BitmessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitmessageError::Format(msg) => write!(f, "Format error: {msg}"),
            BitmessageError::TruncatedInput { needed, available } => {
                write!(
                    f,
                    "Truncated input: needed {needed} bytes, {available} available"
                )
            }
            BitmessageError::Checksum { expected, actual } => write!(
                f,
                "Checksum mismatch: expected {}, got {}",
                hex::encode(expected),
                hex::encode(actual)
            ),
            BitmessageError::InsufficientProofOfWork { target, value } => {
                write!(
                    f,
                    "Insufficient proof of work: target {target}, achieved {value}"
                )
            }
            BitmessageError::DecryptionFailed(msg) => write!(f, "Decryption failed: {msg}"),
            BitmessageError::SignatureInvalid(msg) => write!(f, "Invalid signature: {msg}"),
            BitmessageError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BitmessageError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BitmessageError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            BitmessageError::Database(msg) => write!(f, "Database error: {msg}"),
            BitmessageError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BitmessageError::Io(msg) => write!(f, "I/O error: {msg}"),
            BitmessageError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for BitmessageError {}

impl From<std::io::Error> for BitmessageError {
    fn from(err: std::io::Error) -> Self {
        BitmessageError::Io(err.to_string())
    }
}

impl From<sled::Error> for BitmessageError {
    fn from(err: sled::Error) -> Self {
        BitmessageError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BitmessageError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BitmessageError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BitmessageError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BitmessageError::Serialization(err.to_string())
    }
}

impl From<rmpv::encode::Error> for BitmessageError {
    fn from(err: rmpv::encode::Error) -> Self {
        BitmessageError::Format(format!("MessagePack encoding failed: {err}"))
    }
}

impl From<rmpv::decode::Error> for BitmessageError {
    fn from(err: rmpv::decode::Error) -> Self {
        BitmessageError::Format(format!("MessagePack decoding failed: {err}"))
    }
}

impl From<k256::ecdsa::Error> for BitmessageError {
    fn from(err: k256::ecdsa::Error) -> Self {
        BitmessageError::Crypto(err.to_string())
    }
}

impl From<k256::elliptic_curve::Error> for BitmessageError {
    fn from(err: k256::elliptic_curve::Error) -> Self {
        BitmessageError::Crypto(format!("Elliptic curve error: {err}"))
    }
}

impl From<toml::de::Error> for BitmessageError {
    fn from(err: toml::de::Error) -> Self {
        BitmessageError::Config(err.to_string())
    }
}
