use crate::core::proof_of_work::{DEFAULT_EXTRA_BYTES, DEFAULT_NONCE_TRIALS_PER_BYTE};
use crate::error::{BitmessageError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 8444;

/// Four days
pub const DEFAULT_TTL: u64 = 4 * 24 * 60 * 60;

/// Objects living longer than 28 days (plus some slack) are not relayed
pub const MAX_TTL: u64 = 28 * 24 * 60 * 60 + 3 * 60 * 60;

pub const DEFAULT_USER_AGENT: &str = concat!("/bitmessage-core:", env!("CARGO_PKG_VERSION"), "/");

const PORT_KEY: &str = "BITMESSAGE_PORT";
const POW_THREADS_KEY: &str = "BITMESSAGE_POW_THREADS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Proof of work difficulty we demand and use for our own objects
    pub nonce_trials_per_byte: u64,
    pub extra_bytes: u64,
    /// Lifetime of objects we create, in seconds
    pub ttl: u64,
    pub user_agent: String,
    pub port: u16,
    pub streams: Vec<u64>,
    /// Worker threads for proof of work; 0 means one per core
    pub pow_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            nonce_trials_per_byte: DEFAULT_NONCE_TRIALS_PER_BYTE,
            extra_bytes: DEFAULT_EXTRA_BYTES,
            ttl: DEFAULT_TTL,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            port: DEFAULT_PORT,
            streams: vec![1],
            pow_threads: 0,
        }
    }
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn new() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file; keys it does not mention keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BitmessageError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let mut config = Config::from_toml(&content)?;
        config.apply_env()?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| BitmessageError::Config(e.to_string()))
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = env::var(PORT_KEY) {
            self.port = port
                .parse()
                .map_err(|_| BitmessageError::Config(format!("Invalid {PORT_KEY}: {port}")))?;
        }
        if let Ok(threads) = env::var(POW_THREADS_KEY) {
            self.pow_threads = threads.parse().map_err(|_| {
                BitmessageError::Config(format!("Invalid {POW_THREADS_KEY}: {threads}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.nonce_trials_per_byte == 0 {
            return Err(BitmessageError::Config(
                "Nonce trials per byte cannot be zero".to_string(),
            ));
        }

        if self.extra_bytes == 0 {
            return Err(BitmessageError::Config(
                "Extra bytes cannot be zero".to_string(),
            ));
        }

        if self.ttl == 0 || self.ttl > MAX_TTL {
            return Err(BitmessageError::Config(format!(
                "TTL must be between 1 and {MAX_TTL} seconds, got {}",
                self.ttl
            )));
        }

        if self.port == 0 {
            return Err(BitmessageError::Config("Port cannot be zero".to_string()));
        }

        if self.streams.is_empty() || self.streams.contains(&0) {
            return Err(BitmessageError::Config(
                "At least one non-zero stream is required".to_string(),
            ));
        }

        Ok(())
    }
}
