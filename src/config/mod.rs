//! Configuration management
//!
//! Protocol defaults for proof of work and message lifetime plus the node
//! settings the CLI needs. Values come from [`Config::default`], an
//! optional TOML file and a couple of environment overrides.

pub mod settings;

pub use settings::{Config, DEFAULT_PORT, DEFAULT_TTL, DEFAULT_USER_AGENT, MAX_TTL};
