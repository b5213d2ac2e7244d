//! Command-line interface
//!
//! Operator commands for creating and inspecting identities and for
//! trying out proof of work.

pub mod commands;

pub use commands::{Command, Opt};
