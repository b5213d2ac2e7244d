use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bitmessage-core")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "newaddress", about = "Generate a random v4 identity")]
    NewAddress {
        #[arg(long, default_value_t = 1, help = "Stream number")]
        stream: u64,
        #[arg(long, help = "Require two leading zero bytes in the ripe")]
        shorter: bool,
    },
    #[command(
        name = "deterministic",
        about = "Derive identities from a passphrase"
    )]
    Deterministic {
        #[arg(help = "The passphrase")]
        passphrase: String,
        #[arg(long, default_value_t = 1, help = "Number of identities")]
        count: usize,
        #[arg(long, default_value_t = 4, help = "Address version (3 or 4)")]
        version: u64,
        #[arg(long, default_value_t = 1, help = "Stream number")]
        stream: u64,
        #[arg(long, help = "Require two leading zero bytes in the ripe")]
        shorter: bool,
    },
    #[command(name = "inspect", about = "Decode a BM- address")]
    Inspect {
        #[arg(help = "The address")]
        address: String,
    },
    #[command(
        name = "exportwif",
        about = "Export the keys of a passphrase identity as WIF"
    )]
    ExportWif {
        #[arg(help = "The passphrase")]
        passphrase: String,
        #[arg(long, default_value_t = 4, help = "Address version (3 or 4)")]
        version: u64,
        #[arg(long, default_value_t = 1, help = "Stream number")]
        stream: u64,
    },
    #[command(
        name = "solve",
        about = "Run proof of work on a sample object and report the nonce"
    )]
    Solve {
        #[arg(help = "Payload bytes of the sample object")]
        data: String,
        #[arg(long, help = "Nonce trials per byte (defaults to configuration)")]
        nonce_trials_per_byte: Option<u64>,
        #[arg(long, help = "Extra bytes (defaults to configuration)")]
        extra_bytes: Option<u64>,
        #[arg(long, help = "Search on a single thread")]
        simple: bool,
    },
}
