pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Encrypt a directory tree into armored envelopes for many recipients.
#[derive(Parser, Debug)]
#[command(name = "sealdir", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Encryption backend to use: pgp or age [default: from config, else pgp]
    #[arg(long, global = true)]
    pub cipher: Option<String>,

    /// Path to alternative config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode: only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt every file under a directory into a mirrored tree
    Encrypt {
        /// Directory holding the plaintext files
        #[arg(long)]
        source: PathBuf,

        /// Directory receiving the encrypted tree
        #[arg(long)]
        target: PathBuf,

        /// Public key ring file. Repeat for several rings
        #[arg(long = "key", value_name = "FILE")]
        keys: Vec<PathBuf>,

        /// Number of files encrypted in parallel
        #[arg(short, long, env = "SEALDIR_JOBS")]
        jobs: Option<usize>,

        /// Print the batch report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decrypt a single encrypted file
    Decrypt {
        /// Private key (secret key or identity file)
        #[arg(long, value_name = "FILE")]
        key: PathBuf,

        /// Encrypted file to decrypt
        #[arg(long)]
        file: PathBuf,

        /// Directory receiving the plaintext
        #[arg(long)]
        target: PathBuf,

        /// Name of the plaintext file inside the target directory
        #[arg(long, default_value = "decrypted")]
        name: String,
    },
}
