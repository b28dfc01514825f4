use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "filecrypt",
    about = "Encrypt and decrypt files with locally stored keys",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Key store file to use instead of the configured one.
    #[arg(long, global = true, value_name = "PATH", env = "FILECRYPT_KEYS_FILE")]
    pub keys_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(flatten)]
    Key(KeyCommand),
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Commands that operate on the key store.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum KeyCommand {
    /// Create a new random key under the given identifier.
    GenerateKey {
        /// Free-text description stored with the key.
        #[arg(short = 'm', value_name = "DESCRIPTION")]
        description: Option<String>,
        id: String,
    },
    /// Encrypt a file into `<file>.enc`.
    Encrypt { file: PathBuf, id: String },
    /// Decrypt a `.enc` file next to it, with the suffix removed.
    Decrypt { file: PathBuf, id: String },
    /// Show all stored keys.
    ListKey,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
