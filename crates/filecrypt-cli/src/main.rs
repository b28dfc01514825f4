mod cli;
mod config;
mod keys;
mod storage;

use std::io;

use crate::{
    cli::{Command, ConfigCommand},
    config::Config,
};
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the key store and file cipher.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    match cli.command {
        Command::Config(ConfigCommand::Init) => init_config()?,
        Command::Key(command) => {
            // Config is only consulted when no store path was given explicitly.
            let path = match cli.keys_file {
                Some(path) => path,
                None => storage::keys_path(&Config::load()?)?,
            };
            let mut store = storage::open_store(path);
            let mut out = io::stdout().lock();
            keys::handle(command, &mut store, &mut out)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    // Warnings only by default; stdout is reserved for command output.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn init_config() -> Result<()> {
    let path = config::config_path()?;
    if Config::default().write_if_missing(&path)? {
        println!("Config initialized at {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }
    Ok(())
}
