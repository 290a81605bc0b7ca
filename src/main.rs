mod artwork;
mod cache;
mod cli;
mod config;
mod daemon;
mod error;
mod http;
mod keys;
mod models;
mod notify;
mod tracker;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{App, Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = App::new(&cli);

    match cli.command {
        Commands::Run => {
            app.run()?;
        }
        Commands::Status => {
            app.status()?;
        }
        Commands::IconPath { artist, album } => {
            app.icon_path(&artist, &album)?;
        }
    }

    Ok(())
}
