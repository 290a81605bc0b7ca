use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
pub use commands::*;

#[derive(Parser)]
#[command(name = "spotify-extras")]
#[command(about = "Desktop notifications and media key support for Spotify")]
#[command(version)]
pub struct Cli {
    /// Directory for cached album art
    #[arg(long, global = true, env = "SPOTIFY_EXTRAS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Bus name of the player to follow
    #[arg(long, global = true, env = "SPOTIFY_EXTRAS_PLAYER")]
    pub player: Option<String>,

    /// Don't handle media keys
    #[arg(long, global = true)]
    pub no_keys: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon in the foreground
    Run,

    /// Print what the player is doing as JSON
    Status,

    /// Show where the art for an album is cached
    IconPath {
        /// Album artist
        artist: String,
        /// Album title
        album: String,
    },
}
