use anyhow::{Context, Result};

use super::Cli;
use crate::cache::IconCache;
use crate::config::Config;
use crate::daemon::Daemon;
use crate::daemon::bus::BusSession;
use crate::tracker::PlayerSource;

pub struct App {
    pub config: Config,
}

impl App {
    pub fn new(cli: &Cli) -> Self {
        let mut config = Config::default();
        if let Some(dir) = &cli.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(player) = &cli.player {
            config.player.bus_name = player.clone();
        }
        if cli.no_keys {
            config.keys.enabled = false;
        }
        Self { config }
    }

    pub fn run(&self) -> Result<()> {
        tracing::debug!(
            "Configuration: {}",
            serde_json::to_string(&self.config).unwrap_or_default()
        );
        Daemon::new(self.config.clone())?.run()
    }

    pub fn status(&self) -> Result<()> {
        let bus = BusSession::connect(&self.config.player)
            .with_context(|| "Failed to connect to the session bus")?;
        let state = bus
            .player()
            .playback()
            .with_context(|| format!("Failed to query {}", self.config.player.bus_name))?;

        println!("{}", serde_json::to_string_pretty(&state)?);
        Ok(())
    }

    pub fn icon_path(&self, artist: &str, album: &str) -> Result<()> {
        let cache = IconCache::new(&self.config.cache_dir);
        let path = cache.path_for(artist, album);

        println!("{}", path.display());
        if cache.exists(artist, album) {
            println!("cached");
        } else {
            println!("not cached");
        }
        Ok(())
    }
}
