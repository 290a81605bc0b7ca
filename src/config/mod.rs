use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "spotify-extras";

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub player: PlayerConfig,
    pub artwork: ArtworkConfig,
    pub keys: KeysConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerConfig {
    /// Well-known bus name the player registers under.
    pub bus_name: String,
    pub object_path: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            bus_name: "org.mpris.MediaPlayer2.spotify".to_string(),
            object_path: "/org/mpris/MediaPlayer2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtworkConfig {
    pub default_icon_url: String,
    /// `{id}` is replaced with the trailing segment of the track id.
    pub track_page_url: String,
    pub timeout_secs: u64,
    pub queue_capacity: usize,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            default_icon_url: "https://open.spotify.com/favicon.ico".to_string(),
            track_page_url: "https://open.spotify.com/track/{id}".to_string(),
            timeout_secs: 10,
            queue_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeysConfig {
    pub enabled: bool,
    pub bus_name: String,
    pub object_path: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bus_name: "org.gnome.SettingsDaemon.MediaKeys".to_string(),
            object_path: "/org/gnome/SettingsDaemon/MediaKeys".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
            player: PlayerConfig::default(),
            artwork: ArtworkConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

impl Config {
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!(
                "Failed to create cache directory: {}",
                self.cache_dir.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_dir_is_app_specific() {
        let config = Config::default();
        assert!(config.cache_dir.ends_with(APP_NAME));
        assert!(config.artwork.track_page_url.contains("{id}"));
    }

    #[test]
    fn test_ensure_dirs_creates_nested_cache_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config {
            cache_dir: tmp.path().join("a").join("b"),
            ..Config::default()
        };

        config.ensure_dirs().unwrap();
        assert!(config.cache_dir.is_dir());

        // Second call is a no-op.
        config.ensure_dirs().unwrap();
    }
}
