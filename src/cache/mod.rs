use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::http::HttpGet;
use crate::models::{Track, album_key};

const DEFAULT_ICON: &str = "default";

/// Album art on disk, one file per (artist, album). A file existing is the cache entry
/// existing; there is no index and nothing is ever evicted.
#[derive(Debug, Clone)]
pub struct IconCache {
    dir: PathBuf,
}

impl IconCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the art for this album lives (or would live). Pure, no I/O.
    ///
    /// The name is URL-safe base64 of `artist-album`, so it never contains a path separator
    /// and stays reversible.
    pub fn path_for(&self, artist: &str, album: &str) -> PathBuf {
        self.dir
            .join(URL_SAFE_NO_PAD.encode(album_key(artist, album).as_bytes()))
    }

    pub fn exists(&self, artist: &str, album: &str) -> bool {
        self.path_for(artist, album).is_file()
    }

    /// Cached art for the track's album, if any.
    pub fn icon_for(&self, track: &Track) -> Option<PathBuf> {
        let path = self.path_for(&track.artist, &track.album);
        path.is_file().then_some(path)
    }

    pub fn commit(&self, artist: &str, album: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(artist, album);
        write_atomically(&path, bytes)?;
        debug!("Cached art for {} at {}", album_key(artist, album), path.display());
        Ok(path)
    }

    pub fn default_icon(&self) -> PathBuf {
        self.dir.join(DEFAULT_ICON)
    }

    /// Download the default icon unless it is already on disk.
    pub fn prime_default(&self, http: &impl HttpGet, url: &str) -> Result<PathBuf> {
        let path = self.default_icon();
        if path.is_file() {
            return Ok(path);
        }

        info!("Fetching default icon from {url}");
        let bytes = http.get(url)?;
        write_atomically(&path, &bytes)?;
        Ok(path)
    }
}

// Readers only ever see a complete file or none at all.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let fs_err = |source| Error::Fs {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.part", std::process::id()));
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(fs_err)?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        fs_err(source)
    })
}
