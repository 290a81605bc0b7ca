use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("player {0} is not running")]
    PlayerUnavailable(String),

    #[error("unknown playback status '{0}'")]
    UnknownStatus(String),

    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("D-Bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    #[error("could not set up HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("no cover art link found on {0}")]
    NoArtwork(String),

    #[error("filesystem error at {path}: {source}")]
    Fs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
