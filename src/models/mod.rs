use serde::Serialize;
use std::fmt;

/// Identifier the player assigns to a track, e.g. `spotify:track:abc123` or
/// `/com/spotify/track/abc123`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The trailing segment of the id, which is what the public track page is keyed on.
    pub fn slug(&self) -> &str {
        self.0.rsplit([':', '/']).next().unwrap_or_default()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: TrackId,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub year: String,
}

impl Track {
    pub fn new(
        id: TrackId,
        artist: String,
        album: String,
        title: String,
        created: &str,
    ) -> Self {
        Self {
            id,
            artist,
            album,
            title,
            year: created.chars().take(4).collect(),
        }
    }

    /// Human readable album identity, the same string the artwork cache encodes.
    pub fn album_key(&self) -> String {
        album_key(&self.artist, &self.album)
    }
}

pub fn album_key(artist: &str, album: &str) -> String {
    format!("{artist}-{album}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Playing => write!(f, "Playing"),
            PlaybackStatus::Paused => write!(f, "Paused"),
            PlaybackStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

impl std::str::FromStr for PlaybackStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Playing" => Ok(PlaybackStatus::Playing),
            "Paused" => Ok(PlaybackStatus::Paused),
            "Stopped" => Ok(PlaybackStatus::Stopped),
            _ => Err(crate::error::Error::UnknownStatus(s.to_string())),
        }
    }
}

/// What the player is doing right now. Two states are "the same" exactly when they compare
/// equal, which is what suppresses duplicate notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "track")]
pub enum PlaybackState {
    Playing(Track),
    Paused(Track),
    Stopped,
}

impl PlaybackState {
    /// Playing or paused without a track to show degrades to `Stopped`.
    pub fn from_parts(status: PlaybackStatus, track: Option<Track>) -> Self {
        match (status, track) {
            (PlaybackStatus::Playing, Some(track)) => PlaybackState::Playing(track),
            (PlaybackStatus::Paused, Some(track)) => PlaybackState::Paused(track),
            _ => PlaybackState::Stopped,
        }
    }

    pub fn track(&self) -> Option<&Track> {
        match self {
            PlaybackState::Playing(track) | PlaybackState::Paused(track) => Some(track),
            PlaybackState::Stopped => None,
        }
    }
}

/// Id of the notification currently on screen. Zero means none has been shown yet, which is
/// also what the notification service reads as "don't replace anything".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationHandle(pub u32);

impl NotificationHandle {
    pub const NONE: NotificationHandle = NotificationHandle(0);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Next,
    PlayPause,
    Previous,
}

impl PlayerCommand {
    /// Media key names as sent by the settings daemon.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "Next" => Some(PlayerCommand::Next),
            "Play" => Some(PlayerCommand::PlayPause),
            "Previous" => Some(PlayerCommand::Previous),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerCommand::Next => write!(f, "Next"),
            PlayerCommand::PlayPause => write!(f, "PlayPause"),
            PlayerCommand::Previous => write!(f, "Previous"),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_track() -> Track {
    Track::new(
        TrackId::new("spotify:track:abc123"),
        "Björk".to_string(),
        "Homogenic".to_string(),
        "Jóga".to_string(),
        "1997-09-12",
    )
}
