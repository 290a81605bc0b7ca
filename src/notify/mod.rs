use std::path::Path;
use tracing::{debug, info};

use crate::cache::IconCache;
use crate::error::Result;
use crate::models::{NotificationHandle, PlaybackState, Track};

pub const STOPPED_BODY: &str = "[stopped]";

/// The desktop notification service.
pub trait NotificationSink {
    /// Show a notification, replacing `replaces` when it is not [`NotificationHandle::NONE`].
    fn show(
        &self,
        replaces: NotificationHandle,
        icon: &Path,
        summary: &str,
        body: &str,
    ) -> Result<NotificationHandle>;

    fn close(&self, handle: NotificationHandle) -> Result<()>;
}

/// Owns the one notification this process keeps on screen.
pub struct Presenter<N> {
    sink: N,
    cache: IconCache,
    current: NotificationHandle,
}

impl<N: NotificationSink> Presenter<N> {
    pub fn new(sink: N, cache: IconCache) -> Self {
        Self {
            sink,
            cache,
            current: NotificationHandle::NONE,
        }
    }

    #[cfg(test)]
    pub(crate) fn sink_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &N {
        &self.sink
    }

    /// Show `state`, replacing the previous notification. Returns the track when its album
    /// has no cached art yet, so the caller can have it fetched.
    pub fn present(&mut self, state: &PlaybackState) -> Result<Option<Track>> {
        let (summary, body, icon, missing_art) = match state.track() {
            None => {
                info!("Playback stopped");
                (String::new(), STOPPED_BODY.to_string(), self.cache.default_icon(), None)
            }
            Some(track) => {
                info!("Current track: {} by {}", track.title, track.artist);
                let (icon, missing) = match self.cache.icon_for(track) {
                    Some(icon) => (icon, None),
                    None => (self.cache.default_icon(), Some(track.clone())),
                };
                (track.artist.clone(), track_body(track), icon, missing)
            }
        };

        self.replace(&icon, &summary, &body)?;
        Ok(missing_art)
    }

    fn replace(&mut self, icon: &Path, summary: &str, body: &str) -> Result<()> {
        let previous = self.current;
        if !previous.is_none() {
            debug!("Closing notification {previous}");
            if let Err(e) = self.sink.close(previous) {
                debug!("Could not close notification {previous}: {e}");
            }
        }

        let handle = self.sink.show(previous, icon, summary, body)?;
        debug!("Raised notification {handle}");
        self.current = handle;
        Ok(())
    }
}

pub fn track_body(track: &Track) -> String {
    format!("{}\n{} ({})", track.title, track.album, track.year)
}
