use regex::Regex;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};
use std::thread;
use tracing::{debug, warn};

use crate::cache::IconCache;
use crate::daemon::Event;
use crate::error::{Error, Result};
use crate::http::HttpGet;
use crate::models::Track;

/// Markup the track page uses for its cover image. Tried in order.
const COVER_PATTERNS: &[&str] = &[
    r#"<img.*?id="cover-art".*?src="(.*?)""#,
    r#"<meta\s+property="og:image"\s+content="(.*?)""#,
];

#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyCached,
    Stored(PathBuf),
}

pub struct ArtworkFetcher<H> {
    cache: IconCache,
    http: H,
    page_url: String,
    patterns: Vec<Regex>,
}

impl<H: HttpGet> ArtworkFetcher<H> {
    /// `page_url` is a template where `{id}` stands for the track id's trailing segment.
    pub fn new(cache: IconCache, http: H, page_url: impl Into<String>) -> Self {
        let patterns = COVER_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self {
            cache,
            http,
            page_url: page_url.into(),
            patterns,
        }
    }

    pub fn track_page_url(&self, track: &Track) -> String {
        self.page_url.replace("{id}", track.id.slug())
    }

    pub fn extract_image_url(&self, html: &str) -> Option<String> {
        self.patterns
            .iter()
            .find_map(|re| re.captures(html))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|url| !url.is_empty())
    }

    pub fn fetch(&self, track: &Track) -> Result<FetchOutcome> {
        // Another fetch for the same album may have landed since this one was queued.
        if self.cache.exists(&track.artist, &track.album) {
            return Ok(FetchOutcome::AlreadyCached);
        }

        let page_url = self.track_page_url(track);
        let page = self.http.get(&page_url)?;
        let html = String::from_utf8_lossy(&page);
        let image_url = self
            .extract_image_url(&html)
            .ok_or_else(|| Error::NoArtwork(page_url.clone()))?;

        debug!("Found cover art for {} at {image_url}", track.album_key());
        let image = self.http.get(&image_url)?;
        if image.is_empty() {
            return Err(Error::NoArtwork(image_url));
        }

        let path = self.cache.commit(&track.artist, &track.album, &image)?;
        Ok(FetchOutcome::Stored(path))
    }
}

/// Handle for queueing artwork downloads on the background worker.
#[derive(Clone)]
pub struct ArtworkQueue {
    jobs: SyncSender<Track>,
}

impl ArtworkQueue {
    pub fn new(jobs: SyncSender<Track>) -> Self {
        Self { jobs }
    }

    /// Never blocks. A full queue drops the request; the album will be tried again the next
    /// time one of its tracks is shown.
    pub fn request(&self, track: Track) {
        match self.jobs.try_send(track) {
            Ok(()) => {}
            Err(TrySendError::Full(track)) => {
                debug!("Artwork queue full, skipping {}", track.album_key());
            }
            Err(TrySendError::Disconnected(track)) => {
                warn!("Artwork worker is gone, skipping {}", track.album_key());
            }
        }
    }
}

/// Start the worker thread. Successful downloads are reported back as
/// [`Event::ArtworkReady`]; failures are logged and otherwise ignored.
pub fn spawn_worker<H>(
    fetcher: ArtworkFetcher<H>,
    capacity: usize,
    events: Sender<Event>,
) -> ArtworkQueue
where
    H: HttpGet + 'static,
{
    let (tx, rx) = mpsc::sync_channel(capacity);
    thread::spawn(move || run_worker(fetcher, rx, events));
    ArtworkQueue::new(tx)
}

fn run_worker<H: HttpGet>(
    fetcher: ArtworkFetcher<H>,
    jobs: Receiver<Track>,
    events: Sender<Event>,
) {
    while let Ok(track) = jobs.recv() {
        match fetcher.fetch(&track) {
            Ok(FetchOutcome::Stored(path)) => {
                debug!("Stored art for {} in {}", track.album_key(), path.display());
                if events.send(Event::ArtworkReady(track)).is_err() {
                    break;
                }
            }
            Ok(FetchOutcome::AlreadyCached) => {}
            Err(e) => debug!("No art for {}: {e}", track.album_key()),
        }
    }
}
