use anyhow::{Context, Result};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::artwork::{self, ArtworkFetcher, ArtworkQueue};
use crate::cache::IconCache;
use crate::config::Config;
use crate::http::HttpClient;
use crate::keys::{self, PlayerControl};
use crate::models::{PlaybackState, Track};
use crate::notify::{NotificationSink, Presenter};
use crate::tracker::{PlaybackTracker, PlayerSource};

pub mod bus;
mod mediakeys;
mod proxy;

use bus::BusSession;

/// Everything that can happen to the daemon. Listener threads and the artwork worker only
/// ever post these; all handling happens on the thread draining the channel.
#[derive(Debug)]
pub enum Event {
    PropertiesChanged,
    KeyPressed(String),
    /// The player's bus name got a new owner (unique name attached).
    PlayerAppeared(String),
    ArtworkReady(Track),
}

/// Owns all mutable daemon state: the last seen playback state and the live notification.
pub struct Dispatcher<P, N, C> {
    player: P,
    control: C,
    tracker: PlaybackTracker,
    presenter: Presenter<N>,
    artwork: ArtworkQueue,
}

impl<P, N, C> Dispatcher<P, N, C>
where
    P: PlayerSource,
    N: NotificationSink,
    C: PlayerControl,
{
    pub fn new(player: P, control: C, presenter: Presenter<N>, artwork: ArtworkQueue) -> Self {
        Self {
            player,
            control,
            tracker: PlaybackTracker::new(),
            presenter,
            artwork,
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::PropertiesChanged | Event::PlayerAppeared(_) => self.refresh(),
            Event::KeyPressed(key) => {
                keys::on_key_pressed(&self.control, &key);
            }
            Event::ArtworkReady(track) => {
                debug!("Art for {} arrived", track.album_key());
                // Re-show whatever is current, which may no longer be `track`.
                if let Some(state) = self.tracker.last().cloned() {
                    self.present(&state);
                }
            }
        }
    }

    fn refresh(&mut self) {
        let state = match self.tracker.on_potential_change(&self.player) {
            Ok(Some(state)) => state,
            Ok(None) => return,
            Err(e) => {
                debug!("Not updating track display: {e}");
                return;
            }
        };
        // Only a state that made it on screen counts as seen.
        if self.present(&state) {
            self.tracker.record(state);
        }
    }

    fn present(&mut self, state: &PlaybackState) -> bool {
        match self.presenter.present(state) {
            Ok(missing_art) => {
                if let Some(track) = missing_art {
                    self.artwork.request(track);
                }
                true
            }
            Err(e) => {
                warn!("Could not show notification: {e}");
                false
            }
        }
    }
}

pub struct Daemon {
    config: Config,
}

impl Daemon {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn run(&self) -> Result<()> {
        let config = &self.config;
        config.ensure_dirs()?;

        let cache = IconCache::new(&config.cache_dir);
        let http = HttpClient::new(Duration::from_secs(config.artwork.timeout_secs))
            .with_context(|| "Failed to create HTTP client")?;
        cache
            .prime_default(&http, &config.artwork.default_icon_url)
            .with_context(|| {
                format!(
                    "Failed to fetch default icon from {}",
                    config.artwork.default_icon_url
                )
            })?;

        let bus = BusSession::connect(&config.player)
            .with_context(|| "Failed to connect to the session bus")?;

        let (events_tx, events_rx): (Sender<Event>, Receiver<Event>) = mpsc::channel();

        let fetcher = ArtworkFetcher::new(
            cache.clone(),
            http,
            config.artwork.track_page_url.as_str(),
        );
        let artwork =
            artwork::spawn_worker(fetcher, config.artwork.queue_capacity, events_tx.clone());

        // Subscription failures leave the daemon running with whatever did work.
        if let Err(e) = bus.watch_player_owner(events_tx.clone()) {
            error!("Failed to watch for player restarts: {e}");
        }
        if let Err(e) = bus.watch_player(events_tx.clone()) {
            error!("Failed to subscribe to player changes: {e}");
        }
        if config.keys.enabled {
            if let Err(e) = mediakeys::listen(bus.connection(), &config.keys, events_tx.clone()) {
                error!("Failed to listen for media keys: {e}");
            }
        }

        let presenter = Presenter::new(bus.notifications(), cache);
        let mut dispatcher = Dispatcher::new(bus.player(), bus.player(), presenter, artwork);

        info!("Daemon started, cache at {}", config.cache_dir.display());

        // Show whatever is playing right now.
        dispatcher.handle(Event::PropertiesChanged);

        while let Ok(event) = events_rx.recv() {
            if let Event::PlayerAppeared(owner) = &event {
                info!("Connecting to new player instance {owner}");
                if let Err(e) = bus.watch_player(events_tx.clone()) {
                    error!("Failed to subscribe to player changes: {e}");
                }
            }
            dispatcher.handle(event);
        }

        info!("Daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeHttp;
    use crate::keys::fake::FakeControl;
    use crate::models::{NotificationHandle, PlayerCommand, TrackId, sample_track};
    use crate::notify::fake::FakeSink;
    use crate::tracker::fake::FakePlayer;
    use std::sync::mpsc::SyncSender;

    struct Harness {
        dispatcher: Dispatcher<FakePlayer, FakeSink, FakeControl>,
        jobs: Receiver<Track>,
        cache: IconCache,
        _tmp: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let tmp = tempfile::tempdir().unwrap();
        let cache = IconCache::new(tmp.path());
        let (jobs_tx, jobs): (SyncSender<Track>, Receiver<Track>) = mpsc::sync_channel(16);
        let dispatcher = Dispatcher::new(
            FakePlayer::default(),
            FakeControl::default(),
            Presenter::new(FakeSink::default(), cache.clone()),
            ArtworkQueue::new(jobs_tx),
        );
        Harness {
            dispatcher,
            jobs,
            cache,
            _tmp: tmp,
        }
    }

    impl Harness {
        fn play(&self, state: PlaybackState) {
            self.dispatcher.player.set(Some(state));
        }

        fn sink(&self) -> &FakeSink {
            self.dispatcher.presenter.sink()
        }

        fn sink_mut(&mut self) -> &mut FakeSink {
            self.dispatcher.presenter.sink_mut()
        }
    }

    #[test]
    fn test_duplicate_signals_notify_once() {
        let mut h = harness();
        h.play(PlaybackState::Playing(sample_track()));

        h.dispatcher.handle(Event::PropertiesChanged);
        h.dispatcher.handle(Event::PropertiesChanged);
        h.dispatcher.handle(Event::PropertiesChanged);

        assert_eq!(h.sink().shown.borrow().len(), 1);
        assert_eq!(h.jobs.try_iter().count(), 1);
    }

    #[test]
    fn test_state_is_shown_once_notifications_come_back() {
        let mut h = harness();
        h.play(PlaybackState::Playing(sample_track()));

        h.sink_mut().unavailable = true;
        h.dispatcher.handle(Event::PropertiesChanged);
        assert!(h.sink().shown.borrow().is_empty());
        assert_eq!(h.dispatcher.tracker.last(), None);

        h.sink_mut().unavailable = false;
        h.dispatcher.handle(Event::PropertiesChanged);
        h.dispatcher.handle(Event::PropertiesChanged);

        let shown = h.sink().shown.borrow();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].body, "Jóga\nHomogenic (1997)");
        assert_eq!(
            h.dispatcher.tracker.last(),
            Some(&PlaybackState::Playing(sample_track()))
        );
    }

    #[test]
    fn test_unreachable_player_is_a_no_op() {
        let mut h = harness();

        h.dispatcher.handle(Event::PropertiesChanged);

        assert!(h.sink().shown.borrow().is_empty());
        assert!(h.jobs.try_recv().is_err());
    }

    #[test]
    fn test_one_live_notification_after_many_changes() {
        let mut h = harness();
        let mut other = sample_track();
        other.id = TrackId::new("spotify:track:def456");
        other.title = "Bachelorette".to_string();

        for state in [
            PlaybackState::Playing(sample_track()),
            PlaybackState::Paused(sample_track()),
            PlaybackState::Playing(other),
            PlaybackState::Stopped,
        ] {
            h.play(state);
            h.dispatcher.handle(Event::PropertiesChanged);
        }

        let shown = h.sink().shown.borrow();
        assert_eq!(shown.len(), 4);
        for (i, notification) in shown.iter().enumerate() {
            assert_eq!(notification.replaces, NotificationHandle(i as u32));
        }
        assert_eq!(h.sink().live(), vec![NotificationHandle(4)]);
        assert_eq!(shown[3].body, "[stopped]");
        assert_eq!(shown[3].icon, h.cache.default_icon());
    }

    #[test]
    fn test_key_presses_reach_the_player() {
        let mut h = harness();

        h.dispatcher.handle(Event::KeyPressed("Next".to_string()));
        h.dispatcher.handle(Event::KeyPressed("Rewind".to_string()));

        assert_eq!(*h.dispatcher.control.sent.borrow(), vec![PlayerCommand::Next]);
        assert!(h.sink().shown.borrow().is_empty());
    }

    #[test]
    fn test_player_restart_refreshes() {
        let mut h = harness();
        h.play(PlaybackState::Stopped);

        h.dispatcher.handle(Event::PlayerAppeared(":1.42".to_string()));

        assert_eq!(h.sink().shown.borrow().len(), 1);
    }

    #[test]
    fn test_new_track_then_art_arrives() {
        let mut h = harness();
        let track = Track::new(
            TrackId::new("spotify:track:abc123"),
            "Björk".to_string(),
            "Homogenic".to_string(),
            "Jóga".to_string(),
            "1997-09-12",
        );
        h.play(PlaybackState::Playing(track.clone()));

        h.dispatcher.handle(Event::PropertiesChanged);

        {
            let shown = h.sink().shown.borrow();
            assert_eq!(shown.len(), 1);
            assert_eq!(shown[0].summary, "Björk");
            assert_eq!(shown[0].body, "Jóga\nHomogenic (1997)");
            assert_eq!(shown[0].icon, h.cache.default_icon());
        }

        // Play the worker's part.
        let job = h.jobs.try_recv().unwrap();
        assert_eq!(job.album_key(), "Björk-Homogenic");
        let http = FakeHttp::default()
            .with(
                "https://open.spotify.com/track/abc123",
                r#"<img id="cover-art" src="https://i.scdn.co/image/jo.jpg">"#,
            )
            .with("https://i.scdn.co/image/jo.jpg", b"jpeg".to_vec());
        let fetcher = ArtworkFetcher::new(
            h.cache.clone(),
            http,
            "https://open.spotify.com/track/{id}",
        );
        fetcher.fetch(&job).unwrap();
        h.dispatcher.handle(Event::ArtworkReady(job));

        let shown = h.sink().shown.borrow();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].summary, "Björk");
        assert_eq!(shown[1].body, "Jóga\nHomogenic (1997)");
        assert_eq!(shown[1].icon, h.cache.path_for("Björk", "Homogenic"));
        assert_eq!(shown[1].replaces, NotificationHandle(1));
        assert_eq!(h.sink().live(), vec![NotificationHandle(2)]);
        // Art is cached now, nothing more to fetch.
        assert!(h.jobs.try_recv().is_err());
    }

    #[test]
    fn test_late_art_re_shows_current_track() {
        let mut h = harness();
        let first = sample_track();
        let mut second = sample_track();
        second.id = TrackId::new("spotify:track:zzz");
        second.album = "Post".to_string();
        second.title = "Army of Me".to_string();

        h.play(PlaybackState::Playing(first.clone()));
        h.dispatcher.handle(Event::PropertiesChanged);
        h.play(PlaybackState::Playing(second));
        h.dispatcher.handle(Event::PropertiesChanged);

        h.cache.commit(&first.artist, &first.album, b"jpeg").unwrap();
        h.dispatcher.handle(Event::ArtworkReady(first));

        let shown = h.sink().shown.borrow();
        assert_eq!(shown.len(), 3);
        assert_eq!(shown[2].body, "Army of Me\nPost (1997)");
        assert_eq!(shown[2].icon, h.cache.default_icon());
    }
}
