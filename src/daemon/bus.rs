use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, info};
use zbus::blocking::Connection;
use zbus::blocking::fdo::{DBusProxy, PropertiesProxy};
use zbus::names::{BusName, UniqueName};
use zbus::proxy::CacheProperties;
use zbus::zvariant::{OwnedValue, Value};

use super::Event;
use super::proxy::{NotificationsProxyBlocking, PLAYER_INTERFACE, PlayerProxyBlocking};
use crate::config::{APP_NAME, PlayerConfig};
use crate::error::{Error, Result};
use crate::keys::PlayerControl;
use crate::models::{
    NotificationHandle, PlaybackState, PlaybackStatus, PlayerCommand, Track, TrackId,
};
use crate::notify::NotificationSink;
use crate::tracker::PlayerSource;

/// The session bus connection plus the signal subscriptions hanging off it.
pub struct BusSession {
    conn: Connection,
    player: PlayerConfig,
    // Bumped on every player subscription so listeners for a previous player instance stop.
    generation: Arc<AtomicU64>,
}

impl BusSession {
    pub fn connect(player: &PlayerConfig) -> Result<Self> {
        let conn = Connection::session()?;
        Ok(Self {
            conn,
            player: player.clone(),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn player(&self) -> MprisPlayer {
        MprisPlayer {
            conn: self.conn.clone(),
            bus_name: self.player.bus_name.clone(),
            object_path: self.player.object_path.clone(),
        }
    }

    pub fn notifications(&self) -> DesktopNotifications {
        DesktopNotifications {
            conn: self.conn.clone(),
        }
    }

    /// Forward the player's `PropertiesChanged` signals as [`Event::PropertiesChanged`].
    /// Calling this again retires the previous subscription.
    pub fn watch_player(&self, events: Sender<Event>) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);

        let props = PropertiesProxy::builder(&self.conn)
            .destination(self.player.bus_name.clone())?
            .path(self.player.object_path.clone())?
            .cache_properties(CacheProperties::No)
            .build()?;
        let changes = props.receive_properties_changed()?;

        let relevant = changes.map(|signal| {
            let relevant = match signal.args() {
                Ok(args) => args.interface_name().as_str() == PLAYER_INTERFACE,
                Err(e) => {
                    debug!("Malformed PropertiesChanged signal: {e}");
                    true
                }
            };
            relevant
        });
        thread::spawn(move || forward_player_changes(relevant, &current, generation, &events));

        debug!("Subscribed to {} (subscription {generation})", self.player.bus_name);
        Ok(())
    }

    /// Report every time the player's well-known name gets a new owner, i.e. the player was
    /// (re)started.
    pub fn watch_player_owner(&self, events: Sender<Event>) -> Result<()> {
        let dbus = DBusProxy::new(&self.conn)?;
        let owners = dbus
            .receive_name_owner_changed_with_args(&[(0, self.player.bus_name.as_str())])?;

        thread::spawn(move || {
            for signal in owners {
                let Ok(args) = signal.args() else {
                    continue;
                };
                let new_owner: &Option<UniqueName<'_>> = args.new_owner();
                if let Some(owner) = new_owner {
                    if events.send(Event::PlayerAppeared(owner.to_string())).is_err() {
                        break;
                    }
                }
            }
        });

        info!("Watching for {} instances", self.player.bus_name);
        Ok(())
    }
}

/// Turn player property changes into events until a newer subscription replaces this one.
/// Each item says whether the change concerns the player interface.
fn forward_player_changes(
    changes: impl Iterator<Item = bool>,
    current: &AtomicU64,
    generation: u64,
    events: &Sender<Event>,
) {
    for relevant in changes {
        if current.load(Ordering::SeqCst) != generation {
            debug!("Player subscription {generation} superseded");
            break;
        }
        if !relevant {
            continue;
        }
        if events.send(Event::PropertiesChanged).is_err() {
            break;
        }
    }
}

#[derive(Clone)]
pub struct MprisPlayer {
    conn: Connection,
    bus_name: String,
    object_path: String,
}

impl MprisPlayer {
    fn proxy(&self) -> Result<PlayerProxyBlocking<'_>> {
        let name = BusName::try_from(self.bus_name.as_str()).map_err(zbus::Error::from)?;
        if !DBusProxy::new(&self.conn)?.name_has_owner(name)? {
            return Err(Error::PlayerUnavailable(self.bus_name.clone()));
        }

        let proxy = PlayerProxyBlocking::builder(&self.conn)
            .destination(self.bus_name.as_str())?
            .path(self.object_path.as_str())?
            .cache_properties(CacheProperties::No)
            .build()?;
        Ok(proxy)
    }
}

impl PlayerSource for MprisPlayer {
    fn playback(&self) -> Result<PlaybackState> {
        let proxy = self.proxy()?;
        let status: PlaybackStatus = proxy.playback_status()?.parse()?;
        let track = track_from_metadata(&proxy.metadata()?);
        Ok(PlaybackState::from_parts(status, track))
    }
}

impl PlayerControl for MprisPlayer {
    fn send(&self, command: PlayerCommand) -> Result<()> {
        let proxy = self.proxy()?;
        match command {
            PlayerCommand::Next => proxy.next()?,
            PlayerCommand::PlayPause => proxy.play_pause()?,
            PlayerCommand::Previous => proxy.previous()?,
        }
        Ok(())
    }
}

pub struct DesktopNotifications {
    conn: Connection,
}

impl NotificationSink for DesktopNotifications {
    fn show(
        &self,
        replaces: NotificationHandle,
        icon: &Path,
        summary: &str,
        body: &str,
    ) -> Result<NotificationHandle> {
        let proxy = NotificationsProxyBlocking::new(&self.conn)?;
        let id = proxy.notify(
            APP_NAME,
            replaces.0,
            &icon.to_string_lossy(),
            summary,
            body,
            &[],
            &HashMap::new(),
            -1,
        )?;
        Ok(NotificationHandle(id))
    }

    fn close(&self, handle: NotificationHandle) -> Result<()> {
        NotificationsProxyBlocking::new(&self.conn)?.close_notification(handle.0)?;
        Ok(())
    }
}

/// Build a track from an MPRIS metadata map. Needs at least a track id, an artist and a
/// title; everything else falls back to empty.
pub fn track_from_metadata(metadata: &HashMap<String, OwnedValue>) -> Option<Track> {
    let field = |key: &str| metadata.get(key).and_then(|value| text(value));

    Some(Track::new(
        TrackId::new(field("mpris:trackid")?),
        field("xesam:artist")?,
        field("xesam:album").unwrap_or_default(),
        field("xesam:title")?,
        &field("xesam:contentCreated").unwrap_or_default(),
    ))
}

// Artists come as a string list; older clients sent a plain string.
fn text(value: &Value<'_>) -> Option<String> {
    let s = match value {
        Value::Str(s) => s.as_str().to_string(),
        Value::ObjectPath(path) => path.as_str().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Value(inner) => return text(inner),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use zbus::zvariant::ObjectPath;

    #[test]
    fn test_forwards_only_player_interface_changes() {
        let (tx, rx) = mpsc::channel();
        let current = AtomicU64::new(1);

        forward_player_changes([true, false, true].into_iter(), &current, 1, &tx);

        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_superseded_subscription_stops_forwarding() {
        let (tx, rx) = mpsc::channel();
        let current = AtomicU64::new(2);

        forward_player_changes([true, true].into_iter(), &current, 1, &tx);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_resubscribe_retires_running_listener() {
        let (tx, rx) = mpsc::channel();
        let current = AtomicU64::new(1);
        let changes = (0..3).map(|i| {
            if i == 1 {
                current.fetch_add(1, Ordering::SeqCst);
            }
            true
        });

        forward_player_changes(changes, &current, 1, &tx);

        assert_eq!(rx.try_iter().count(), 1);
    }

    fn owned(value: Value<'static>) -> OwnedValue {
        OwnedValue::try_from(value).unwrap()
    }

    fn metadata() -> HashMap<String, OwnedValue> {
        HashMap::from([
            (
                "mpris:trackid".to_string(),
                owned(Value::from(
                    ObjectPath::try_from("/com/spotify/track/abc123").unwrap(),
                )),
            ),
            ("xesam:artist".to_string(), owned(Value::from(vec!["Björk"]))),
            ("xesam:album".to_string(), owned(Value::from("Homogenic"))),
            ("xesam:title".to_string(), owned(Value::from("Jóga"))),
            (
                "xesam:contentCreated".to_string(),
                owned(Value::from("1997-09-12T00:00:00")),
            ),
        ])
    }

    #[test]
    fn test_track_from_metadata() {
        let track = track_from_metadata(&metadata()).unwrap();

        assert_eq!(track.id.slug(), "abc123");
        assert_eq!(track.artist, "Björk");
        assert_eq!(track.album, "Homogenic");
        assert_eq!(track.title, "Jóga");
        assert_eq!(track.year, "1997");
    }

    #[test]
    fn test_plain_string_artist() {
        let mut metadata = metadata();
        metadata.insert("xesam:artist".to_string(), owned(Value::from("Björk")));

        assert_eq!(track_from_metadata(&metadata).unwrap().artist, "Björk");
    }

    #[test]
    fn test_missing_title_gives_no_track() {
        let mut metadata = metadata();
        metadata.remove("xesam:title");

        assert!(track_from_metadata(&metadata).is_none());
        assert!(track_from_metadata(&HashMap::new()).is_none());
    }
}
