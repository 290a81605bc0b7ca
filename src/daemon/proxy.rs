//! Client proxies for the D-Bus services the daemon talks to.
//!
//! Only the members actually used are declared. For the full interfaces see the
//! [MPRIS](https://specifications.freedesktop.org/mpris-spec/latest/) and
//! [desktop notifications](https://specifications.freedesktop.org/notification-spec/latest/)
//! specifications.

use std::collections::HashMap;

use zbus::proxy;
use zbus::zvariant::{OwnedValue, Value};

pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_service = "org.mpris.MediaPlayer2.spotify",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait Player {
    fn next(&self) -> zbus::Result<()>;

    fn previous(&self) -> zbus::Result<()>;

    fn play_pause(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
pub trait Notifications {
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: &HashMap<&str, &Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;
}

#[proxy(
    interface = "org.gnome.SettingsDaemon.MediaKeys",
    default_service = "org.gnome.SettingsDaemon.MediaKeys",
    default_path = "/org/gnome/SettingsDaemon/MediaKeys"
)]
pub trait MediaKeys {
    fn grab_media_player_keys(&self, application: &str, time: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn media_player_key_pressed(&self, application: &str, key: &str) -> zbus::Result<()>;
}
