use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, info, warn};
use zbus::blocking::Connection;

use super::Event;
use super::proxy::MediaKeysProxyBlocking;
use crate::config::{APP_NAME, KeysConfig};
use crate::error::Result;

/// Listen for hardware media keys from the GNOME settings daemon and forward each press as
/// [`Event::KeyPressed`].
pub fn listen(conn: &Connection, config: &KeysConfig, events: Sender<Event>) -> Result<()> {
    let proxy = MediaKeysProxyBlocking::builder(conn)
        .destination(config.bus_name.clone())?
        .path(config.object_path.clone())?
        .build()?;

    // Without a grab the settings daemon may route keys to another registered player.
    if let Err(e) = proxy.grab_media_player_keys(APP_NAME, 0) {
        warn!("Could not grab media player keys: {e}");
    }

    let presses = proxy.receive_media_player_key_pressed()?;
    thread::spawn(move || {
        for signal in presses {
            match signal.args() {
                Ok(args) => {
                    let key = args.key().to_string();
                    if events.send(Event::KeyPressed(key)).is_err() {
                        break;
                    }
                }
                Err(e) => debug!("Malformed MediaPlayerKeyPressed signal: {e}"),
            }
        }
    });

    info!("Listening for media keys on {}", config.bus_name);
    Ok(())
}
