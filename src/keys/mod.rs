use tracing::{debug, info};

use crate::error::Result;
use crate::models::PlayerCommand;

/// Write side of the player.
pub trait PlayerControl {
    fn send(&self, command: PlayerCommand) -> Result<()>;
}

/// Turn a media key name into a player command and send it. Unknown keys are ignored and a
/// missing player just drops the command. Returns the command that was delivered.
pub fn on_key_pressed(control: &impl PlayerControl, key: &str) -> Option<PlayerCommand> {
    let Some(command) = PlayerCommand::from_key(key) else {
        debug!("Ignoring media key '{key}'");
        return None;
    };

    match control.send(command) {
        Ok(()) => {
            debug!("Sent {command} for media key '{key}'");
            Some(command)
        }
        Err(e) => {
            info!("Not carrying out command '{command}': {e}");
            None
        }
    }
}
