use tracing::debug;

use crate::error::Result;
use crate::models::PlaybackState;

/// Read side of the player: what is it doing right now.
pub trait PlayerSource {
    fn playback(&self) -> Result<PlaybackState>;
}

/// Remembers the last state that was shown so repeated signals for the same state are
/// swallowed. A state only counts as shown once [`PlaybackTracker::record`] is called.
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    last: Option<PlaybackState>,
}

impl PlaybackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&PlaybackState> {
        self.last.as_ref()
    }

    /// Returns `state` back when it differs from the last recorded one.
    pub fn observe(&self, state: PlaybackState) -> Option<PlaybackState> {
        if self.last.as_ref() == Some(&state) {
            debug!("Playback state unchanged");
            return None;
        }
        Some(state)
    }

    pub fn record(&mut self, state: PlaybackState) {
        self.last = Some(state);
    }

    /// Query the player and return its state if it is new. Nothing is recorded here; a
    /// player that can't be reached is an error.
    pub fn on_potential_change(
        &self,
        source: &impl PlayerSource,
    ) -> Result<Option<PlaybackState>> {
        let state = source.playback()?;
        Ok(self.observe(state))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;

    use super::PlayerSource;
    use crate::error::{Error, Result};
    use crate::models::PlaybackState;

    /// Reports whatever state the test last set; `None` means no player on the bus.
    #[derive(Default)]
    pub struct FakePlayer {
        pub state: RefCell<Option<PlaybackState>>,
    }

    impl FakePlayer {
        pub fn set(&self, state: Option<PlaybackState>) {
            *self.state.borrow_mut() = state;
        }
    }

    impl PlayerSource for FakePlayer {
        fn playback(&self) -> Result<PlaybackState> {
            self.state
                .borrow()
                .clone()
                .ok_or_else(|| {
                    Error::PlayerUnavailable("org.mpris.MediaPlayer2.spotify".to_string())
                })
        }
    }
}
