//! Typed session events
//!
//! Components never call into the UI; they publish a [`SessionEvent`] and
//! whoever subscribed re-renders or reports.

use tokio::sync::broadcast;

use crate::model::{AlbumSession, PlaybackState, Rating};

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The playback state machine moved
    PlaybackChanged(PlaybackState),

    /// Playback of a track failed for good (no further fallback)
    PlaybackFailed { uri: String, message: String },

    DeviceReady { device_id: String },

    DeviceLost,

    /// A rating was applied; `provisional` is true for the optimistic local aggregate
    RatingApplied {
        track_id: String,
        rating: Rating,
        session: AlbumSession,
        provisional: bool,
    },

    /// The server did not store a rating; the local value is kept
    RatingFailed { track_id: String, message: String },
}

/// Cheap-to-clone publisher handle
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        if self.sender.send(event).is_err() {
            tracing::trace!("Session event dropped, no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
