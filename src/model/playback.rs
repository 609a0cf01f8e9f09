//! Playback-related types

/// Which backend currently owns the playing slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ActiveBackend {
    #[default]
    None,
    Remote,
    LocalPreview,
}

/// Phases of the playback controller
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum PlayerPhase {
    #[default]
    Idle,
    Selecting { uri: String },
    RemotePlaying { uri: String },
    LocalPreviewPlaying { uri: String },
    Error { uri: String, reason: String },
}

/// Snapshot of what is playing, handed to subscribers and the view
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PlaybackState {
    pub phase: PlayerPhase,
    /// Set when the remote reports the current track as paused out-of-band
    pub paused: bool,
}

impl PlaybackState {
    pub fn active_backend(&self) -> ActiveBackend {
        match self.phase {
            PlayerPhase::RemotePlaying { .. } => ActiveBackend::Remote,
            PlayerPhase::LocalPreviewPlaying { .. } => ActiveBackend::LocalPreview,
            _ => ActiveBackend::None,
        }
    }

    /// URI of the track holding the playing slot, paused or not
    pub fn current_uri(&self) -> Option<&str> {
        match &self.phase {
            PlayerPhase::RemotePlaying { uri } | PlayerPhase::LocalPreviewPlaying { uri } => Some(uri),
            _ => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.current_uri().is_some() && !self.paused
    }

    pub fn is_playing_uri(&self, uri: &str) -> bool {
        self.is_playing() && self.current_uri() == Some(uri)
    }
}

/// What the remote backend reports about itself
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct RemoteTrackState {
    pub track_uri: Option<String>,
    pub paused: bool,
}

impl RemoteTrackState {
    pub fn playing(uri: impl Into<String>) -> Self {
        Self { track_uri: Some(uri.into()), paused: false }
    }

    pub fn is_playing_uri(&self, uri: &str) -> bool {
        !self.paused && self.track_uri.as_deref() == Some(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_playing_phases_hold_the_slot() {
        let mut state = PlaybackState::default();
        assert_eq!(state.active_backend(), ActiveBackend::None);
        assert!(!state.is_playing());

        state.phase = PlayerPhase::Selecting { uri: "a".into() };
        assert!(state.current_uri().is_none());

        state.phase = PlayerPhase::LocalPreviewPlaying { uri: "a".into() };
        assert_eq!(state.active_backend(), ActiveBackend::LocalPreview);
        assert!(state.is_playing_uri("a"));
        assert!(!state.is_playing_uri("b"));

        state.paused = true;
        assert!(!state.is_playing());
        assert_eq!(state.current_uri(), Some("a"));
    }
}
