//! Error taxonomy for the rating/playback session
//!
//! Every failure is scoped to the operation that produced it; nothing here is
//! fatal to the process. The `Display` output doubles as the message shown in
//! the error overlay.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The rating server rejected our session; the caller should send the user to log in
    #[error("Authentication required. Log in through the rating server and restart.")]
    AuthRequired,

    /// The remote device is gone or Spotify reports no active device
    #[error("No active playback device: {0}")]
    DeviceUnavailable(String),

    /// Any other remote playback command failure
    #[error("Remote playback failed: {0}")]
    RemoteCommand(String),

    /// Track or rating request could not reach the server or returned garbage
    #[error("Network error: {0}")]
    NetworkFailure(String),

    /// No remote session and no preview clip for the track
    #[error("Nothing to play for {uri}: no playback device and no preview available")]
    PlaybackUnsupported { uri: String },

    /// The local preview player could not be started
    #[error("Preview playback failed: {0}")]
    PreviewFailed(String),

    /// The server refused or failed to store a rating
    #[error("Failed to save rating: {0}")]
    RatingSubmissionFailed(String),

    #[error("Rating must be between 1 and 10, got {0}")]
    InvalidRating(u8),

    #[error("Unknown track: {0}")]
    UnknownTrack(String),
}

impl SessionError {
    /// Only a missing device gets the bounded transfer-and-retry treatment.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::DeviceUnavailable(_))
    }
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
