//! Collaborator contracts consumed by the session controller

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::playback::RemoteTrackState;
use super::types::{AlbumSession, Rating, Track};
use crate::error::SessionResult;

/// Tracks plus the server's aggregate for one album
#[derive(Clone, Debug)]
pub struct AlbumTracks {
    pub tracks: Vec<Track>,
    pub session: Option<AlbumSession>,
}

/// Server reply to a rating submission
#[derive(Clone, Debug, Default)]
pub struct RatingReceipt {
    pub success: bool,
    pub session: Option<AlbumSession>,
    pub error: Option<String>,
}

/// The rating server
#[async_trait]
pub trait RatingService: Send + Sync {
    async fn fetch_album_tracks(&self, album_id: &str) -> SessionResult<AlbumTracks>;

    async fn submit_rating(&self, track_id: &str, album_id: &str, rating: Rating) -> SessionResult<RatingReceipt>;

    /// `None` means the remote backend is unavailable for this user.
    async fn playback_token(&self) -> SessionResult<Option<String>>;
}

/// Commands accepted by the remote streaming backend
#[async_trait]
pub trait RemotePlayback: Send + Sync {
    async fn current_state(&self) -> SessionResult<RemoteTrackState>;

    async fn play(&self, track_uri: &str, device_id: &str) -> SessionResult<()>;

    async fn pause(&self) -> SessionResult<()>;

    async fn resume(&self) -> SessionResult<()>;

    /// Bind playback to `device_id` without starting it. Safe to repeat.
    async fn transfer(&self, device_id: &str) -> SessionResult<()>;
}

/// Short local audio clips
#[async_trait]
pub trait PreviewPlayer: Send + Sync {
    /// Start playing `url`, replacing any running preview.
    ///
    /// The receiver resolves when the player exits by itself: `Ok` for a
    /// clip that played to the end, `Err` for a player that gave up on it.
    /// It is dropped without a value when the preview is stopped.
    async fn play_url(&self, url: &str) -> SessionResult<oneshot::Receiver<SessionResult<()>>>;

    async fn stop(&self);
}
