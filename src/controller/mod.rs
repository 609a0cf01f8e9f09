//! Controller module - Session logic and event handling
//!
//! - `events`: Typed session events and the broadcast bus
//! - `device`: Remote device session manager
//! - `playback`: Playback backend controller (remote vs. local preview)
//! - `rating`: Rating submission coordinator
//! - `player_events`: Connect device event listener
//! - `input`: Key event handling

mod events;
mod device;
mod playback;
mod rating;
mod player_events;
mod input;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use crate::error::{SessionError, SessionResult};
use crate::model::{
    AlbumSession, AppModel, PlaybackState, PreviewPlayer, RatingService, RemotePlayback, Track, TrackStore,
};

pub use device::DeviceSessionManager;
pub use events::{EventBus, SessionEvent};
pub use playback::{PlaybackController, PlaybackTimings, ToggleOutcome};
pub use rating::RatingCoordinator;

/// One album's rating/playback session.
///
/// Owns every piece of mutable session state; clones are handles to the same
/// session.
#[derive(Clone)]
pub struct SessionController {
    store: Arc<Mutex<TrackStore>>,
    devices: DeviceSessionManager,
    playback: PlaybackController,
    ratings: RatingCoordinator,
    events: EventBus,
}

impl SessionController {
    pub fn new(
        store: TrackStore,
        service: Arc<dyn RatingService>,
        remote: Option<Arc<dyn RemotePlayback>>,
        preview: Arc<dyn PreviewPlayer>,
        timings: PlaybackTimings,
    ) -> Self {
        let events = EventBus::new();
        let store = Arc::new(Mutex::new(store));
        let devices = DeviceSessionManager::new(remote.clone(), events.clone());
        let playback = PlaybackController::new(devices.clone(), remote, preview, events.clone(), timings);
        let ratings = RatingCoordinator::new(store.clone(), service, events.clone());

        Self { store, devices, playback, ratings, events }
    }

    /// Fetch the album from the rating server and open a session for it.
    pub async fn load(
        album_id: &str,
        service: Arc<dyn RatingService>,
        remote: Option<Arc<dyn RemotePlayback>>,
        preview: Arc<dyn PreviewPlayer>,
        timings: PlaybackTimings,
    ) -> SessionResult<Self> {
        let album = service.fetch_album_tracks(album_id).await?;
        tracing::info!(album_id, tracks = album.tracks.len(), has_session = album.session.is_some(), "Album loaded");

        let store = TrackStore::new(album_id, album.tracks, album.session);
        Ok(Self::new(store, service, remote, preview, timings))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn devices(&self) -> &DeviceSessionManager {
        &self.devices
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub async fn toggle_track(&self, track_id: &str) -> SessionResult<ToggleOutcome> {
        let track = self
            .store
            .lock()
            .await
            .track_by_id(track_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTrack(track_id.to_string()))?;
        self.playback.toggle(&track).await
    }

    pub async fn stop(&self) {
        self.playback.stop().await;
    }

    pub async fn rate_track(&self, track_id: &str, value: u8) -> SessionResult<AlbumSession> {
        self.ratings.rate(track_id, value).await
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.playback.state().await
    }

    pub async fn track_at(&self, index: usize) -> Option<Track> {
        self.store.lock().await.track_at(index).cloned()
    }

    pub async fn tracks(&self) -> (Vec<Track>, AlbumSession) {
        let store = self.store.lock().await;
        (store.tracks().to_vec(), store.session().clone())
    }
}

/// Binds key input and the UI model to a session
#[derive(Clone)]
pub struct AppController {
    pub(crate) model: AppModel,
    pub(crate) session: SessionController,
}

impl AppController {
    pub fn new(model: AppModel, session: SessionController) -> Self {
        Self { model, session }
    }

    /// Mirror session events the user needs to see into the UI model.
    pub fn start_session_event_listener(&self) {
        let mut events = self.session.subscribe();
        let model = self.model.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::PlaybackFailed { message, .. }) => model.set_error(message).await,
                    Ok(SessionEvent::RatingFailed { message, .. }) => model.set_error(message).await,
                    Ok(SessionEvent::DeviceReady { .. }) => model.set_device_ready(true).await,
                    Ok(SessionEvent::DeviceLost) => model.set_device_ready(false).await,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}
