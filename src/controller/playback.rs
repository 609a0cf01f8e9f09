//! Playback backend controller
//!
//! Owns the single "currently playing" slot and decides, per toggle, whether a
//! track goes to the remote device or to a local preview clip.
//!
//! Every toggle takes a new generation number. Remote round trips can take a
//! while, so each continuation re-checks its generation before touching the
//! slot; a continuation that lost to a newer toggle becomes a no-op.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::device::DeviceSessionManager;
use super::events::{EventBus, SessionEvent};
use crate::error::{SessionError, SessionResult};
use crate::model::{
    ActiveBackend, PlaybackState, PlayerPhase, PreviewPlayer, RemotePlayback, RemoteTrackState, Track,
};

/// Fixed delays around remote commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackTimings {
    /// Wait between a successful play command and the resume
    pub resume_delay: Duration,
    /// Wait between the transfer handshake and the single play retry
    pub retry_delay: Duration,
}

impl Default for PlaybackTimings {
    fn default() -> Self {
        Self {
            resume_delay: Duration::from_millis(500),
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl PlaybackTimings {
    pub fn immediate() -> Self {
        Self {
            resume_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
        }
    }
}

/// How a toggle ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Started(ActiveBackend),
    Resumed,
    Stopped,
    /// A newer toggle took over while this one was waiting
    Superseded,
}

enum RemoteAttempt {
    Playing,
    Resumed,
    Stopped,
    Superseded,
}

struct Slot {
    state: PlaybackState,
    generation: u64,
    /// A superseded remote start landed while a newer toggle was still
    /// deciding, so the device may be playing a track nobody owns.
    remote_leftover: bool,
}

impl Slot {
    /// Record that `phase` now owns the slot. Returns true when a leftover
    /// remote start has to be paused because the remote is not the new owner.
    fn take_remote_leftover(&mut self, phase: &PlayerPhase) -> bool {
        match phase {
            PlayerPhase::Selecting { .. } => false,
            PlayerPhase::RemotePlaying { .. } => {
                self.remote_leftover = false;
                false
            }
            _ => std::mem::take(&mut self.remote_leftover),
        }
    }
}

#[derive(Clone)]
pub struct PlaybackController {
    slot: Arc<Mutex<Slot>>,
    devices: DeviceSessionManager,
    remote: Option<Arc<dyn RemotePlayback>>,
    preview: Arc<dyn PreviewPlayer>,
    events: EventBus,
    timings: PlaybackTimings,
}

impl PlaybackController {
    pub fn new(
        devices: DeviceSessionManager,
        remote: Option<Arc<dyn RemotePlayback>>,
        preview: Arc<dyn PreviewPlayer>,
        events: EventBus,
        timings: PlaybackTimings,
    ) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                state: PlaybackState::default(),
                generation: 0,
                remote_leftover: false,
            })),
            devices,
            remote,
            preview,
            events,
            timings,
        }
    }

    pub async fn state(&self) -> PlaybackState {
        self.slot.lock().await.state.clone()
    }

    /// Play `track`, or stop it if it is the one playing.
    pub async fn toggle(&self, track: &Track) -> SessionResult<ToggleOutcome> {
        let uri = track.uri.as_str();
        let (generation, previous) = self.begin().await;
        tracing::debug!(generation, track_uri = %uri, "Toggle requested");

        if previous.is_playing_uri(uri) {
            self.stop_backend(previous.active_backend()).await;
            let outcome = self.settle(generation, PlayerPhase::Idle, ToggleOutcome::Stopped).await;
            tracing::info!(track_uri = %uri, "Playback stopped");
            return Ok(outcome);
        }

        // Only one track may hold the slot
        self.stop_backend(previous.active_backend()).await;
        if !self.commit(generation, PlayerPhase::Selecting { uri: uri.to_string() }).await {
            return Ok(ToggleOutcome::Superseded);
        }

        let mut remote_error = None;
        if let (Some(remote), Some(device_id)) = (self.remote.clone(), self.devices.ready_device().await) {
            match self.play_remote(&remote, uri, &device_id, generation).await {
                Ok(RemoteAttempt::Playing) => {
                    tracing::info!(track_uri = %uri, device_id = %device_id, "Remote playback started");
                    let phase = PlayerPhase::RemotePlaying { uri: uri.to_string() };
                    return Ok(self.settle(generation, phase, ToggleOutcome::Started(ActiveBackend::Remote)).await);
                }
                Ok(RemoteAttempt::Resumed) => {
                    let phase = PlayerPhase::RemotePlaying { uri: uri.to_string() };
                    return Ok(self.settle(generation, phase, ToggleOutcome::Resumed).await);
                }
                Ok(RemoteAttempt::Stopped) => {
                    return Ok(self.settle(generation, PlayerPhase::Idle, ToggleOutcome::Stopped).await);
                }
                Ok(RemoteAttempt::Superseded) => return Ok(ToggleOutcome::Superseded),
                Err(e) => {
                    if self.is_stale(generation).await {
                        return Ok(ToggleOutcome::Superseded);
                    }
                    tracing::warn!(error = %e, track_uri = %uri, has_preview = track.preview_url.is_some(), "Remote playback failed");
                    remote_error = Some(e);
                }
            }
        }

        match &track.preview_url {
            Some(url) => self.play_preview(uri, url, generation).await,
            None => {
                let error = remote_error.unwrap_or_else(|| SessionError::PlaybackUnsupported { uri: uri.to_string() });
                self.fail(generation, uri, error).await
            }
        }
    }

    /// Stop whatever is playing and cancel any toggle in flight.
    pub async fn stop(&self) {
        let (generation, previous) = self.begin().await;
        self.stop_backend(previous.active_backend()).await;
        self.commit(generation, PlayerPhase::Idle).await;
    }

    /// Resynchronize with an out-of-band report from the remote backend.
    ///
    /// "No active track" resets the slot to Idle only while the remote owns it.
    /// A running preview never touches the remote, which reports no track the
    /// whole time the clip plays; resetting on that would cut every preview
    /// short. A toggle in flight is left alone for the same reason, since the
    /// remote has not caught up with it yet.
    pub async fn on_remote_state_changed(&self, remote: RemoteTrackState) {
        let mut slot = self.slot.lock().await;
        let next = match (&slot.state.phase, remote.track_uri) {
            (PlayerPhase::RemotePlaying { .. }, None) => PlaybackState::default(),
            (PlayerPhase::RemotePlaying { .. }, Some(uri)) => PlaybackState {
                phase: PlayerPhase::RemotePlaying { uri },
                paused: remote.paused,
            },
            (PlayerPhase::Idle | PlayerPhase::Error { .. }, Some(uri)) if !remote.paused => PlaybackState {
                phase: PlayerPhase::RemotePlaying { uri },
                paused: false,
            },
            _ => return,
        };

        if next != slot.state {
            tracing::debug!(state = ?next, "Resynchronized with remote state");
            slot.state = next.clone();
            drop(slot);
            self.events.emit(SessionEvent::PlaybackChanged(next));
        }
    }

    async fn begin(&self) -> (u64, PlaybackState) {
        let mut slot = self.slot.lock().await;
        slot.generation += 1;
        (slot.generation, slot.state.clone())
    }

    async fn is_stale(&self, generation: u64) -> bool {
        self.slot.lock().await.generation != generation
    }

    /// Move to `phase` if `generation` is still the latest toggle.
    async fn commit(&self, generation: u64, phase: PlayerPhase) -> bool {
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            tracing::debug!(generation, current = slot.generation, "Discarding stale playback continuation");
            return false;
        }
        let release_remote = slot.take_remote_leftover(&phase);
        slot.state = PlaybackState { phase, paused: false };
        let snapshot = slot.state.clone();
        drop(slot);

        if release_remote {
            self.pause_remote("Failed to pause superseded remote playback").await;
        }
        self.events.emit(SessionEvent::PlaybackChanged(snapshot));
        true
    }

    async fn settle(&self, generation: u64, phase: PlayerPhase, outcome: ToggleOutcome) -> ToggleOutcome {
        if self.commit(generation, phase).await {
            outcome
        } else {
            ToggleOutcome::Superseded
        }
    }

    async fn fail(&self, generation: u64, uri: &str, error: SessionError) -> SessionResult<ToggleOutcome> {
        let phase = PlayerPhase::Error {
            uri: uri.to_string(),
            reason: error.to_string(),
        };
        if !self.commit(generation, phase).await {
            return Ok(ToggleOutcome::Superseded);
        }

        tracing::error!(error = %error, track_uri = %uri, "Playback failed");
        self.events.emit(SessionEvent::PlaybackFailed {
            uri: uri.to_string(),
            message: error.to_string(),
        });
        Err(error)
    }

    async fn stop_backend(&self, backend: ActiveBackend) {
        match backend {
            ActiveBackend::None => {}
            ActiveBackend::LocalPreview => self.preview.stop().await,
            ActiveBackend::Remote => self.pause_remote("Failed to pause remote playback").await,
        }
    }

    async fn pause_remote(&self, failure: &str) {
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.pause().await {
                tracing::warn!(error = %e, "{}", failure);
            }
        }
    }

    async fn ensure_device(&self, device_id: &str) -> SessionResult<()> {
        if self.devices.is_current(device_id).await {
            Ok(())
        } else {
            Err(SessionError::DeviceUnavailable("device went offline".into()))
        }
    }

    async fn play_remote(
        &self,
        remote: &Arc<dyn RemotePlayback>,
        uri: &str,
        device_id: &str,
        generation: u64,
    ) -> SessionResult<RemoteAttempt> {
        let current = remote.current_state().await?;
        if self.is_stale(generation).await {
            return Ok(RemoteAttempt::Superseded);
        }
        self.ensure_device(device_id).await?;

        if current.track_uri.as_deref() == Some(uri) {
            return if current.paused {
                remote.resume().await?;
                Ok(RemoteAttempt::Resumed)
            } else {
                remote.pause().await?;
                Ok(RemoteAttempt::Stopped)
            };
        }

        let error = match self.start_remote(remote, uri, device_id, generation).await {
            Err(e) if e.is_retryable() => e,
            other => return other,
        };
        if !self.devices.is_current(device_id).await {
            return Err(error);
        }

        // One transfer-and-retry; a second failure is final
        tracing::info!(error = %error, device_id, "No active device, transferring playback and retrying once");
        if let Err(e) = self.devices.transfer(device_id).await {
            tracing::warn!(error = %e, "Transfer before retry failed");
        }
        tokio::time::sleep(self.timings.retry_delay).await;
        if self.is_stale(generation).await {
            return Ok(RemoteAttempt::Superseded);
        }
        self.ensure_device(device_id).await?;

        self.start_remote(remote, uri, device_id, generation).await
    }

    async fn start_remote(
        &self,
        remote: &Arc<dyn RemotePlayback>,
        uri: &str,
        device_id: &str,
        generation: u64,
    ) -> SessionResult<RemoteAttempt> {
        remote.play(uri, device_id).await?;
        if self.is_stale(generation).await {
            self.release_stale_remote().await;
            return Ok(RemoteAttempt::Superseded);
        }
        self.ensure_device(device_id).await?;

        tokio::time::sleep(self.timings.resume_delay).await;
        if self.is_stale(generation).await {
            self.release_stale_remote().await;
            return Ok(RemoteAttempt::Superseded);
        }
        remote.resume().await?;
        Ok(RemoteAttempt::Playing)
    }

    /// A superseded remote start may have left the device playing.
    ///
    /// If the remote already owns the slot again the newer play replaced ours.
    /// If a newer toggle is still deciding, the pause is deferred to whatever
    /// phase it commits; otherwise pause now.
    async fn release_stale_remote(&self) {
        let mut slot = self.slot.lock().await;
        match slot.state.phase {
            PlayerPhase::RemotePlaying { .. } => return,
            PlayerPhase::Selecting { .. } => {
                tracing::debug!("Deferring release of superseded remote start");
                slot.remote_leftover = true;
                return;
            }
            _ => {}
        }
        drop(slot);
        self.pause_remote("Failed to pause superseded remote playback").await;
    }

    async fn play_preview(&self, uri: &str, url: &str, generation: u64) -> SessionResult<ToggleOutcome> {
        // The slot stays locked while the clip starts so no newer toggle can
        // slip in between the generation check and the state change.
        let mut slot = self.slot.lock().await;
        if slot.generation != generation {
            return Ok(ToggleOutcome::Superseded);
        }

        self.preview.stop().await;
        let ended = match self.preview.play_url(url).await {
            Ok(ended) => ended,
            Err(e) => {
                drop(slot);
                return self.fail(generation, uri, e).await;
            }
        };

        let phase = PlayerPhase::LocalPreviewPlaying { uri: uri.to_string() };
        let release_remote = slot.take_remote_leftover(&phase);
        slot.state = PlaybackState { phase, paused: false };
        let snapshot = slot.state.clone();
        drop(slot);

        if release_remote {
            self.pause_remote("Failed to pause superseded remote playback").await;
        }
        self.events.emit(SessionEvent::PlaybackChanged(snapshot));
        tracing::info!(track_uri = %uri, "Preview playback started");

        let controller = self.clone();
        let uri = uri.to_string();
        tokio::spawn(async move {
            // A closed channel means the preview was stopped rather than finished
            match ended.await {
                Ok(Ok(())) => controller.on_preview_ended(generation).await,
                Ok(Err(e)) => {
                    let _ = controller.fail(generation, &uri, e).await;
                }
                Err(_) => {}
            }
        });

        Ok(ToggleOutcome::Started(ActiveBackend::LocalPreview))
    }

    async fn on_preview_ended(&self, generation: u64) {
        let mut slot = self.slot.lock().await;
        let owns_slot = slot.generation == generation
            && matches!(slot.state.phase, PlayerPhase::LocalPreviewPlaying { .. });
        if !owns_slot {
            return;
        }

        tracing::debug!("Preview reached its end");
        slot.state = PlaybackState::default();
        let snapshot = slot.state.clone();
        drop(slot);
        self.events.emit(SessionEvent::PlaybackChanged(snapshot));
    }
}
