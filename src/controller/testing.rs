//! In-memory collaborators for controller tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use crate::error::{SessionError, SessionResult};
use crate::model::{
    AlbumSession, AlbumTracks, PreviewPlayer, Rating, RatingReceipt, RatingService, RemotePlayback,
    RemoteTrackState,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteCall {
    State,
    Play(String),
    Pause,
    Resume,
    Transfer(String),
}

#[derive(Default)]
struct RemoteInner {
    calls: Vec<RemoteCall>,
    play_results: VecDeque<SessionResult<()>>,
    resume_results: VecDeque<SessionResult<()>>,
    failing_transfers: usize,
    state: RemoteTrackState,
    state_error: Option<SessionError>,
}

/// Scripted remote backend; unscripted commands succeed
#[derive(Default)]
pub struct FakeRemote {
    inner: Mutex<RemoteInner>,
    play_gate: Notify,
    gated: Mutex<bool>,
    held_uris: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeRemote {
    pub fn push_play_result(&self, result: SessionResult<()>) {
        self.inner.lock().unwrap().play_results.push_back(result);
    }

    pub fn push_resume_result(&self, result: SessionResult<()>) {
        self.inner.lock().unwrap().resume_results.push_back(result);
    }

    pub fn fail_transfers(&self, count: usize) {
        self.inner.lock().unwrap().failing_transfers = count;
    }

    pub fn set_state(&self, state: RemoteTrackState) {
        self.inner.lock().unwrap().state = state;
    }

    pub fn fail_state_query(&self, error: SessionError) {
        self.inner.lock().unwrap().state_error = Some(error);
    }

    /// The next `play` call blocks until [`FakeRemote::release_play`].
    pub fn hold_next_play(&self) {
        *self.gated.lock().unwrap() = true;
    }

    pub fn release_play(&self) {
        self.play_gate.notify_one();
    }

    /// Every `play` of `track_uri` blocks until [`FakeRemote::release_play_of`].
    pub fn hold_play_of(&self, track_uri: &str) {
        self.held_uris
            .lock()
            .unwrap()
            .insert(track_uri.to_string(), Arc::new(Notify::new()));
    }

    pub fn release_play_of(&self, track_uri: &str) {
        if let Some(gate) = self.held_uris.lock().unwrap().remove(track_uri) {
            gate.notify_one();
        }
    }

    pub fn state(&self) -> RemoteTrackState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn plays(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RemoteCall::Play(uri) => Some(uri),
                _ => None,
            })
            .collect()
    }

    pub fn transfers(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RemoteCall::Transfer(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RemoteCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl RemotePlayback for FakeRemote {
    async fn current_state(&self) -> SessionResult<RemoteTrackState> {
        self.record(RemoteCall::State);
        let inner = self.inner.lock().unwrap();
        match &inner.state_error {
            Some(e) => Err(e.clone()),
            None => Ok(inner.state.clone()),
        }
    }

    async fn play(&self, track_uri: &str, _device_id: &str) -> SessionResult<()> {
        self.record(RemoteCall::Play(track_uri.to_string()));
        let gated = std::mem::take(&mut *self.gated.lock().unwrap());
        if gated {
            self.play_gate.notified().await;
        }
        let held = self.held_uris.lock().unwrap().get(track_uri).cloned();
        if let Some(gate) = held {
            gate.notified().await;
        }
        let result = self.inner.lock().unwrap().play_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.set_state(RemoteTrackState::playing(track_uri));
        }
        result
    }

    async fn pause(&self) -> SessionResult<()> {
        self.record(RemoteCall::Pause);
        self.inner.lock().unwrap().state.paused = true;
        Ok(())
    }

    async fn resume(&self) -> SessionResult<()> {
        self.record(RemoteCall::Resume);
        let mut inner = self.inner.lock().unwrap();
        let result = inner.resume_results.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            inner.state.paused = false;
        }
        result
    }

    async fn transfer(&self, device_id: &str) -> SessionResult<()> {
        self.record(RemoteCall::Transfer(device_id.to_string()));
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_transfers > 0 {
            inner.failing_transfers -= 1;
            return Err(SessionError::RemoteCommand("transfer rejected".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct PreviewInner {
    played: Vec<String>,
    stops: usize,
    ended: Option<oneshot::Sender<SessionResult<()>>>,
    fail_next: bool,
}

/// Preview player that never makes a sound
#[derive(Default)]
pub struct FakePreview {
    inner: Mutex<PreviewInner>,
}

impl FakePreview {
    pub fn played(&self) -> Vec<String> {
        self.inner.lock().unwrap().played.clone()
    }

    pub fn stops(&self) -> usize {
        self.inner.lock().unwrap().stops
    }

    pub fn fail_next(&self) {
        self.inner.lock().unwrap().fail_next = true;
    }

    /// Let the running clip reach its natural end.
    pub fn finish(&self) {
        if let Some(ended) = self.inner.lock().unwrap().ended.take() {
            let _ = ended.send(Ok(()));
        }
    }

    /// Make the running player exit with an error.
    pub fn crash(&self, reason: &str) {
        if let Some(ended) = self.inner.lock().unwrap().ended.take() {
            let _ = ended.send(Err(SessionError::PreviewFailed(reason.to_string())));
        }
    }
}

#[async_trait]
impl PreviewPlayer for FakePreview {
    async fn play_url(&self, url: &str) -> SessionResult<oneshot::Receiver<SessionResult<()>>> {
        let mut inner = self.inner.lock().unwrap();
        if std::mem::take(&mut inner.fail_next) {
            return Err(SessionError::PreviewFailed("no audio output".into()));
        }
        let (tx, rx) = oneshot::channel();
        inner.played.push(url.to_string());
        inner.ended = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stops += 1;
        inner.ended = None;
    }
}

/// Rating server that answers from a script
#[derive(Default)]
pub struct FakeRatingService {
    receipts: Mutex<VecDeque<SessionResult<RatingReceipt>>>,
    submitted: Mutex<Vec<(String, u8)>>,
    album: Mutex<Option<AlbumTracks>>,
    reply_gate: Notify,
    gated: Mutex<bool>,
}

impl FakeRatingService {
    pub fn with_album(album: AlbumTracks) -> Self {
        let service = Self::default();
        *service.album.lock().unwrap() = Some(album);
        service
    }

    pub fn push_receipt(&self, receipt: SessionResult<RatingReceipt>) {
        self.receipts.lock().unwrap().push_back(receipt);
    }

    pub fn accept_with(&self, session: AlbumSession) {
        self.push_receipt(Ok(RatingReceipt {
            success: true,
            session: Some(session),
            error: None,
        }));
    }

    /// The next submission takes its reply from the script right away but
    /// only returns it after [`FakeRatingService::release_submission`].
    pub fn hold_next_submission(&self) {
        *self.gated.lock().unwrap() = true;
    }

    pub fn release_submission(&self) {
        self.reply_gate.notify_one();
    }

    pub fn submitted(&self) -> Vec<(String, u8)> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RatingService for FakeRatingService {
    async fn fetch_album_tracks(&self, _album_id: &str) -> SessionResult<AlbumTracks> {
        self.album
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::AuthRequired)
    }

    async fn submit_rating(&self, track_id: &str, _album_id: &str, rating: Rating) -> SessionResult<RatingReceipt> {
        self.submitted.lock().unwrap().push((track_id.to_string(), rating.value()));
        let receipt = self
            .receipts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RatingReceipt { success: true, session: None, error: None }));
        let gated = std::mem::take(&mut *self.gated.lock().unwrap());
        if gated {
            self.reply_gate.notified().await;
        }
        receipt
    }

    async fn playback_token(&self) -> SessionResult<Option<String>> {
        Ok(None)
    }
}
