//! Spotify Web API client used as the remote playback backend

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rspotify::{
    model::{PlayableId, PlayableItem, TrackId},
    prelude::*,
    AuthCodeSpotify, Config, Token,
};

use super::playback::RemoteTrackState;
use super::services::RemotePlayback;
use crate::error::{SessionError, SessionResult};
use crate::log_api_request;

/// Spotify API client bound to our Connect device name
#[derive(Clone)]
pub struct SpotifyClient {
    client: Arc<AuthCodeSpotify>,
    local_device_name: Option<String>,
}

impl SpotifyClient {
    pub fn new(client: AuthCodeSpotify, local_device_name: Option<String>) -> Self {
        Self {
            client: Arc::new(client),
            local_device_name,
        }
    }

    /// Build a client around an access token handed out by the rating server.
    pub async fn with_access_token(access_token: String, local_device_name: Option<String>) -> Self {
        let spotify = AuthCodeSpotify::with_config(
            Default::default(),
            Default::default(),
            Config {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        );

        let token = Token {
            access_token,
            expires_in: chrono::Duration::seconds(3600),
            expires_at: Some(chrono::Utc::now() + chrono::Duration::seconds(3600)),
            scopes: HashSet::new(),
            refresh_token: None,
        };
        match spotify.token.lock().await {
            Ok(mut slot) => *slot = Some(token),
            Err(_) => tracing::error!("rspotify token lock poisoned"),
        }
        tracing::debug!("rspotify client initialized");

        Self::new(spotify, local_device_name)
    }

    /// Look up the Web API id of a device by its Connect name.
    pub async fn find_device_id(&self, name: &str) -> SessionResult<Option<String>> {
        let devices = self.client.device().await.map_err(classify)?;
        let id = devices.into_iter().find(|d| d.name == name).and_then(|d| d.id);
        tracing::debug!(device_name = name, device_id = ?id, "Device lookup");
        Ok(id)
    }

    async fn get_device_id(&self) -> Option<String> {
        let devices = self.client.device().await.ok()?;

        if let Some(local_name) = &self.local_device_name {
            if let Some(device) = devices.iter().find(|d| &d.name == local_name) {
                return device.id.clone();
            }
        }

        devices.into_iter().find(|d| d.is_active).and_then(|d| d.id)
    }
}

#[async_trait]
impl RemotePlayback for SpotifyClient {
    async fn current_state(&self) -> SessionResult<RemoteTrackState> {
        tracing::trace!("API: current_playback");
        let playback = self
            .client
            .current_playback(None, None::<Vec<_>>)
            .await
            .map_err(classify)?;

        let Some(playback) = playback else {
            return Ok(RemoteTrackState::default());
        };

        let track_uri = match &playback.item {
            Some(PlayableItem::Track(track)) => track.id.as_ref().map(|id| id.uri()),
            Some(PlayableItem::Episode(episode)) => Some(episode.id.uri()),
            _ => None,
        };

        Ok(RemoteTrackState {
            track_uri,
            paused: !playback.is_playing,
        })
    }

    async fn play(&self, track_uri: &str, device_id: &str) -> SessionResult<()> {
        log_api_request!("start_uris_playback", track_uri, device_id);
        let track_id = TrackId::from_uri(track_uri)
            .or_else(|_| TrackId::from_id(track_uri.rsplit(':').next().unwrap_or(track_uri)))
            .map_err(|e| SessionError::RemoteCommand(format!("invalid track uri {}: {}", track_uri, e)))?;

        self.client
            .start_uris_playback([PlayableId::Track(track_id)], Some(device_id), None, None)
            .await
            .map_err(classify)
    }

    async fn pause(&self) -> SessionResult<()> {
        let device_id = self.get_device_id().await;
        log_api_request!("pause_playback", device_id = ?device_id);
        self.client
            .pause_playback(device_id.as_deref())
            .await
            .map_err(classify)
    }

    async fn resume(&self) -> SessionResult<()> {
        let device_id = self.get_device_id().await;
        log_api_request!("resume_playback", device_id = ?device_id);
        self.client
            .resume_playback(device_id.as_deref(), None)
            .await
            .map_err(classify)
    }

    async fn transfer(&self, device_id: &str) -> SessionResult<()> {
        log_api_request!("transfer_playback", device_id);
        self.client
            .transfer_playback(device_id, Some(false))
            .await
            .map_err(classify)
    }
}

fn classify(error: rspotify::ClientError) -> SessionError {
    classify_message(&error.to_string())
}

fn classify_message(message: &str) -> SessionError {
    let lower = message.to_lowercase();
    if lower.contains("401") {
        SessionError::AuthRequired
    } else if lower.contains("404")
        || lower.contains("no_active_device")
        || lower.contains("no active device")
        || lower.contains("device not found")
    {
        SessionError::DeviceUnavailable(message.to_string())
    } else {
        SessionError::RemoteCommand(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_errors_are_device_unavailable() {
        assert!(matches!(
            classify_message("http error: status code 404 Not Found"),
            SessionError::DeviceUnavailable(_)
        ));
        assert!(matches!(
            classify_message(r#"{"error":{"status":404,"reason":"NO_ACTIVE_DEVICE"}}"#),
            SessionError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn other_errors_are_remote_command_failures() {
        assert!(matches!(
            classify_message("http error: status code 403 Forbidden"),
            SessionError::RemoteCommand(_)
        ));
        assert_eq!(classify_message("status code 401 Unauthorized"), SessionError::AuthRequired);
    }
}
