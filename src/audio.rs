use anyhow::{Context, Result};
use librespot::connect::{ConnectConfig, Spirc};
use librespot::core::authentication::Credentials;
use librespot::core::config::SessionConfig;
use librespot::core::session::Session;
use librespot::playback::config::{AudioFormat, Bitrate, PlayerConfig};
use librespot::playback::mixer::{MixerConfig, NoOpVolume};
use librespot::playback::player::{Player, PlayerEvent, PlayerEventChannel};
use librespot::playback::{audio_backend, mixer};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::model::{RemoteTrackState, SpotifyClient};

const READY_POLL_ATTEMPTS: u32 = 20;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Lifecycle and state notifications from the Connect device
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    Ready { device_id: String },
    NotReady,
    StateChanged(RemoteTrackState),
}

/// A Spotify Connect device running inside this process.
///
/// Once the Web API lists it under its name, a [`DeviceEvent::Ready`] carries
/// the id to use for playback commands.
pub struct ConnectDevice {
    name: String,
    session: Session,
    spirc: Spirc,
}

impl ConnectDevice {
    pub async fn start(
        access_token: &str,
        name: &str,
        spotify: SpotifyClient,
    ) -> Result<(Self, mpsc::UnboundedReceiver<DeviceEvent>)> {
        tracing::info!(device_name = name, "Starting Connect device");

        let session_config = SessionConfig {
            device_id: Self::device_id(name),
            ..Default::default()
        };
        let player_config = PlayerConfig {
            bitrate: Bitrate::Bitrate160,
            ..Default::default()
        };
        let connect_config = ConnectConfig {
            name: name.to_string(),
            ..Default::default()
        };
        let audio_format = AudioFormat::default();
        let sink_builder = audio_backend::find(None).context("no audio sink available")?;
        let mixer_builder = mixer::find(None).context("no mixer available")?;
        let mixer = mixer_builder(MixerConfig::default())?;

        let session = Session::new(session_config, None);
        let player = Player::new(
            player_config,
            session.clone(),
            Box::new(NoOpVolume),
            move || sink_builder(None, audio_format),
        );
        let player_events = player.get_player_event_channel();

        let (spirc, spirc_task) = Spirc::new(
            connect_config,
            session.clone(),
            Credentials::with_access_token(access_token),
            player,
            mixer,
        )
        .await
        .context("could not connect to Spotify")?;
        spirc.activate()?;

        let (tx, rx) = mpsc::unbounded_channel();

        let lost_tx = tx.clone();
        tokio::spawn(async move {
            spirc_task.await;
            tracing::warn!("Connect device task ended");
            let _ = lost_tx.send(DeviceEvent::NotReady);
        });

        tokio::spawn(forward_player_events(player_events, tx.clone()));
        tokio::spawn(announce_when_listed(spotify, name.to_string(), tx));

        Ok((
            Self {
                name: name.to_string(),
                session,
                spirc,
            },
            rx,
        ))
    }

    fn device_id(name: &str) -> String {
        // Stable per machine
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        format!("{}-{}", name, hostname)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn username(&self) -> String {
        self.session.username()
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.spirc.shutdown() {
            tracing::warn!(error = %e, "Connect device shutdown failed");
        }
    }
}

/// Wait until the Web API lists the device, then report it ready.
async fn announce_when_listed(spotify: SpotifyClient, name: String, tx: mpsc::UnboundedSender<DeviceEvent>) {
    for attempt in 1..=READY_POLL_ATTEMPTS {
        match spotify.find_device_id(&name).await {
            Ok(Some(device_id)) => {
                let _ = tx.send(DeviceEvent::Ready { device_id });
                return;
            }
            Ok(None) => tracing::debug!(attempt, "Connect device not listed yet"),
            Err(e) => tracing::debug!(attempt, error = %e, "Device lookup failed"),
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
    tracing::warn!(device_name = %name, "Connect device never appeared in the device list");
    let _ = tx.send(DeviceEvent::NotReady);
}

async fn forward_player_events(mut events: PlayerEventChannel, tx: mpsc::UnboundedSender<DeviceEvent>) {
    let mut current_uri: Option<String> = None;

    while let Some(event) = events.recv().await {
        let state = match event {
            PlayerEvent::TrackChanged { audio_item } => {
                let uri = audio_item.track_id.to_uri().unwrap_or_default();
                tracing::debug!(track = %audio_item.name, uri = %uri, "PlayerEvent::TrackChanged");
                current_uri = Some(uri);
                continue;
            }
            PlayerEvent::Playing { .. } => RemoteTrackState {
                track_uri: current_uri.clone(),
                paused: false,
            },
            PlayerEvent::Paused { .. } => RemoteTrackState {
                track_uri: current_uri.clone(),
                paused: true,
            },
            PlayerEvent::Stopped { .. } | PlayerEvent::EndOfTrack { .. } => {
                current_uri = None;
                RemoteTrackState::default()
            }
            _ => continue,
        };

        tracing::trace!(?state, "Remote state changed");
        if tx.send(DeviceEvent::StateChanged(state)).is_err() {
            break;
        }
    }
}
