mod audio;
mod config;
mod controller;
mod error;
mod logging;
mod model;
mod preview;
mod view;

use std::io;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{bail, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use audio::{ConnectDevice, DeviceEvent};
use config::Config;
use controller::{AppController, SessionController};
use error::SessionError;
use model::{AppModel, RatingServerClient, RatingService, RemotePlayback, SpotifyClient};
use preview::ProcessPreviewPlayer;
use view::{AppView, RenderState};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = match logging::init_logging() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("=== Album Rater Starting ===");

    let config = Config::parse();
    tracing::info!(server = %config.server_url, album_id = %config.album_id, "Configuration loaded");

    let rating_client = Arc::new(RatingServerClient::new(&config.server_url, config.session_cookie.clone())?);
    let preview = Arc::new(ProcessPreviewPlayer::from_command_line(&config.preview_command)?);
    tracing::debug!(program = preview.program(), args = ?preview.args(), "Preview player configured");

    let (remote, device) = setup_remote(rating_client.as_ref(), &config).await;

    println!("Loading album {}...", config.album_id);
    let session = match SessionController::load(
        &config.album_id,
        rating_client,
        remote,
        preview,
        config.timings,
    )
    .await
    {
        Ok(session) => session,
        Err(SessionError::AuthRequired) => {
            tracing::warn!("Rating server requires login");
            bail!("Not logged in. Open {} in a browser, then restart.", config.login_url());
        }
        Err(e) => return Err(e.into()),
    };

    let controller = AppController::new(AppModel::new(), session.clone());
    controller.start_session_event_listener();

    let connect_device = match device {
        Some((device, events)) => {
            controller.start_device_event_listener(events);
            Some(device)
        }
        None => None,
    };

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &controller, &config.device_name).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    session.stop().await;
    if let Some(device) = connect_device {
        device.shutdown();
    }

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("Album Rater shutting down");
    Ok(())
}

/// Start the in-process Connect device if the server hands out a token.
///
/// Without one the session runs on preview clips only.
async fn setup_remote(
    rating_client: &RatingServerClient,
    config: &Config,
) -> (
    Option<Arc<dyn RemotePlayback>>,
    Option<(ConnectDevice, mpsc::UnboundedReceiver<DeviceEvent>)>,
) {
    let token = match rating_client.playback_token().await {
        Ok(Some(token)) => token,
        Ok(None) => {
            tracing::info!("No playback token, using preview clips only");
            return (None, None);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not fetch playback token, using preview clips only");
            return (None, None);
        }
    };

    let spotify = SpotifyClient::with_access_token(token.clone(), Some(config.device_name.clone())).await;

    println!("Connecting to Spotify as \"{}\"...", config.device_name);
    match ConnectDevice::start(&token, &config.device_name, spotify.clone()).await {
        Ok((device, events)) => {
            tracing::info!(device_name = device.name(), user = %device.username(), "Connect device started");
            let remote: Arc<dyn RemotePlayback> = Arc::new(spotify);
            (Some(remote), Some((device, events)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Connect device failed to start, using preview clips only");
            (None, None)
        }
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &AppController,
    device_name: &str,
) -> io::Result<()> {
    loop {
        controller.model.auto_clear_old_errors().await;

        let (tracks, album_session) = controller.session.tracks().await;
        let state = RenderState {
            tracks,
            session: album_session,
            playback: controller.session.playback_state().await,
            device_name: device_name.to_string(),
        };
        let ui_state = controller.model.get_ui_state().await;

        terminal.draw(|f| {
            AppView::render(f, &state, &ui_state);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "Key handling failed");
                }
            }
        }

        if controller.model.should_quit().await {
            break;
        }
    }

    Ok(())
}
