//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use super::AppController;

/// `1`..`9` rate 1 to 9, `0` rates 10
fn rating_for_key(c: char) -> Option<u8> {
    match c {
        '0' => Some(10),
        '1'..='9' => c.to_digit(10).map(|d| d as u8),
        _ => None,
    }
}

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Handle error message first (blocks all other interactions)
        if self.model.has_error().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                self.model.clear_error().await;
            }
            return Ok(());
        }

        if self.model.is_help_popup_open().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')) {
                self.model.toggle_help_popup().await;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.model.set_should_quit(true).await;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.model.move_selection_up().await;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let (tracks, _) = self.session.tracks().await;
                self.model.move_selection_down(tracks.len()).await;
            }
            // Play/stop the selected track
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.toggle_selected().await;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                let session = self.session.clone();
                tokio::spawn(async move { session.stop().await });
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                self.model.toggle_help_popup().await;
            }
            KeyCode::Char(c) => {
                if let Some(value) = rating_for_key(c) {
                    self.rate_selected(value).await;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn toggle_selected(&self) {
        let index = self.model.selected_index().await;
        let Some(track) = self.session.track_at(index).await else {
            return;
        };

        // Remote starts include deliberate delays; keep the UI responsive
        let session = self.session.clone();
        tokio::spawn(async move {
            if let Err(e) = session.toggle_track(&track.id).await {
                tracing::debug!(error = %e, track_id = %track.id, "Toggle failed");
            }
        });
    }

    async fn rate_selected(&self, value: u8) {
        let index = self.model.selected_index().await;
        let Some(track) = self.session.track_at(index).await else {
            return;
        };

        let session = self.session.clone();
        tokio::spawn(async move {
            // Failures reach the UI through the session event listener
            if let Err(e) = session.rate_track(&track.id, value).await {
                tracing::debug!(error = %e, track_id = %track.id, "Rating failed");
            }
        });
    }
}
