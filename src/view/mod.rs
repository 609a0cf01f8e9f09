//! View module - UI rendering
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `progress`: Album completion gauge
//! - `tracks`: Track list with ratings
//! - `status`: Now-playing bar
//! - `overlays`: Modal overlays (error, help)

mod utils;
mod progress;
mod tracks;
mod status;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::{AlbumSession, PlaybackState, Track, UiState};

/// Everything one frame needs, snapshotted from the session
pub struct RenderState {
    pub tracks: Vec<Track>,
    pub session: AlbumSession,
    pub playback: PlaybackState,
    pub device_name: String,
}

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, state: &RenderState, ui_state: &UiState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Album progress
                Constraint::Min(0),    // Track list
                Constraint::Length(3), // Now playing
            ])
            .split(frame.area());

        progress::render_album_progress(frame, chunks[0], &state.session);
        tracks::render_track_list(frame, chunks[1], &state.tracks, &state.playback, ui_state.selected);
        status::render_status_bar(frame, chunks[2], state, ui_state.device_ready);

        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }
    }
}
