//! Now-playing bar

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::model::PlayerPhase;
use super::RenderState;

pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &RenderState, device_ready: bool) {
    let name_for = |uri: &str| {
        state
            .tracks
            .iter()
            .find(|t| t.uri == uri)
            .map(|t| format!("{} | {}", t.name, t.artist_line()))
            .unwrap_or_else(|| uri.to_string())
    };

    let (status_text, color) = match &state.playback.phase {
        PlayerPhase::Idle => (" Nothing playing".to_string(), Color::Gray),
        PlayerPhase::Selecting { uri } => (format!(" … Starting {}", name_for(uri)), Color::Yellow),
        PlayerPhase::RemotePlaying { uri } if state.playback.paused => {
            (format!(" ⏸ {} (Spotify)", name_for(uri)), Color::White)
        }
        PlayerPhase::RemotePlaying { uri } => (format!(" ▶ {} (Spotify)", name_for(uri)), Color::Green),
        PlayerPhase::LocalPreviewPlaying { uri } => (format!(" ▶ {} (Preview)", name_for(uri)), Color::Cyan),
        PlayerPhase::Error { uri, reason } => (format!(" ✗ {}: {}", name_for(uri), reason), Color::Red),
    };

    let device_text = if device_ready {
        format!(" ● {} ", state.device_name)
    } else {
        " ○ Preview only ".to_string()
    };
    let device_style = if device_ready {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let status = Paragraph::new(status_text).style(Style::default().fg(color)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Now playing ")
            .title_bottom(Line::styled(device_text, device_style).right_aligned())
            .title_bottom(Line::from(" h: help ").left_aligned()),
    );

    frame.render_widget(status, area);
}
