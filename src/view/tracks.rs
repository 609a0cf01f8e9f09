//! Track list rendering

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Padding},
    Frame,
};

use crate::model::{PlaybackState, Track};
use super::utils::{calculate_track_column_widths, format_duration, render_scrollable_list, truncate_string};

pub fn render_track_list(
    frame: &mut Frame,
    area: Rect,
    tracks: &[Track],
    playback: &PlaybackState,
    selected_index: usize,
) {
    let content_width = area.width.saturating_sub(4) as usize;
    let items = track_items(tracks, playback, selected_index, content_width);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Tracks ({}) ", tracks.len()))
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(Color::Green));

    render_scrollable_list(frame, area, items, selected_index + 1, block); // +1 for header
}

fn track_items(
    tracks: &[Track],
    playback: &PlaybackState,
    selected_index: usize,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let (num_width, title_width, artist_width, rating_width, _) =
        calculate_track_column_widths(content_width, tracks.len());

    let mut items = vec![
        ListItem::new(format!(
            " {:<num_width$}  {:<title_width$}  {:<artist_width$}  {:>rating_width$}  {}",
            "#", "Title", "Artist", "Rate", "Time",
        ))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    ];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_current = playback.current_uri() == Some(track.uri.as_str());
        let style = if i == selected_index {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else if is_current {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if track.rating().is_none() {
            Style::default().fg(Color::Gray)
        } else {
            Style::default()
        };

        let indicator = match (is_current, playback.is_playing()) {
            (true, true) => "▶",
            (true, false) => "·",
            _ => " ",
        };
        let number = if track.track_number > 0 { track.track_number as usize } else { i + 1 };
        let rating = track
            .rating()
            .map(|r| format!("{}/10", r.value()))
            .unwrap_or_else(|| "-".to_string());

        ListItem::new(format!(
            "{}{:<num_width$}  {}  {}  {:>rating_width$}  {}",
            indicator,
            number,
            truncate_string(&track.name, title_width),
            truncate_string(&track.artist_line(), artist_width),
            rating,
            format_duration(track.duration_ms),
        ))
        .style(style)
    }));

    items
}
