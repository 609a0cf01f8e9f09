//! Album completion gauge

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Gauge},
    Frame,
};

use crate::model::AlbumSession;

pub fn render_album_progress(frame: &mut Frame, area: Rect, session: &AlbumSession) {
    let percentage = session.completion_percentage();

    let label = format!(
        "{}/{} rated ({}%)",
        session.rated_tracks, session.total_tracks, percentage
    );
    let title = if session.is_completed {
        " Album complete ".to_string()
    } else {
        " Album progress ".to_string()
    };
    let average = format!(" Average: {} ", session.average_display());

    let gauge_color = if session.is_completed { Color::Cyan } else { Color::Green };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(average).right_aligned()),
        )
        .gauge_style(Style::default().fg(gauge_color))
        .percent(percentage.min(100) as u16)
        .label(label);

    frame.render_widget(gauge, area);
}
