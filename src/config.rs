//! Runtime configuration from the command line and environment

use clap::Parser;

use crate::controller::PlaybackTimings;

#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "album-rater")]
#[command(about = "Rate every track of a Spotify album", long_about = None)]
pub struct Config {
    /// Album to rate: a bare id, a spotify:album: URI or an open.spotify.com link
    #[arg(env = "ALBUM_RATER_ALBUM", value_parser = album_id_from_link)]
    pub album_id: String,

    /// Base URL of the rating server
    #[arg(
        long = "server",
        env = "ALBUM_RATER_SERVER",
        default_value = "http://localhost:3000",
        value_parser = server_url
    )]
    pub server_url: String,

    /// Value of the rating server's `session` cookie
    #[arg(long = "session", env = "ALBUM_RATER_SESSION", hide_env_values = true)]
    pub session_cookie: Option<String>,

    /// Player used for preview clips; the clip URL is appended
    #[arg(long = "preview-cmd", env = "ALBUM_RATER_PREVIEW_CMD", default_value = "mpv --no-video --really-quiet")]
    pub preview_command: String,

    /// Connect name our in-process device registers under
    #[arg(long, env = "ALBUM_RATER_DEVICE_NAME", default_value = "Album-Rater")]
    pub device_name: String,

    #[arg(skip)]
    pub timings: PlaybackTimings,
}

impl Config {
    pub fn login_url(&self) -> String {
        format!("{}/login", self.server_url)
    }
}

/// Accept a bare id, a `spotify:album:` URI or an open.spotify.com link.
fn album_id_from_link(input: &str) -> Result<String, String> {
    let input = input.trim();
    let id = if let Some(id) = input.strip_prefix("spotify:album:") {
        id
    } else if let Some((_, rest)) = input.split_once("/album/") {
        rest.split(|c| c == '?' || c == '/').next().unwrap_or(rest)
    } else {
        input
    };

    if id.is_empty() {
        Err("album id is empty".to_string())
    } else {
        Ok(id.to_string())
    }
}

fn server_url(input: &str) -> Result<String, String> {
    let url = input.trim().trim_end_matches('/');
    if url.is_empty() {
        Err("server URL is empty".to_string())
    } else {
        Ok(url.to_string())
    }
}
