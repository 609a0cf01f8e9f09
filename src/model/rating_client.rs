//! HTTP client for the rating server

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use super::services::{AlbumTracks, RatingReceipt, RatingService};
use super::types::{AlbumSession, Rating, Track};
use crate::error::{SessionError, SessionResult};
use crate::{log_api_request, log_api_result};

#[derive(Deserialize)]
struct AlbumTracksResponse {
    #[serde(default)]
    items: Vec<Track>,
    #[serde(default)]
    session_info: Option<AlbumSession>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct RateTrackRequest<'a> {
    track_id: &'a str,
    album_id: &'a str,
    rating: u8,
}

#[derive(Deserialize)]
struct RateTrackResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    session: Option<AlbumSession>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Rating server API client with an optional session cookie
#[derive(Clone)]
pub struct RatingServerClient {
    http: Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl RatingServerClient {
    pub fn new(base_url: &str, session_cookie: Option<String>) -> SessionResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SessionError::NetworkFailure(format!(
                "server URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("album-rater/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network)?;

        Ok(Self { http, base_url, session_cookie })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.http.request(method, url);
        match &self.session_cookie {
            Some(cookie) => builder.header(reqwest::header::COOKIE, format!("session={}", cookie)),
            None => builder,
        }
    }

    async fn fetch_album_tracks_inner(&self, album_id: &str) -> SessionResult<AlbumTracks> {
        let response = self
            .request(Method::GET, &format!("/api/album-tracks/{}", album_id))
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SessionError::AuthRequired);
        }
        if !status.is_success() {
            return Err(SessionError::NetworkFailure(format!(
                "failed to fetch album tracks (HTTP {})",
                status.as_u16()
            )));
        }

        let body: AlbumTracksResponse = response.json().await.map_err(network)?;
        if let Some(error) = body.error {
            return Err(SessionError::NetworkFailure(error_message(&error)));
        }

        Ok(AlbumTracks { tracks: body.items, session: body.session_info })
    }

    async fn submit_rating_inner(&self, track_id: &str, album_id: &str, rating: Rating) -> SessionResult<RatingReceipt> {
        let response = self
            .request(Method::POST, "/api/rate-track")
            .json(&RateTrackRequest { track_id, album_id, rating: rating.value() })
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SessionError::AuthRequired);
        }

        // Failed ratings still come back as JSON with `success: false`
        match response.json::<RateTrackResponse>().await {
            Ok(body) => Ok(RatingReceipt {
                success: body.success && status.is_success(),
                session: body.session,
                error: body.error.as_ref().map(error_message),
            }),
            Err(_) if !status.is_success() => Err(SessionError::NetworkFailure(format!(
                "rating request failed (HTTP {})",
                status.as_u16()
            ))),
            Err(e) => Err(network(e)),
        }
    }

    async fn playback_token_inner(&self) -> SessionResult<Option<String>> {
        let response = self
            .request(Method::GET, "/api/get-token")
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SessionError::AuthRequired);
        }
        if !status.is_success() {
            return Ok(None);
        }

        let body: TokenResponse = response.json().await.map_err(network)?;
        Ok(body.access_token.filter(|t| !t.is_empty()))
    }
}

#[async_trait]
impl RatingService for RatingServerClient {
    async fn fetch_album_tracks(&self, album_id: &str) -> SessionResult<AlbumTracks> {
        log_api_request!("fetch_album_tracks", album_id);
        let result = self.fetch_album_tracks_inner(album_id).await;
        log_api_result!("fetch_album_tracks", result);
        result
    }

    async fn submit_rating(&self, track_id: &str, album_id: &str, rating: Rating) -> SessionResult<RatingReceipt> {
        log_api_request!("submit_rating", track_id, album_id, rating = rating.value());
        let result = self.submit_rating_inner(track_id, album_id, rating).await;
        log_api_result!("submit_rating", result);
        result
    }

    async fn playback_token(&self) -> SessionResult<Option<String>> {
        log_api_request!("playback_token");
        let result = self.playback_token_inner().await;
        log_api_result!("playback_token", result);
        result
    }
}

fn network(error: reqwest::Error) -> SessionError {
    SessionError::NetworkFailure(error.to_string())
}

/// Server errors are either a bare string or `{ "message": ... }`.
fn error_message(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}
