//! Core type definitions: tracks, ratings and the album aggregate

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SessionError;

/// A confirmed 1-10 rating
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self, SessionError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SessionError::InvalidRating(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A track of the album being rated.
///
/// Everything but the rating is fixed once loaded; the rating only changes
/// through the track store.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Track {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default, deserialize_with = "artist_names")]
    pub artists: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub duration_ms: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub track_number: u32,
    #[serde(default, deserialize_with = "non_empty")]
    pub preview_url: Option<String>,
    #[serde(default, rename = "user_rating", deserialize_with = "lenient_rating")]
    rating: Option<Rating>,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            uri: format!("spotify:track:{}", id),
            id,
            name: name.into(),
            artists: Vec::new(),
            duration_ms: 0,
            track_number: 0,
            preview_url: None,
            rating: None,
        }
    }

    pub fn with_preview(mut self, url: impl Into<String>) -> Self {
        self.preview_url = Some(url.into());
        self
    }

    pub fn with_artists(mut self, artists: &[&str]) -> Self {
        self.artists = artists.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn rating(&self) -> Option<Rating> {
        self.rating
    }

    pub(super) fn set_rating(&mut self, rating: Rating) {
        self.rating = Some(rating);
    }

    pub fn artist_line(&self) -> String {
        if self.artists.is_empty() {
            "Unknown Artist".to_string()
        } else {
            self.artists.join(", ")
        }
    }
}

/// Aggregate rating progress for one album.
///
/// `average_rating` keeps full precision; rounding to two decimals happens in
/// [`AlbumSession::average_display`] only.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct AlbumSession {
    #[serde(default, rename = "album_spotify_id", deserialize_with = "null_default")]
    pub album_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub total_tracks: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub rated_tracks: u32,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_completed: bool,
}

impl AlbumSession {
    pub fn empty(album_id: impl Into<String>, total_tracks: u32) -> Self {
        Self {
            album_id: album_id.into(),
            total_tracks,
            ..Default::default()
        }
    }

    /// Build an aggregate from a set of confirmed ratings.
    pub fn from_ratings<I>(album_id: impl Into<String>, total_tracks: u32, ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let (count, sum) = ratings
            .into_iter()
            .fold((0u32, 0u32), |(count, sum), r| (count + 1, sum + r.value() as u32));

        let total_tracks = total_tracks.max(count);
        Self {
            album_id: album_id.into(),
            total_tracks,
            rated_tracks: count,
            average_rating: (count > 0).then(|| sum as f64 / count as f64),
            is_completed: total_tracks > 0 && count >= total_tracks,
        }
    }

    pub fn completion_percentage(&self) -> u8 {
        if self.total_tracks == 0 {
            return 0;
        }
        let rated = self.rated_tracks.min(self.total_tracks) as f64;
        (rated / self.total_tracks as f64 * 100.0).round() as u8
    }

    pub fn average_display(&self) -> String {
        match self.average_rating {
            Some(avg) if self.rated_tracks > 0 => format!("{:.2}", avg),
            _ => "-".to_string(),
        }
    }
}

/// Readiness and identity of the bound remote playback device
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceSession {
    pub device_id: Option<String>,
    pub ready: bool,
}

#[derive(Deserialize)]
struct ArtistRef {
    name: String,
}

fn artist_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let artists: Option<Vec<ArtistRef>> = Option::deserialize(deserializer)?;
    Ok(artists
        .unwrap_or_default()
        .into_iter()
        .map(|a| a.name)
        .collect())
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// A rating the server got wrong is dropped for that track alone.
fn lenient_rating<'de, D>(deserializer: D) -> Result<Option<Rating>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        let rating = value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .and_then(|v| Rating::new(v).ok());
        if rating.is_none() {
            tracing::warn!(value = %value, "Ignoring invalid rating from server");
        }
        rating
    }))
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(values: &[u8]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn rating_range_is_enforced() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(11).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(10).unwrap().value(), 10);
    }

    #[test]
    fn three_of_ten_rated() {
        let session = AlbumSession::from_ratings("album", 10, ratings(&[4, 8, 10]));
        assert_eq!(session.rated_tracks, 3);
        assert_eq!(session.completion_percentage(), 30);
        assert_eq!(session.average_display(), "7.33");
        // Stored value keeps full precision
        assert!((session.average_rating.unwrap() - 22.0 / 3.0).abs() < 1e-12);
        assert!(!session.is_completed);
    }

    #[test]
    fn no_ratings_means_no_average() {
        let session = AlbumSession::from_ratings("album", 7, Vec::new());
        assert_eq!(session.average_rating, None);
        assert_eq!(session.average_display(), "-");
        assert_eq!(session.completion_percentage(), 0);
    }

    #[test]
    fn completion_rounds_to_nearest() {
        for total in 1..=25u32 {
            for rated in 0..=total {
                let values = vec![5u8; rated as usize];
                let session = AlbumSession::from_ratings("a", total, ratings(&values));
                let expected = (100.0 * rated as f64 / total as f64).round() as u8;
                assert_eq!(session.completion_percentage(), expected, "{}/{}", rated, total);
            }
        }
    }

    #[test]
    fn all_rated_is_completed() {
        let session = AlbumSession::from_ratings("a", 2, ratings(&[3, 9]));
        assert!(session.is_completed);
        assert_eq!(session.completion_percentage(), 100);
        assert_eq!(session.average_display(), "6.00");
    }

    #[test]
    fn empty_album_is_zero_percent() {
        assert_eq!(AlbumSession::empty("a", 0).completion_percentage(), 0);
    }

    #[test]
    fn track_deserializes_from_server_shape() {
        let json = serde_json::json!({
            "id": "4uLU6hMCjMI75M1A2tKUQC",
            "uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC",
            "name": "Never Gonna Give You Up",
            "artists": [{ "name": "Rick Astley" }, { "name": "Guest" }],
            "duration_ms": 213573,
            "track_number": 1,
            "preview_url": "",
            "user_rating": 9,
            "explicit": false
        });
        let track: Track = serde_json::from_value(json).unwrap();
        assert_eq!(track.artist_line(), "Rick Astley, Guest");
        assert_eq!(track.preview_url, None);
        assert_eq!(track.rating().map(Rating::value), Some(9));
    }

    #[test]
    fn invalid_server_rating_leaves_track_unrated() {
        for bad in [serde_json::json!(42), serde_json::json!(0), serde_json::json!("7"), serde_json::json!(6.5)] {
            let json = serde_json::json!({
                "id": "x", "uri": "spotify:track:x", "name": "x", "user_rating": bad
            });
            let track: Track = serde_json::from_value(json).unwrap();
            assert_eq!(track.rating(), None);
        }

        let json = serde_json::json!({ "id": "y", "uri": "spotify:track:y", "name": "y", "user_rating": null });
        assert_eq!(serde_json::from_value::<Track>(json).unwrap().rating(), None);
    }

    #[test]
    fn session_tolerates_nulls() {
        let json = serde_json::json!({
            "album_spotify_id": "alb",
            "total_tracks": null,
            "rated_tracks": 0,
            "average_rating": null,
            "completion_percentage": 0
        });
        let session: AlbumSession = serde_json::from_value(json).unwrap();
        assert_eq!(session.total_tracks, 0);
        assert_eq!(session.average_rating, None);
    }
}
