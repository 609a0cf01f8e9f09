//! Model module - Application state, data types and service clients
//!
//! - `types`: Tracks, ratings, album aggregate, device session
//! - `store`: Track & session store (owner of ratings and the aggregate)
//! - `playback`: Playback state machine types
//! - `services`: Collaborator traits (rating server, remote playback, preview audio)
//! - `rating_client`: HTTP client for the rating server
//! - `spotify_client`: Spotify Web API remote backend
//! - `app_model`: UI state

mod types;
mod store;
mod playback;
mod services;
mod rating_client;
mod spotify_client;
mod app_model;

pub use types::{AlbumSession, DeviceSession, Rating, Track};

pub use store::TrackStore;

pub use playback::{ActiveBackend, PlaybackState, PlayerPhase, RemoteTrackState};

pub use services::{AlbumTracks, PreviewPlayer, RatingReceipt, RatingService, RemotePlayback};

pub use rating_client::RatingServerClient;

pub use spotify_client::SpotifyClient;

pub use app_model::{AppModel, UiState};
