//! Track & session store: the single owner of ratings and the album aggregate

use super::types::{AlbumSession, Rating, Track};
use crate::error::{SessionError, SessionResult};

/// Pure data holder for the album being rated. No network access.
#[derive(Clone, Debug)]
pub struct TrackStore {
    album_id: String,
    tracks: Vec<Track>,
    session: AlbumSession,
    /// Stamp of the most recent rating submission
    latest_submission: u64,
}

impl TrackStore {
    /// Without a server aggregate, one is derived from the tracks' own ratings.
    pub fn new(album_id: impl Into<String>, tracks: Vec<Track>, session: Option<AlbumSession>) -> Self {
        let mut store = Self {
            album_id: album_id.into(),
            tracks,
            session: AlbumSession::default(),
            latest_submission: 0,
        };
        store.session = match session {
            Some(session) => session,
            None => store.provisional_session(),
        };
        store
    }

    pub fn album_id(&self) -> &str {
        &self.album_id
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_by_id(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn session(&self) -> &AlbumSession {
        &self.session
    }

    pub fn completion_percentage(&self) -> u8 {
        self.session.completion_percentage()
    }

    pub fn average_rating(&self) -> Option<f64> {
        self.session.average_rating
    }

    /// Record a rating locally and replace the aggregate with a provisional one.
    ///
    /// Re-rating a track replaces its previous value; the rated count only
    /// grows the first time a track is rated.
    pub fn apply_optimistic_rating(&mut self, track_id: &str, rating: Rating) -> SessionResult<AlbumSession> {
        let track = self
            .tracks
            .iter_mut()
            .find(|t| t.id == track_id)
            .ok_or_else(|| SessionError::UnknownTrack(track_id.to_string()))?;
        track.set_rating(rating);

        self.session = self.provisional_session();
        Ok(self.session.clone())
    }

    /// Stamp a new rating submission. Only the newest stamp may replace the
    /// aggregate with the server's reply.
    pub fn begin_submission(&mut self) -> u64 {
        self.latest_submission += 1;
        self.latest_submission
    }

    /// Replace the aggregate with the server's authoritative one, unless a
    /// newer submission has been sent since `submission` was stamped.
    pub fn apply_server_session(&mut self, submission: u64, session: AlbumSession) -> bool {
        if submission != self.latest_submission {
            return false;
        }
        self.session = session;
        true
    }

    fn provisional_session(&self) -> AlbumSession {
        let total = if self.session.total_tracks > 0 {
            self.session.total_tracks
        } else {
            self.tracks.len() as u32
        };
        AlbumSession::from_ratings(
            self.album_id.clone(),
            total,
            self.tracks.iter().filter_map(Track::rating),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album_of(n: usize) -> TrackStore {
        let tracks = (0..n).map(|i| Track::new(format!("t{}", i), format!("Track {}", i))).collect();
        TrackStore::new("album", tracks, None)
    }

    fn rating(v: u8) -> Rating {
        Rating::new(v).unwrap()
    }

    #[test]
    fn derives_aggregate_when_server_sends_none() {
        let store = album_of(4);
        assert_eq!(store.session().total_tracks, 4);
        assert_eq!(store.session().rated_tracks, 0);
        assert_eq!(store.average_rating(), None);
    }

    #[test]
    fn optimistic_rating_updates_aggregate() {
        let mut store = album_of(10);
        store.apply_optimistic_rating("t0", rating(4)).unwrap();
        store.apply_optimistic_rating("t1", rating(8)).unwrap();
        let session = store.apply_optimistic_rating("t2", rating(10)).unwrap();

        assert_eq!(session.rated_tracks, 3);
        assert_eq!(store.completion_percentage(), 30);
        assert_eq!(store.session().average_display(), "7.33");
    }

    #[test]
    fn rerating_replaces_instead_of_adding() {
        let mut store = album_of(5);
        store.apply_optimistic_rating("t3", rating(2)).unwrap();
        let session = store.apply_optimistic_rating("t3", rating(6)).unwrap();

        assert_eq!(session.rated_tracks, 1);
        assert_eq!(store.average_rating(), Some(6.0));
        assert_eq!(store.track_by_id("t3").and_then(Track::rating), Some(rating(6)));
    }

    #[test]
    fn unknown_track_is_rejected_without_touching_state() {
        let mut store = album_of(2);
        let before = store.session().clone();
        let err = store.apply_optimistic_rating("nope", rating(5)).unwrap_err();
        assert_eq!(err, SessionError::UnknownTrack("nope".into()));
        assert_eq!(store.session(), &before);
    }

    #[test]
    fn server_session_is_authoritative() {
        let mut store = album_of(3);
        store.apply_optimistic_rating("t0", rating(5)).unwrap();
        let submission = store.begin_submission();
        let server = AlbumSession {
            album_id: "album".into(),
            total_tracks: 3,
            rated_tracks: 2,
            average_rating: Some(7.5),
            is_completed: false,
        };
        assert!(store.apply_server_session(submission, server.clone()));
        assert_eq!(store.session(), &server);
        assert_eq!(store.completion_percentage(), 67);
    }

    #[test]
    fn older_server_session_is_dropped() {
        let mut store = album_of(3);
        store.apply_optimistic_rating("t0", rating(5)).unwrap();
        let older = store.begin_submission();
        store.apply_optimistic_rating("t1", rating(7)).unwrap();
        let newer = store.begin_submission();

        let latest = AlbumSession::from_ratings("album", 3, [rating(5), rating(7)]);
        assert!(store.apply_server_session(newer, latest.clone()));
        let stale = AlbumSession::from_ratings("album", 3, [rating(5)]);
        assert!(!store.apply_server_session(older, stale));
        assert_eq!(store.session(), &latest);
    }

    #[test]
    fn recomputation_is_order_independent() {
        let mut a = album_of(6);
        let mut b = album_of(6);
        for (id, v) in [("t0", 3), ("t4", 9), ("t5", 7)] {
            a.apply_optimistic_rating(id, rating(v)).unwrap();
        }
        for (id, v) in [("t5", 7), ("t0", 3), ("t4", 9)] {
            b.apply_optimistic_rating(id, rating(v)).unwrap();
        }
        assert_eq!(a.session(), b.session());
    }
}
