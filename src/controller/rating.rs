//! Rating submission coordinator

use std::sync::Arc;
use tokio::sync::Mutex;

use super::events::{EventBus, SessionEvent};
use crate::error::{SessionError, SessionResult};
use crate::model::{AlbumSession, Rating, RatingService, TrackStore};

#[derive(Clone)]
pub struct RatingCoordinator {
    store: Arc<Mutex<TrackStore>>,
    service: Arc<dyn RatingService>,
    events: EventBus,
}

impl RatingCoordinator {
    pub fn new(store: Arc<Mutex<TrackStore>>, service: Arc<dyn RatingService>, events: EventBus) -> Self {
        Self { store, service, events }
    }

    /// Rate a track: update locally right away, then confirm with the server.
    ///
    /// The server's aggregate replaces the provisional one on success, unless a
    /// newer rating was sent in the meantime; its reply is the one that counts.
    /// On failure the local rating stays as it is and the error is returned.
    pub async fn rate(&self, track_id: &str, value: u8) -> SessionResult<AlbumSession> {
        let rating = Rating::new(value)?;

        let (album_id, provisional, submission) = {
            let mut store = self.store.lock().await;
            let provisional = store.apply_optimistic_rating(track_id, rating)?;
            (store.album_id().to_string(), provisional, store.begin_submission())
        };
        tracing::debug!(track_id, rating = value, rated = provisional.rated_tracks, "Applied optimistic rating");
        self.events.emit(SessionEvent::RatingApplied {
            track_id: track_id.to_string(),
            rating,
            session: provisional.clone(),
            provisional: true,
        });

        let failure = match self.service.submit_rating(track_id, &album_id, rating).await {
            Ok(receipt) if receipt.success => {
                let session = match receipt.session {
                    Some(session) => {
                        let mut store = self.store.lock().await;
                        if store.apply_server_session(submission, session.clone()) {
                            session
                        } else {
                            tracing::debug!(track_id, submission, "Dropping aggregate from an older submission");
                            store.session().clone()
                        }
                    }
                    None => {
                        tracing::warn!(track_id, "Server accepted rating without an aggregate, keeping local one");
                        provisional
                    }
                };

                tracing::info!(
                    track_id,
                    rating = value,
                    rated = session.rated_tracks,
                    total = session.total_tracks,
                    average = %session.average_display(),
                    "Rating saved"
                );
                self.events.emit(SessionEvent::RatingApplied {
                    track_id: track_id.to_string(),
                    rating,
                    session: session.clone(),
                    provisional: false,
                });
                return Ok(session);
            }
            Ok(receipt) => SessionError::RatingSubmissionFailed(
                receipt.error.unwrap_or_else(|| "server rejected the rating".to_string()),
            ),
            Err(SessionError::AuthRequired) => SessionError::AuthRequired,
            Err(e) => SessionError::RatingSubmissionFailed(e.to_string()),
        };

        tracing::error!(track_id, rating = value, error = %failure, "Rating submission failed, keeping local value");
        self.events.emit(SessionEvent::RatingFailed {
            track_id: track_id.to_string(),
            message: failure.to_string(),
        });
        Err(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::FakeRatingService;
    use crate::model::{RatingReceipt, Track};

    fn setup(n: usize) -> (RatingCoordinator, Arc<Mutex<TrackStore>>, Arc<FakeRatingService>, EventBus) {
        let tracks = (0..n).map(|i| Track::new(format!("t{}", i), format!("Track {}", i))).collect();
        let store = Arc::new(Mutex::new(TrackStore::new("album", tracks, None)));
        let service = Arc::new(FakeRatingService::default());
        let events = EventBus::new();
        let coordinator = RatingCoordinator::new(store.clone(), service.clone(), events.clone());
        (coordinator, store, service, events)
    }

    fn server_session(rated: u32, total: u32, avg: f64) -> AlbumSession {
        AlbumSession {
            album_id: "album".into(),
            total_tracks: total,
            rated_tracks: rated,
            average_rating: Some(avg),
            is_completed: rated >= total,
        }
    }

    #[tokio::test]
    async fn success_replaces_provisional_with_server_aggregate() {
        let (coordinator, store, service, events) = setup(10);
        let mut rx = events.subscribe();
        service.accept_with(server_session(4, 10, 6.5));

        let session = coordinator.rate("t0", 8).await.unwrap();
        assert_eq!(session.rated_tracks, 4);
        assert_eq!(store.lock().await.session(), &server_session(4, 10, 6.5));
        assert_eq!(service.submitted(), vec![("t0".to_string(), 8)]);

        match rx.recv().await.unwrap() {
            SessionEvent::RatingApplied { provisional, session, .. } => {
                assert!(provisional);
                assert_eq!(session.rated_tracks, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            SessionEvent::RatingApplied { provisional, session, .. } => {
                assert!(!provisional);
                assert_eq!(session.rated_tracks, 4);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_reply_does_not_overwrite_newer_aggregate() {
        let (coordinator, store, service, _events) = setup(4);
        service.accept_with(server_session(1, 4, 5.0));
        service.accept_with(server_session(2, 4, 6.0));
        service.hold_next_submission();

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.rate("t0", 5).await })
        };
        for _ in 0..1000 {
            if !service.submitted().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(service.submitted().len(), 1);

        let second = coordinator.rate("t1", 7).await.unwrap();
        assert_eq!(second.rated_tracks, 2);

        service.release_submission();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first.rated_tracks, 2);

        let store = store.lock().await;
        assert_eq!(store.session(), &server_session(2, 4, 6.0));
        assert_eq!(store.tracks().iter().filter(|t| t.rating().is_some()).count(), 2);
    }

    #[tokio::test]
    async fn failure_keeps_optimistic_rating() {
        let (coordinator, store, service, events) = setup(4);
        let mut rx = events.subscribe();
        service.push_receipt(Ok(RatingReceipt {
            success: false,
            session: None,
            error: Some("database unavailable".into()),
        }));

        let err = coordinator.rate("t2", 6).await.unwrap_err();
        assert_eq!(err, SessionError::RatingSubmissionFailed("database unavailable".into()));

        let store = store.lock().await;
        assert_eq!(store.track_by_id("t2").and_then(Track::rating).map(Rating::value), Some(6));
        assert_eq!(store.session().rated_tracks, 1);

        let _provisional = rx.recv().await.unwrap();
        assert!(matches!(rx.recv().await.unwrap(), SessionEvent::RatingFailed { .. }));
    }

    #[tokio::test]
    async fn network_errors_are_submission_failures() {
        let (coordinator, _store, service, _events) = setup(2);
        service.push_receipt(Err(SessionError::NetworkFailure("connection refused".into())));

        let err = coordinator.rate("t0", 5).await.unwrap_err();
        assert!(matches!(err, SessionError::RatingSubmissionFailed(_)));
    }

    #[tokio::test]
    async fn auth_errors_surface_as_auth_required() {
        let (coordinator, _store, service, _events) = setup(2);
        service.push_receipt(Err(SessionError::AuthRequired));

        assert_eq!(coordinator.rate("t0", 5).await.unwrap_err(), SessionError::AuthRequired);
    }

    #[tokio::test]
    async fn rerating_does_not_double_count() {
        let (coordinator, store, _service, _events) = setup(5);
        coordinator.rate("t1", 3).await.unwrap();
        let session = coordinator.rate("t1", 9).await.unwrap();

        assert_eq!(session.rated_tracks, 1);
        assert_eq!(store.lock().await.average_rating(), Some(9.0));
    }

    #[tokio::test]
    async fn invalid_values_never_reach_the_server() {
        let (coordinator, store, service, _events) = setup(2);
        assert_eq!(coordinator.rate("t0", 0).await.unwrap_err(), SessionError::InvalidRating(0));
        assert_eq!(coordinator.rate("t0", 11).await.unwrap_err(), SessionError::InvalidRating(11));
        assert!(matches!(coordinator.rate("zz", 5).await.unwrap_err(), SessionError::UnknownTrack(_)));
        assert!(service.submitted().is_empty());
        assert_eq!(store.lock().await.session().rated_tracks, 0);
    }
}
