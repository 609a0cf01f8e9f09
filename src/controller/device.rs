//! Remote device session manager

use std::sync::Arc;
use tokio::sync::RwLock;

use super::events::{EventBus, SessionEvent};
use crate::error::{SessionError, SessionResult};
use crate::model::{DeviceSession, RemotePlayback};

/// Sole owner of the [`DeviceSession`]
#[derive(Clone)]
pub struct DeviceSessionManager {
    session: Arc<RwLock<DeviceSession>>,
    remote: Option<Arc<dyn RemotePlayback>>,
    events: EventBus,
}

impl DeviceSessionManager {
    pub fn new(remote: Option<Arc<dyn RemotePlayback>>, events: EventBus) -> Self {
        Self {
            session: Arc::new(RwLock::new(DeviceSession::default())),
            remote,
            events,
        }
    }

    /// Store the device, mark it ready and bind playback to it.
    ///
    /// A failed transfer is only logged; the next play attempt retries it.
    pub async fn on_device_ready(&self, device_id: String) {
        {
            let mut session = self.session.write().await;
            session.device_id = Some(device_id.clone());
            session.ready = true;
        }
        tracing::info!(device_id = %device_id, "Remote device ready");
        self.events.emit(SessionEvent::DeviceReady { device_id: device_id.clone() });

        if let Err(e) = self.transfer(&device_id).await {
            tracing::warn!(error = %e, device_id = %device_id, "Initial playback transfer failed, will retry on play");
        }
    }

    pub async fn on_device_not_ready(&self) {
        let previous = {
            let mut session = self.session.write().await;
            session.ready = false;
            session.device_id.take()
        };
        tracing::info!(device_id = ?previous, "Remote device went offline");
        self.events.emit(SessionEvent::DeviceLost);
    }

    /// Bind playback to `device_id`. Idempotent.
    pub async fn transfer(&self, device_id: &str) -> SessionResult<()> {
        let remote = self
            .remote
            .as_ref()
            .ok_or_else(|| SessionError::DeviceUnavailable("remote playback is not available".into()))?;

        match remote.transfer(device_id).await {
            Ok(()) => {
                tracing::info!(device_id, "Playback transferred to device");
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, device_id, "Transfer failed");
                Err(e)
            }
        }
    }

    /// Id of the device if it is ready for commands
    pub async fn ready_device(&self) -> Option<String> {
        let session = self.session.read().await;
        if session.ready && self.remote.is_some() {
            session.device_id.clone()
        } else {
            None
        }
    }

    /// True while `device_id` is still the bound, ready device
    pub async fn is_current(&self, device_id: &str) -> bool {
        let session = self.session.read().await;
        session.ready && session.device_id.as_deref() == Some(device_id)
    }

    #[cfg(test)]
    pub async fn snapshot(&self) -> DeviceSession {
        self.session.read().await.clone()
    }
}
