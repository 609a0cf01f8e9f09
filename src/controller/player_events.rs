//! Connect device event listener

use tokio::sync::mpsc;

use crate::audio::DeviceEvent;
use super::AppController;

impl AppController {
    pub fn start_device_event_listener(&self, mut device_events: mpsc::UnboundedReceiver<DeviceEvent>) {
        let controller = self.clone();
        tracing::info!("Starting Connect device event listener");

        tokio::spawn(async move {
            while let Some(event) = device_events.recv().await {
                if controller.model.should_quit().await {
                    tracing::debug!("Device event listener shutting down");
                    break;
                }
                controller.handle_device_event(event).await;
            }
        });
    }

    pub(crate) async fn handle_device_event(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Ready { device_id } => {
                self.session.devices().on_device_ready(device_id).await;
            }
            DeviceEvent::NotReady => {
                self.session.devices().on_device_not_ready().await;
            }
            DeviceEvent::StateChanged(state) => {
                tracing::trace!(?state, "DeviceEvent::StateChanged");
                self.session.playback().on_remote_state_changed(state).await;
            }
        }
    }
}
