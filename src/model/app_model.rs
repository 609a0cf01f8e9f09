//! UI state shared between the input handler and the renderer

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

const ERROR_DISPLAY_SECS: u64 = 5;

/// UI state for the application
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub selected: usize,
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub show_help_popup: bool,
    pub device_ready: bool,
}

/// Main application model containing UI state
#[derive(Clone)]
pub struct AppModel {
    pub ui_state: Arc<Mutex<UiState>>,
    pub should_quit: Arc<Mutex<bool>>,
}

impl AppModel {
    pub fn new() -> Self {
        Self {
            ui_state: Arc::new(Mutex::new(UiState::default())),
            should_quit: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn get_ui_state(&self) -> UiState {
        self.ui_state.lock().await.clone()
    }

    pub async fn should_quit(&self) -> bool {
        *self.should_quit.lock().await
    }

    pub async fn set_should_quit(&self, quit: bool) {
        *self.should_quit.lock().await = quit;
    }

    pub async fn selected_index(&self) -> usize {
        self.ui_state.lock().await.selected
    }

    pub async fn move_selection_up(&self) {
        let mut state = self.ui_state.lock().await;
        state.selected = state.selected.saturating_sub(1);
    }

    pub async fn move_selection_down(&self, track_count: usize) {
        let mut state = self.ui_state.lock().await;
        if state.selected + 1 < track_count {
            state.selected += 1;
        }
    }

    pub async fn set_device_ready(&self, ready: bool) {
        self.ui_state.lock().await.device_ready = ready;
    }

    // ========================================================================
    // Errors & popups
    // ========================================================================

    pub async fn set_error(&self, message: String) {
        let mut state = self.ui_state.lock().await;
        state.error_message = Some(message);
        state.error_timestamp = Some(Instant::now());
    }

    pub async fn clear_error(&self) {
        let mut state = self.ui_state.lock().await;
        state.error_message = None;
        state.error_timestamp = None;
    }

    pub async fn has_error(&self) -> bool {
        self.ui_state.lock().await.error_message.is_some()
    }

    pub async fn auto_clear_old_errors(&self) {
        let mut state = self.ui_state.lock().await;
        if let Some(timestamp) = state.error_timestamp {
            if timestamp.elapsed().as_secs() > ERROR_DISPLAY_SECS {
                state.error_message = None;
                state.error_timestamp = None;
            }
        }
    }

    pub async fn toggle_help_popup(&self) {
        let mut state = self.ui_state.lock().await;
        state.show_help_popup = !state.show_help_popup;
    }

    pub async fn is_help_popup_open(&self) -> bool {
        self.ui_state.lock().await.show_help_popup
    }
}

impl Default for AppModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn selection_stays_in_bounds() {
        let model = AppModel::new();
        model.move_selection_up().await;
        assert_eq!(model.selected_index().await, 0);

        for _ in 0..10 {
            model.move_selection_down(3).await;
        }
        assert_eq!(model.selected_index().await, 2);
    }

    #[tokio::test]
    async fn errors_can_be_dismissed() {
        let model = AppModel::new();
        model.set_error("boom".into()).await;
        assert!(model.has_error().await);
        model.auto_clear_old_errors().await;
        assert!(model.has_error().await);
        model.clear_error().await;
        assert!(!model.has_error().await);
    }
}
