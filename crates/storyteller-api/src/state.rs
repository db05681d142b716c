//! Shared application state.

use std::sync::Arc;

use storyteller_playback::controller::SessionController;
use storyteller_store::JsonContentStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The content store.
    pub store: Arc<JsonContentStore>,
    /// The session controller.
    pub controller: Arc<SessionController>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(store: Arc<JsonContentStore>, controller: Arc<SessionController>) -> Self {
        Self { store, controller }
    }
}
