//! In-memory `ContentStore` fake.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use storyteller_core::error::StoreError;
use storyteller_timeline::model::Timeline;
use storyteller_timeline::store::ContentStore;
use uuid::Uuid;

/// A `ContentStore` backed by a plain map, for tests.
#[derive(Default)]
pub struct InMemoryContentStore {
    timelines: Mutex<HashMap<Uuid, Timeline>>,
    categories: Mutex<Vec<String>>,
}

impl InMemoryContentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given timeline.
    #[must_use]
    pub fn with_timeline(timeline: Timeline) -> Self {
        let store = Self::new();
        store.insert(timeline);
        store
    }

    /// Adds or replaces a timeline.
    pub fn insert(&self, timeline: Timeline) {
        self.timelines
            .lock()
            .expect("store lock")
            .insert(timeline.id, timeline);
    }

    /// Removes a timeline, simulating concurrent deletion.
    pub fn remove(&self, timeline_id: Uuid) {
        self.timelines
            .lock()
            .expect("store lock")
            .remove(&timeline_id);
    }

    /// Replaces the registered viewer categories.
    pub fn set_categories(&self, categories: Vec<String>) {
        *self.categories.lock().expect("store lock") = categories;
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn snapshot(&self, timeline_id: Uuid) -> Result<Timeline, StoreError> {
        self.timelines
            .lock()
            .expect("store lock")
            .get(&timeline_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("timeline {timeline_id}")))
    }

    async fn viewer_categories(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.categories.lock().expect("store lock").clone())
    }
}
