//! Content store contract.

use async_trait::async_trait;
use storyteller_core::error::StoreError;
use uuid::Uuid;

use crate::model::Timeline;

/// Read-side contract between the content store and the playback engine.
///
/// The engine only ever reads immutable snapshots; content mutation goes
/// through the store implementation's own API and never through the engine.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Returns an immutable snapshot of the timeline's current structure.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no timeline with that id exists.
    async fn snapshot(&self, timeline_id: Uuid) -> Result<Timeline, StoreError>;

    /// Returns the registered viewer-category labels.
    async fn viewer_categories(&self) -> Result<Vec<String>, StoreError>;
}
