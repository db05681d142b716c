//! On-disk document shape.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyteller_timeline::model::Timeline;
use uuid::Uuid;

/// The entire persisted state: every storyline plus the viewer-category
/// registry. Runtime position and playback state are never stored here.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Document {
    /// All storylines, keyed by id.
    #[serde(default)]
    pub storylines: HashMap<Uuid, Timeline>,
    /// Registered viewer-category labels.
    #[serde(default)]
    pub viewer_categories: Vec<String>,
    /// Join-link tokens, token to category label.
    #[serde(default)]
    pub viewer_links: HashMap<String, String>,
    /// When the document was last written.
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

/// One row of the storyline listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorylineSummary {
    /// Storyline identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Number of injects on the main sequence.
    pub inject_count: usize,
    /// Number of attached branches.
    pub branch_count: usize,
}

/// A viewer join link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryLink {
    /// The viewer-category label the link resolves to.
    pub category: String,
    /// URL-safe opaque token.
    pub token: String,
}
