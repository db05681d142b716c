//! Wire frames pushed to connected clients.

use serde::{Deserialize, Serialize};
use storyteller_timeline::model::Inject;
use uuid::Uuid;

/// Viewer-safe projection of an inject.
///
/// Carries only the fields a viewer may see; operator-private notes and the
/// visibility set never leave the server on a viewer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerInject {
    /// Inject identifier.
    pub id: Uuid,
    /// Heading.
    pub heading: String,
    /// Body text.
    pub body: String,
    /// Optional image reference.
    pub image: Option<String>,
    /// Auto-advance duration in seconds.
    pub duration_seconds: u32,
    /// Optional in-fiction day number.
    pub day: Option<u32>,
    /// Optional in-fiction time label.
    pub time_label: Option<String>,
}

impl From<&Inject> for ViewerInject {
    fn from(inject: &Inject) -> Self {
        Self {
            id: inject.id,
            heading: inject.heading.clone(),
            body: inject.body.clone(),
            image: inject.image.clone(),
            duration_seconds: inject.duration_seconds,
            day: inject.day,
            time_label: inject.time_label.clone(),
        }
    }
}

/// Frames delivered on viewer channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewerFrame {
    /// A new inject for this room.
    Inject {
        /// The inject to display.
        inject: ViewerInject,
    },
    /// Nothing has been delivered to this room yet.
    NoContentYet,
}

/// Serializable descriptor of the runtime position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionView {
    /// On the main sequence.
    OnMain {
        /// Canonical main index.
        index: usize,
    },
    /// Inside a branch.
    InBranch {
        /// The branch being displayed.
        branch_id: Uuid,
        /// Branch-local index.
        index: usize,
    },
}

/// Full runtime state pushed to the operator room on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorStateView {
    /// The active timeline, if any.
    pub timeline_id: Option<Uuid>,
    /// Current position descriptor.
    pub position: Option<PositionView>,
    /// The inject currently displayed, with operator-private fields.
    pub displayed: Option<Inject>,
    /// Branch ids currently armed.
    pub active_branches: Vec<Uuid>,
    /// Whether auto-advance is running.
    pub playing: bool,
    /// Seconds left on the current inject's countdown.
    pub remaining_seconds: u32,
}

/// Frames delivered on the operator channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorFrame {
    /// Full runtime state after a command or activation.
    State {
        /// The runtime state.
        state: OperatorStateView,
    },
    /// Once-per-second countdown notification.
    Tick {
        /// Whether auto-advance is running.
        playing: bool,
        /// Seconds left on the current inject's countdown.
        remaining_seconds: u32,
    },
}
