//! Runtime state owned by the playback engine.
//!
//! Everything here lives only for the duration of one timeline activation
//! and is discarded, not persisted, when the active timeline changes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where playback currently points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Position {
    /// On the main sequence at the given canonical main index.
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

/// Navigation state for one activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavState {
    /// Current position; unset while the main sequence is empty.
    pub position: Option<Position>,
    /// Branch ids currently armed.
    pub active_branches: BTreeSet<Uuid>,
    /// Auto-trigger branches that already fired during this activation.
    /// An auto-trigger branch fires at most once per activation.
    pub triggered: BTreeSet<Uuid>,
}

/// Countdown state tied to the currently displayed inject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Whether auto-advance is running.
    pub playing: bool,
    /// Seconds left before the next automatic advance. A displayed inject
    /// with duration 0 leaves this at 0, which stalls auto-advance until
    /// the operator navigates manually.
    pub remaining_seconds: u32,
}
