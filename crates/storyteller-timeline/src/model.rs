//! Content model for a storyline timeline.
//!
//! A [`Timeline`] is a main sequence of [`Inject`]s plus a set of
//! [`Branch`]es, each attached to one main inject. All of this is content:
//! it is owned by the store and immutable from the playback engine's
//! perspective.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use storyteller_core::error::StoreError;
use uuid::Uuid;

/// One displayable content unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inject {
    /// Inject identifier.
    pub id: Uuid,
    /// Short heading shown above the body.
    pub heading: String,
    /// Body text.
    #[serde(default)]
    pub body: String,
    /// Operator-private notes. Never sent to viewers.
    #[serde(default)]
    pub notes: String,
    /// Auto-advance duration in seconds. 0 means manual-only.
    #[serde(default)]
    pub duration_seconds: u32,
    /// Optional in-fiction day number.
    #[serde(default)]
    pub day: Option<u32>,
    /// Optional in-fiction time label (free text, e.g. "08:30").
    #[serde(default)]
    pub time_label: Option<String>,
    /// Optional image reference (opaque string, e.g. a data URI).
    #[serde(default)]
    pub image: Option<String>,
    /// Viewer-category labels this inject is restricted to.
    /// Empty means visible to every category.
    #[serde(default)]
    pub visibility: BTreeSet<String>,
}

impl Inject {
    /// Creates an inject with the given heading and all other fields empty.
    #[must_use]
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            heading: heading.into(),
            body: String::new(),
            notes: String::new(),
            duration_seconds: 0,
            day: None,
            time_label: None,
            image: None,
            visibility: BTreeSet::new(),
        }
    }

    /// Whether this inject may be shown to the given viewer category.
    #[must_use]
    pub fn is_visible_to(&self, category: &str) -> bool {
        self.visibility.is_empty() || self.visibility.contains(category)
    }
}

/// A side-sequence attached to one main inject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Branch identifier.
    pub id: Uuid,
    /// The main inject this branch hangs off.
    pub parent_inject_id: Uuid,
    /// Display name.
    pub name: String,
    /// Entered automatically when the parent inject is reached.
    #[serde(default)]
    pub auto_trigger: bool,
    /// Main index at which the main sequence resumes after the branch.
    /// Must be strictly greater than the parent's main index.
    #[serde(default)]
    pub merge_target_index: Option<usize>,
    /// Branch-local ordered inject list.
    #[serde(default)]
    pub injects: Vec<Inject>,
}

/// The full narrative structure for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    /// Timeline identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// The main sequence; index into this list is the canonical main index.
    #[serde(default)]
    pub injects: Vec<Inject>,
    /// Branches keyed by their parent inject.
    #[serde(default)]
    pub branches: Vec<Branch>,
}

impl Timeline {
    /// Creates an empty timeline with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            injects: Vec::new(),
            branches: Vec::new(),
        }
    }

    /// Number of injects in the main sequence.
    #[must_use]
    pub fn main_len(&self) -> usize {
        self.injects.len()
    }

    /// The main-sequence inject at `index`, if any.
    #[must_use]
    pub fn inject_at(&self, index: usize) -> Option<&Inject> {
        self.injects.get(index)
    }

    /// Looks up a branch by id.
    #[must_use]
    pub fn branch(&self, branch_id: Uuid) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == branch_id)
    }

    /// The main index of a branch's parent inject, if the parent still
    /// exists in the main sequence.
    #[must_use]
    pub fn parent_index(&self, branch: &Branch) -> Option<usize> {
        self.injects
            .iter()
            .position(|i| i.id == branch.parent_inject_id)
    }

    /// All branches attached to the main inject at `index`.
    pub fn branches_at(&self, index: usize) -> impl Iterator<Item = &Branch> {
        let parent_id = self.inject_at(index).map(|i| i.id);
        self.branches
            .iter()
            .filter(move |b| Some(b.parent_inject_id) == parent_id)
    }

    /// The auto-trigger branch attached to the main inject at `index`,
    /// if one exists. The cardinality invariant guarantees at most one.
    #[must_use]
    pub fn auto_branch_at(&self, index: usize) -> Option<&Branch> {
        self.branches_at(index).find(|b| b.auto_trigger)
    }

    /// Validates that `branch` may be added to (or updated within) this
    /// timeline without breaking the structural invariants.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the parent inject is not on the
    /// main sequence, if the branch-cardinality invariant would break (one
    /// auto-trigger branch per parent, and never mixed with other
    /// branches), or if the merge target is not strictly after the parent.
    pub fn validate_branch(&self, branch: &Branch) -> Result<(), StoreError> {
        let Some(parent_idx) = self
            .injects
            .iter()
            .position(|i| i.id == branch.parent_inject_id)
        else {
            return Err(StoreError::Validation(format!(
                "parent inject {} is not on the main sequence",
                branch.parent_inject_id
            )));
        };

        let siblings: Vec<&Branch> = self
            .branches
            .iter()
            .filter(|b| b.parent_inject_id == branch.parent_inject_id && b.id != branch.id)
            .collect();

        if branch.auto_trigger && !siblings.is_empty() {
            return Err(StoreError::Validation(
                "an auto-trigger branch must be the only branch on its parent".to_owned(),
            ));
        }
        if !branch.auto_trigger && siblings.iter().any(|b| b.auto_trigger) {
            return Err(StoreError::Validation(
                "parent inject already carries an auto-trigger branch".to_owned(),
            ));
        }

        if let Some(target) = branch.merge_target_index {
            if target <= parent_idx {
                return Err(StoreError::Validation(format!(
                    "merge target {target} must be strictly after parent index {parent_idx}"
                )));
            }
            if target >= self.injects.len() {
                return Err(StoreError::Validation(format!(
                    "merge target {target} is beyond the main sequence"
                )));
            }
        }

        Ok(())
    }
}
