//! The JSON-document content store.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storyteller_core::clock::Clock;
use storyteller_core::error::StoreError;
use storyteller_timeline::model::{Branch, Inject, Timeline};
use storyteller_timeline::store::ContentStore;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::{CategoryLink, Document, StorylineSummary};

const DOCUMENT_FILE: &str = "storylines.json";

/// Editable fields of an inject; the id is never changed after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InjectFields {
    /// Heading.
    pub heading: String,
    /// Body text.
    #[serde(default)]
    pub body: String,
    /// Operator-private notes.
    #[serde(default)]
    pub notes: String,
    /// Auto-advance duration in seconds.
    #[serde(default)]
    pub duration_seconds: u32,
    /// Optional day number.
    #[serde(default)]
    pub day: Option<u32>,
    /// Optional time label.
    #[serde(default)]
    pub time_label: Option<String>,
    /// Optional image reference.
    #[serde(default)]
    pub image: Option<String>,
    /// Viewer-category visibility set; empty means everyone.
    #[serde(default)]
    pub visibility: BTreeSet<String>,
}

impl InjectFields {
    fn apply_to(&self, inject: &mut Inject) {
        inject.heading = self.heading.clone();
        inject.body = self.body.clone();
        inject.notes = self.notes.clone();
        inject.duration_seconds = self.duration_seconds;
        inject.day = self.day;
        inject.time_label = self.time_label.clone();
        inject.image = self.image.clone();
        inject.visibility = self.visibility.clone();
    }

    fn into_inject(self) -> Inject {
        let mut inject = Inject::new(self.heading.clone());
        self.apply_to(&mut inject);
        inject
    }
}

/// Structural fields of a branch; injects are managed separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBranch {
    /// The main inject the branch hangs off.
    pub parent_inject_id: Uuid,
    /// Display name.
    pub name: String,
    /// Entered automatically when the parent is reached.
    #[serde(default)]
    pub auto_trigger: bool,
    /// Optional merge-back main index.
    #[serde(default)]
    pub merge_target_index: Option<usize>,
}

/// Content store persisting every storyline in one JSON document.
pub struct JsonContentStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
    document: RwLock<Document>,
}

impl JsonContentStore {
    /// Opens (or initializes) the document under `data_dir`.
    ///
    /// A corrupt document is logged and replaced with an empty one rather
    /// than refusing to start.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the data directory cannot be created or
    /// the document cannot be read.
    pub async fn open(
        data_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::Io(format!("creating {}: {e}", data_dir.display())))?;
        let path = data_dir.join(DOCUMENT_FILE);

        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(document) => document,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt document; starting empty");
                    Document::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(StoreError::Io(format!("reading {}: {e}", path.display()))),
        };

        info!(path = %path.display(), storylines = document.storylines.len(), "content store opened");
        Ok(Self {
            path,
            clock,
            document: RwLock::new(document),
        })
    }

    async fn persist(&self, document: &mut Document) -> Result<(), StoreError> {
        document.saved_at = Some(self.clock.now());
        let bytes = serde_json::to_vec_pretty(&*document)
            .map_err(|e| StoreError::Io(format!("serializing document: {e}")))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| StoreError::Io(format!("writing {}: {e}", self.path.display())))
    }

    /// Runs a mutation against the document and writes it back.
    async fn mutate<T>(
        &self,
        mutation: impl FnOnce(&mut Document) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut document = self.document.write().await;
        let value = mutation(&mut document)?;
        self.persist(&mut document).await?;
        Ok(value)
    }

    // ---- storylines ----

    /// Lists all storylines.
    pub async fn list_storylines(&self) -> Vec<StorylineSummary> {
        let document = self.document.read().await;
        let mut summaries: Vec<StorylineSummary> = document
            .storylines
            .values()
            .map(|t| StorylineSummary {
                id: t.id,
                name: t.name.clone(),
                inject_count: t.injects.len(),
                branch_count: t.branches.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Creates an empty storyline.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an empty name.
    pub async fn create_storyline(&self, name: &str) -> Result<Timeline, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("storyline name is required".to_owned()));
        }
        let timeline = Timeline::new(name.trim());
        let created = timeline.clone();
        self.mutate(move |document| {
            document.storylines.insert(timeline.id, timeline);
            Ok(())
        })
        .await?;
        Ok(created)
    }

    /// Fetches one storyline.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if it does not exist.
    pub async fn storyline(&self, timeline_id: Uuid) -> Result<Timeline, StoreError> {
        self.document
            .read()
            .await
            .storylines
            .get(&timeline_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("storyline {timeline_id}")))
    }

    /// Renames a storyline.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::Validation`.
    pub async fn rename_storyline(&self, timeline_id: Uuid, name: &str) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("storyline name is required".to_owned()));
        }
        let name = name.trim().to_owned();
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            timeline.name = name;
            Ok(())
        })
        .await
    }

    /// Deletes a storyline.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if it does not exist.
    pub async fn delete_storyline(&self, timeline_id: Uuid) -> Result<(), StoreError> {
        self.mutate(move |document| {
            document
                .storylines
                .remove(&timeline_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(format!("storyline {timeline_id}")))
        })
        .await
    }

    // ---- injects ----

    /// Appends an inject to a storyline's main sequence.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown storyline.
    pub async fn create_inject(
        &self,
        timeline_id: Uuid,
        fields: InjectFields,
    ) -> Result<Inject, StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let inject = fields.into_inject();
            timeline.injects.push(inject.clone());
            Ok(inject)
        })
        .await
    }

    /// Updates an inject wherever it lives, on the main sequence or in a
    /// branch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown storyline or inject.
    pub async fn update_inject(
        &self,
        timeline_id: Uuid,
        inject_id: Uuid,
        fields: InjectFields,
    ) -> Result<Inject, StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let inject = timeline
                .injects
                .iter_mut()
                .chain(timeline.branches.iter_mut().flat_map(|b| b.injects.iter_mut()))
                .find(|i| i.id == inject_id)
                .ok_or_else(|| StoreError::NotFound(format!("inject {inject_id}")))?;
            fields.apply_to(inject);
            Ok(inject.clone())
        })
        .await
    }

    /// Deletes a main-sequence inject, cascading to the branches parented
    /// on it and scrubbing merge targets the removal invalidated.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown storyline or inject.
    pub async fn delete_inject(&self, timeline_id: Uuid, inject_id: Uuid) -> Result<(), StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let index = timeline
                .injects
                .iter()
                .position(|i| i.id == inject_id)
                .ok_or_else(|| StoreError::NotFound(format!("main inject {inject_id}")))?;
            timeline.injects.remove(index);
            timeline.branches.retain(|b| b.parent_inject_id != inject_id);

            // Merge targets are positional; removal shifted everything
            // after `index`, so re-check each one and drop those that no
            // longer point strictly past their parent.
            let injects = timeline.injects.clone();
            for branch in &mut timeline.branches {
                let Some(target) = branch.merge_target_index else {
                    continue;
                };
                let target = if target > index { target - 1 } else { target };
                let parent_idx = injects.iter().position(|i| i.id == branch.parent_inject_id);
                branch.merge_target_index = match parent_idx {
                    Some(parent_idx) if target > parent_idx && target < injects.len() => {
                        Some(target)
                    }
                    _ => None,
                };
            }
            Ok(())
        })
        .await
    }

    // ---- branches ----

    /// Creates a branch, enforcing the structural invariants.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown storyline, or
    /// `StoreError::Validation` if the branch violates the cardinality or
    /// merge-target rules.
    pub async fn create_branch(
        &self,
        timeline_id: Uuid,
        new: NewBranch,
    ) -> Result<Branch, StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let branch = Branch {
                id: Uuid::new_v4(),
                parent_inject_id: new.parent_inject_id,
                name: new.name.clone(),
                auto_trigger: new.auto_trigger,
                merge_target_index: new.merge_target_index,
                injects: Vec::new(),
            };
            timeline.validate_branch(&branch)?;
            timeline.branches.push(branch.clone());
            Ok(branch)
        })
        .await
    }

    /// Updates a branch's structural fields, enforcing the invariants.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` or `StoreError::Validation`.
    pub async fn update_branch(
        &self,
        timeline_id: Uuid,
        branch_id: Uuid,
        new: NewBranch,
    ) -> Result<Branch, StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let existing = timeline
                .branch(branch_id)
                .ok_or_else(|| StoreError::NotFound(format!("branch {branch_id}")))?;
            let mut updated = existing.clone();
            updated.parent_inject_id = new.parent_inject_id;
            updated.name = new.name.clone();
            updated.auto_trigger = new.auto_trigger;
            updated.merge_target_index = new.merge_target_index;
            timeline.validate_branch(&updated)?;

            let slot = timeline
                .branches
                .iter_mut()
                .find(|b| b.id == branch_id)
                .ok_or_else(|| StoreError::NotFound(format!("branch {branch_id}")))?;
            *slot = updated.clone();
            Ok(updated)
        })
        .await
    }

    /// Deletes a branch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown storyline or branch.
    pub async fn delete_branch(&self, timeline_id: Uuid, branch_id: Uuid) -> Result<(), StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let before = timeline.branches.len();
            timeline.branches.retain(|b| b.id != branch_id);
            if timeline.branches.len() == before {
                return Err(StoreError::NotFound(format!("branch {branch_id}")));
            }
            Ok(())
        })
        .await
    }

    /// Appends an inject to a branch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown storyline or branch.
    pub async fn create_branch_inject(
        &self,
        timeline_id: Uuid,
        branch_id: Uuid,
        fields: InjectFields,
    ) -> Result<Inject, StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let branch = timeline
                .branches
                .iter_mut()
                .find(|b| b.id == branch_id)
                .ok_or_else(|| StoreError::NotFound(format!("branch {branch_id}")))?;
            let inject = fields.into_inject();
            branch.injects.push(inject.clone());
            Ok(inject)
        })
        .await
    }

    /// Removes an inject from a branch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown storyline, branch, or
    /// inject.
    pub async fn delete_branch_inject(
        &self,
        timeline_id: Uuid,
        branch_id: Uuid,
        inject_id: Uuid,
    ) -> Result<(), StoreError> {
        self.mutate(move |document| {
            let timeline = storyline_mut(document, timeline_id)?;
            let branch = timeline
                .branches
                .iter_mut()
                .find(|b| b.id == branch_id)
                .ok_or_else(|| StoreError::NotFound(format!("branch {branch_id}")))?;
            let before = branch.injects.len();
            branch.injects.retain(|i| i.id != inject_id);
            if branch.injects.len() == before {
                return Err(StoreError::NotFound(format!("branch inject {inject_id}")));
            }
            Ok(())
        })
        .await
    }

    // ---- viewer categories ----

    /// Registers a viewer category and mints its join link.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for an empty or duplicate label.
    pub async fn add_category(&self, label: &str) -> Result<CategoryLink, StoreError> {
        let label = label.trim().to_owned();
        if label.is_empty() {
            return Err(StoreError::Validation("category label is required".to_owned()));
        }
        self.mutate(move |document| {
            if document.viewer_categories.contains(&label) {
                return Err(StoreError::Validation(format!(
                    "category '{label}' already exists"
                )));
            }
            document.viewer_categories.push(label.clone());
            let token = mint_token();
            document.viewer_links.insert(token.clone(), label.clone());
            Ok(CategoryLink {
                category: label,
                token,
            })
        })
        .await
    }

    /// Removes a viewer category, its join link, and every reference to it
    /// in inject visibility sets.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown label.
    pub async fn remove_category(&self, label: &str) -> Result<(), StoreError> {
        let label = label.to_owned();
        self.mutate(move |document| {
            let before = document.viewer_categories.len();
            document.viewer_categories.retain(|c| c != &label);
            if document.viewer_categories.len() == before {
                return Err(StoreError::NotFound(format!("category '{label}'")));
            }
            document.viewer_links.retain(|_, c| c != &label);
            for timeline in document.storylines.values_mut() {
                for inject in timeline
                    .injects
                    .iter_mut()
                    .chain(timeline.branches.iter_mut().flat_map(|b| b.injects.iter_mut()))
                {
                    inject.visibility.remove(&label);
                }
            }
            Ok(())
        })
        .await
    }

    /// All join links.
    pub async fn category_links(&self) -> Vec<CategoryLink> {
        let document = self.document.read().await;
        let mut links: Vec<CategoryLink> = document
            .viewer_links
            .iter()
            .map(|(token, category)| CategoryLink {
                category: category.clone(),
                token: token.clone(),
            })
            .collect();
        links.sort_by(|a, b| a.category.cmp(&b.category));
        links
    }

    /// Resolves a join-link token to its category label.
    pub async fn resolve_link(&self, token: &str) -> Option<String> {
        self.document.read().await.viewer_links.get(token).cloned()
    }
}

#[async_trait]
impl ContentStore for JsonContentStore {
    async fn snapshot(&self, timeline_id: Uuid) -> Result<Timeline, StoreError> {
        self.storyline(timeline_id).await
    }

    async fn viewer_categories(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.document.read().await.viewer_categories.clone())
    }
}

fn storyline_mut(document: &mut Document, timeline_id: Uuid) -> Result<&mut Timeline, StoreError> {
    document
        .storylines
        .get_mut(&timeline_id)
        .ok_or_else(|| StoreError::NotFound(format!("storyline {timeline_id}")))
}

fn mint_token() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..8].to_owned()
}
