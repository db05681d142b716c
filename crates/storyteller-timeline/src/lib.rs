//! StoryTeller Timeline — content model and store contract.
//!
//! The playback engine never mutates content; it reads immutable
//! [`model::Timeline`] snapshots through the [`store::ContentStore`] trait
//! and keeps its own runtime position separately.

pub mod model;
pub mod store;
