//! StoryTeller Broadcast — room-filtered fan-out of playback state.
//!
//! One logical room exists per viewer-category label, plus an all-access
//! room and an operator room. Each viewer room caches the last inject it
//! actually delivered (its projection); an inject a room is not allowed to
//! see is silently withheld, so the room's clients keep their current view
//! with no signal that anything happened. Late joiners catch up from the
//! projection, not from the operator's true position.

pub mod frames;
pub mod router;

pub use frames::{OperatorFrame, OperatorStateView, PositionView, ViewerFrame, ViewerInject};
pub use router::{BroadcastRouter, RoomKey};
