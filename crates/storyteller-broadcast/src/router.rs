//! Room registry and fan-out.

use std::collections::HashMap;

use storyteller_timeline::model::Inject;
use tokio::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::frames::{OperatorFrame, OperatorStateView, ViewerFrame, ViewerInject};

/// Per-channel buffer. Slow consumers that fall further behind than this
/// miss frames rather than stalling the session.
const ROOM_CHANNEL_CAPACITY: usize = 1024;

/// Identifies one viewer room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// The unfiltered room: receives every delivered inject.
    AllAccess,
    /// A per-viewer-category room.
    Category(String),
}

struct Room {
    tx: broadcast::Sender<ViewerFrame>,
    /// The last inject actually delivered to this room. Basis for silent
    /// suppression and reconnect catch-up.
    projection: Option<ViewerInject>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        Self {
            tx,
            projection: None,
        }
    }
}

struct Inner {
    operator_tx: broadcast::Sender<OperatorFrame>,
    rooms: HashMap<RoomKey, Room>,
}

/// Routes playback state to the operator room and to per-category viewer
/// rooms, keeping one projection per viewer room.
///
/// Projections advance on every delivery whether or not anyone is
/// connected, so a client joining late catches up to what its room was
/// last allowed to see, not to the operator's true position.
pub struct BroadcastRouter {
    inner: Mutex<Inner>,
}

impl Default for BroadcastRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastRouter {
    /// Creates a router with an operator room and an all-access room.
    #[must_use]
    pub fn new() -> Self {
        let (operator_tx, _) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        let mut rooms = HashMap::new();
        rooms.insert(RoomKey::AllAccess, Room::new());
        Self {
            inner: Mutex::new(Inner { operator_tx, rooms }),
        }
    }

    /// Clears every projection and ensures a room exists per registered
    /// category. Called when the active timeline changes.
    pub async fn reset_session<I>(&self, categories: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut inner = self.inner.lock().await;
        for room in inner.rooms.values_mut() {
            room.projection = None;
        }
        for label in categories {
            inner
                .rooms
                .entry(RoomKey::Category(label))
                .or_insert_with(Room::new);
        }
    }

    /// Fans a displayed inject out to every room allowed to see it.
    ///
    /// The all-access room always receives it; a category room receives it
    /// iff the inject's visibility set is empty or contains the category.
    /// Rooms that may not see it receive nothing at all, and their
    /// projections stay untouched. A room already projecting this inject id
    /// is skipped. Returns the number of rooms delivered to.
    pub async fn deliver(&self, inject: &Inject) -> usize {
        let payload = ViewerInject::from(inject);
        let mut delivered = 0;

        let mut inner = self.inner.lock().await;
        for (key, room) in &mut inner.rooms {
            let visible = match key {
                RoomKey::AllAccess => true,
                RoomKey::Category(label) => inject.is_visible_to(label),
            };
            if !visible {
                continue;
            }
            if room.projection.as_ref().is_some_and(|p| p.id == inject.id) {
                continue;
            }
            room.projection = Some(payload.clone());
            // A send error only means the room has no connected clients;
            // the projection update above is what late joiners read.
            let _ = room.tx.send(ViewerFrame::Inject {
                inject: payload.clone(),
            });
            delivered += 1;
        }
        debug!(inject_id = %inject.id, delivered, "delivered inject to rooms");
        delivered
    }

    /// Pushes full runtime state to the operator room.
    pub async fn operator_push(&self, state: OperatorStateView) {
        let inner = self.inner.lock().await;
        let _ = inner.operator_tx.send(OperatorFrame::State { state });
    }

    /// Emits a once-per-second countdown frame to the operator room.
    pub async fn emit_tick(&self, playing: bool, remaining_seconds: u32) {
        let inner = self.inner.lock().await;
        let _ = inner.operator_tx.send(OperatorFrame::Tick {
            playing,
            remaining_seconds,
        });
    }

    /// Joins a viewer room, creating it on first use.
    ///
    /// Returns the catch-up frame (the room's projection, or an explicit
    /// no-content-yet signal) together with the live subscription.
    pub async fn join(&self, key: RoomKey) -> (ViewerFrame, broadcast::Receiver<ViewerFrame>) {
        let mut inner = self.inner.lock().await;
        let room = inner.rooms.entry(key).or_insert_with(Room::new);
        let catch_up = room
            .projection
            .clone()
            .map_or(ViewerFrame::NoContentYet, |inject| ViewerFrame::Inject {
                inject,
            });
        (catch_up, room.tx.subscribe())
    }

    /// Joins the operator room.
    pub async fn join_operator(&self) -> broadcast::Receiver<OperatorFrame> {
        let inner = self.inner.lock().await;
        inner.operator_tx.subscribe()
    }
}
