//! The session controller.
//!
//! Owns the single active timeline's runtime state. Operator commands,
//! timer ticks, and activation all serialize through one lock, so no two
//! navigation transitions ever interleave and each transition plus its
//! broadcast is atomic for observers.

use std::sync::Arc;

use serde::Serialize;
use storyteller_broadcast::frames::{OperatorStateView, PositionView};
use storyteller_broadcast::router::BroadcastRouter;
use storyteller_core::error::PlaybackError;
use storyteller_timeline::model::Timeline;
use storyteller_timeline::store::ContentStore;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::{NavCommand, SessionCommand};
use crate::engine::{self, NavOutcome};
use crate::state::{NavState, PlaybackState, Position};
use crate::timer;

/// What a handled command did, reported back to the issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAck {
    /// The position changed and was broadcast.
    Moved,
    /// Boundary no-op at the end of the main sequence.
    AtEnd,
    /// Boundary no-op at the start of the main sequence.
    AtStart,
    /// Branch arming changed.
    ArmingChanged,
    /// A timeline was activated and its runtime reset.
    TimelineActivated,
    /// The playing flag was set.
    PlayingSet,
}

#[derive(Debug, Default)]
struct Runtime {
    timeline_id: Option<Uuid>,
    nav: NavState,
    playback: PlaybackState,
    /// Bumped on every (de)activation; running timer tasks exit when their
    /// epoch goes stale.
    epoch: u64,
}

/// Serializes all session mutation and feeds results to the router.
pub struct SessionController {
    store: Arc<dyn ContentStore>,
    router: Arc<BroadcastRouter>,
    runtime: Mutex<Runtime>,
}

impl SessionController {
    /// Creates a controller with no active timeline.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, router: Arc<BroadcastRouter>) -> Self {
        Self {
            store,
            router,
            runtime: Mutex::new(Runtime::default()),
        }
    }

    /// The router this controller broadcasts through.
    #[must_use]
    pub fn router(&self) -> &Arc<BroadcastRouter> {
        &self.router
    }

    /// Handles one operator command.
    ///
    /// # Errors
    ///
    /// Propagates the engine's error taxonomy; `NoContent` is also returned
    /// when no timeline is active or its snapshot has vanished.
    pub async fn apply(self: &Arc<Self>, command: SessionCommand) -> Result<CommandAck, PlaybackError> {
        match command {
            SessionCommand::ActivateTimeline { timeline_id } => {
                self.activate_timeline(timeline_id).await
            }
            SessionCommand::SetPlaying { playing } => self.set_playing(playing).await,
            nav => {
                let nav_command = nav.as_nav().ok_or_else(|| {
                    PlaybackError::InvalidOperation("unsupported command".to_owned())
                })?;
                let mut runtime = self.runtime.lock().await;
                self.navigate_locked(&mut runtime, nav_command).await
            }
        }
    }

    /// Activates a timeline, resetting runtime state to its start and
    /// restarting the playback timer.
    async fn activate_timeline(
        self: &Arc<Self>,
        timeline_id: Uuid,
    ) -> Result<CommandAck, PlaybackError> {
        let snapshot = self.store.snapshot(timeline_id).await.map_err(|e| {
            PlaybackError::InvalidOperation(format!("cannot activate timeline: {e}"))
        })?;
        let categories = match self.store.viewer_categories().await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "viewer categories unavailable; rooms start empty");
                Vec::new()
            }
        };

        let mut runtime = self.runtime.lock().await;
        runtime.epoch += 1;
        runtime.timeline_id = Some(timeline_id);
        runtime.nav = NavState::default();
        if snapshot.main_len() > 0 {
            runtime.nav.position = Some(Position::OnMain { index: 0 });
        }
        runtime.playback = PlaybackState {
            playing: false,
            remaining_seconds: displayed_duration(&snapshot, &runtime.nav),
        };

        self.router.reset_session(categories).await;
        self.broadcast_position(&snapshot, &runtime).await;
        info!(timeline_id = %timeline_id, "timeline activated");

        let epoch = runtime.epoch;
        drop(runtime);
        tokio::spawn(timer::run(Arc::clone(self), epoch));
        Ok(CommandAck::TimelineActivated)
    }

    /// Clears runtime state if the given timeline is the active one.
    /// Called when the timeline is deleted out from under the session.
    pub async fn deactivate_timeline(&self, timeline_id: Uuid) {
        let mut runtime = self.runtime.lock().await;
        if runtime.timeline_id != Some(timeline_id) {
            return;
        }
        self.clear_locked(&mut runtime).await;
        info!(timeline_id = %timeline_id, "timeline deactivated");
    }

    async fn set_playing(&self, playing: bool) -> Result<CommandAck, PlaybackError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.timeline_id.is_none() {
            return Err(PlaybackError::NoContent);
        }
        runtime.playback.playing = playing;
        self.router
            .emit_tick(playing, runtime.playback.remaining_seconds)
            .await;
        Ok(CommandAck::PlayingSet)
    }

    /// Handles one 1-second timer tick. Returns false when the tick's
    /// epoch is stale and the calling timer task should exit.
    pub async fn handle_tick(self: &Arc<Self>, epoch: u64) -> bool {
        let mut runtime = self.runtime.lock().await;
        if runtime.epoch != epoch || runtime.timeline_id.is_none() {
            return false;
        }
        if !runtime.playback.playing {
            return true;
        }

        if runtime.playback.remaining_seconds > 0 {
            runtime.playback.remaining_seconds -= 1;
            if runtime.playback.remaining_seconds == 0 {
                // Countdown elapsed: advance. AtEnd stalls the countdown
                // but leaves the playing flag alone; the next manual
                // navigation restarts it.
                let _ = self.navigate_locked(&mut runtime, NavCommand::Advance).await;
            }
        }

        self.router
            .emit_tick(runtime.playback.playing, runtime.playback.remaining_seconds)
            .await;
        true
    }

    /// Current runtime state for the operator, used as join catch-up.
    pub async fn status(&self) -> OperatorStateView {
        let runtime = self.runtime.lock().await;
        let snapshot = match runtime.timeline_id {
            Some(id) => self.store.snapshot(id).await.ok(),
            None => None,
        };
        state_view(snapshot.as_ref(), &runtime)
    }

    /// The current activation epoch. Timer tasks carry the epoch they were
    /// spawned with and exit once it goes stale.
    pub async fn current_epoch(&self) -> u64 {
        self.runtime.lock().await.epoch
    }

    async fn navigate_locked(
        &self,
        runtime: &mut Runtime,
        command: NavCommand,
    ) -> Result<CommandAck, PlaybackError> {
        let Some(timeline_id) = runtime.timeline_id else {
            return Err(PlaybackError::NoContent);
        };
        let snapshot = match self.store.snapshot(timeline_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // The content vanished between commands. Clear the session
                // rather than crash it.
                warn!(timeline_id = %timeline_id, error = %e, "active timeline lost");
                self.clear_locked(runtime).await;
                return Err(PlaybackError::NoContent);
            }
        };

        let (next, outcome) = engine::transition(&snapshot, &runtime.nav, command)?;
        runtime.nav = next;

        match outcome {
            NavOutcome::Moved => {
                runtime.playback.remaining_seconds = displayed_duration(&snapshot, &runtime.nav);
                self.broadcast_position(&snapshot, runtime).await;
                Ok(CommandAck::Moved)
            }
            NavOutcome::ArmingChanged => {
                // Arming is operator-only state; viewers keep their view.
                self.router
                    .operator_push(state_view(Some(&snapshot), runtime))
                    .await;
                Ok(CommandAck::ArmingChanged)
            }
            NavOutcome::AtEnd => {
                self.router
                    .operator_push(state_view(Some(&snapshot), runtime))
                    .await;
                Ok(CommandAck::AtEnd)
            }
            NavOutcome::AtStart => {
                self.router
                    .operator_push(state_view(Some(&snapshot), runtime))
                    .await;
                Ok(CommandAck::AtStart)
            }
        }
    }

    /// Delivers the displayed inject to viewer rooms and pushes full state
    /// to the operator room.
    async fn broadcast_position(&self, snapshot: &Timeline, runtime: &Runtime) {
        if let Some(position) = runtime.nav.position {
            if let Some(inject) = engine::displayed_inject(snapshot, position) {
                self.router.deliver(inject).await;
            }
        }
        self.router
            .operator_push(state_view(Some(snapshot), runtime))
            .await;
    }

    async fn clear_locked(&self, runtime: &mut Runtime) {
        runtime.epoch += 1;
        runtime.timeline_id = None;
        runtime.nav = NavState::default();
        runtime.playback = PlaybackState::default();
        self.router.operator_push(state_view(None, runtime)).await;
    }
}

fn displayed_duration(snapshot: &Timeline, nav: &NavState) -> u32 {
    nav.position
        .and_then(|p| engine::displayed_inject(snapshot, p))
        .map_or(0, |inject| inject.duration_seconds)
}

fn state_view(snapshot: Option<&Timeline>, runtime: &Runtime) -> OperatorStateView {
    let position = runtime.nav.position.map(|p| match p {
        Position::OnMain { index } => PositionView::OnMain { index },
        Position::InBranch { branch_id, index } => PositionView::InBranch { branch_id, index },
    });
    let displayed = snapshot.and_then(|timeline| {
        runtime
            .nav
            .position
            .and_then(|p| engine::displayed_inject(timeline, p))
            .cloned()
    });
    OperatorStateView {
        timeline_id: runtime.timeline_id,
        position,
        displayed,
        active_branches: runtime.nav.active_branches.iter().copied().collect(),
        playing: runtime.playback.playing,
        remaining_seconds: runtime.playback.remaining_seconds,
    }
}
