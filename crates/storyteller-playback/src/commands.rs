//! Operator commands.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A navigation command handled by the pure engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    /// Move forward one step (entering/continuing branches as required).
    Advance,
    /// Move backward one step (never auto-entering branches).
    Retreat,
    /// Reposition to a main index unconditionally.
    JumpToMain {
        /// Target main index.
        index: usize,
    },
    /// Reposition into a branch unconditionally.
    JumpToBranch {
        /// Target branch.
        branch_id: Uuid,
        /// Target branch-local index.
        index: usize,
    },
    /// Arm a manual branch.
    ActivateBranch {
        /// The branch to arm.
        branch_id: Uuid,
    },
    /// Disarm a manual branch.
    DeactivateBranch {
        /// The branch to disarm.
        branch_id: Uuid,
    },
}

/// A command received from the operator channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    /// Move forward one step.
    Advance,
    /// Move backward one step.
    Retreat,
    /// Reposition to a main index.
    JumpToMain {
        /// Target main index.
        index: usize,
    },
    /// Reposition into a branch.
    JumpToBranch {
        /// Target branch.
        branch_id: Uuid,
        /// Target branch-local index.
        index: usize,
    },
    /// Arm a manual branch.
    ActivateBranch {
        /// The branch to arm.
        branch_id: Uuid,
    },
    /// Disarm a manual branch.
    DeactivateBranch {
        /// The branch to disarm.
        branch_id: Uuid,
    },
    /// Start or pause the auto-advance countdown.
    SetPlaying {
        /// New playing flag.
        playing: bool,
    },
    /// Make a timeline the active one, resetting runtime state to its start.
    ActivateTimeline {
        /// The timeline to activate.
        timeline_id: Uuid,
    },
}

impl SessionCommand {
    /// The navigation command this session command maps to, if it is one.
    #[must_use]
    pub fn as_nav(&self) -> Option<NavCommand> {
        match *self {
            Self::Advance => Some(NavCommand::Advance),
            Self::Retreat => Some(NavCommand::Retreat),
            Self::JumpToMain { index } => Some(NavCommand::JumpToMain { index }),
            Self::JumpToBranch { branch_id, index } => {
                Some(NavCommand::JumpToBranch { branch_id, index })
            }
            Self::ActivateBranch { branch_id } => Some(NavCommand::ActivateBranch { branch_id }),
            Self::DeactivateBranch { branch_id } => {
                Some(NavCommand::DeactivateBranch { branch_id })
            }
            Self::SetPlaying { .. } | Self::ActivateTimeline { .. } => None,
        }
    }
}
