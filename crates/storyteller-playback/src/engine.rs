//! The navigation state machine.
//!
//! [`transition`] is a pure function over an immutable timeline snapshot
//! and the current [`NavState`]; it never touches the content store, the
//! router, or the clock. The controller owns applying its result.

use storyteller_core::error::PlaybackError;
use storyteller_timeline::model::{Branch, Inject, Timeline};

use crate::commands::NavCommand;
use crate::state::{NavState, Position};

/// Outcome of a successfully handled navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// The position changed; the newly displayed inject must be broadcast.
    Moved,
    /// Boundary no-op: already at the end of the main sequence.
    AtEnd,
    /// Boundary no-op: already at the start of the main sequence.
    AtStart,
    /// Branch arming changed; position did not move.
    ArmingChanged,
}

/// Applies one navigation command.
///
/// Stale positions (the snapshot changed since the last command) are
/// clamped to the nearest valid position before the command runs.
///
/// # Errors
///
/// Returns `NoContent` for movement over an empty main sequence,
/// `UnknownBranch`/`OutOfRange` for invalid jump targets, and
/// `InvalidOperation` for manual (de)activation of an auto-trigger branch.
pub fn transition(
    timeline: &Timeline,
    state: &NavState,
    command: NavCommand,
) -> Result<(NavState, NavOutcome), PlaybackError> {
    let mut next = reconcile(timeline, state);

    match command {
        NavCommand::ActivateBranch { branch_id } => {
            let branch = timeline
                .branch(branch_id)
                .ok_or(PlaybackError::UnknownBranch(branch_id))?;
            if branch.auto_trigger {
                return Err(PlaybackError::InvalidOperation(
                    "auto-trigger branches arm themselves".to_owned(),
                ));
            }
            next.active_branches.insert(branch_id);
            Ok((next, NavOutcome::ArmingChanged))
        }
        NavCommand::DeactivateBranch { branch_id } => {
            let branch = timeline
                .branch(branch_id)
                .ok_or(PlaybackError::UnknownBranch(branch_id))?;
            if branch.auto_trigger {
                return Err(PlaybackError::InvalidOperation(
                    "auto-trigger branches cannot be disarmed manually".to_owned(),
                ));
            }
            // Disarming the branch currently displayed leaves the position
            // alone; the stop becomes visible on the next navigation.
            next.active_branches.remove(&branch_id);
            Ok((next, NavOutcome::ArmingChanged))
        }
        NavCommand::Advance => {
            let position = current_position(timeline, &next)?;
            advance(timeline, next, position)
        }
        NavCommand::Retreat => {
            let position = current_position(timeline, &next)?;
            retreat(timeline, next, position)
        }
        NavCommand::JumpToMain { index } => {
            current_position(timeline, &next)?;
            if index >= timeline.main_len() {
                return Err(PlaybackError::OutOfRange(format!(
                    "main index {index} of {}",
                    timeline.main_len()
                )));
            }
            next.position = Some(Position::OnMain { index });
            Ok((next, NavOutcome::Moved))
        }
        NavCommand::JumpToBranch { branch_id, index } => {
            current_position(timeline, &next)?;
            let branch = timeline
                .branch(branch_id)
                .ok_or(PlaybackError::UnknownBranch(branch_id))?;
            if index >= branch.injects.len() {
                return Err(PlaybackError::OutOfRange(format!(
                    "branch index {index} of {}",
                    branch.injects.len()
                )));
            }
            next.position = Some(Position::InBranch { branch_id, index });
            Ok((next, NavOutcome::Moved))
        }
    }
}

/// The inject displayed at a position, if the position resolves.
#[must_use]
pub fn displayed_inject<'a>(timeline: &'a Timeline, position: Position) -> Option<&'a Inject> {
    match position {
        Position::OnMain { index } => timeline.inject_at(index),
        Position::InBranch { branch_id, index } => {
            timeline.branch(branch_id)?.injects.get(index)
        }
    }
}

/// Clamps a possibly stale state to the given snapshot: armed branches that
/// no longer exist are dropped and the position is moved to the nearest
/// valid one (or cleared when the main sequence is empty).
fn reconcile(timeline: &Timeline, state: &NavState) -> NavState {
    let mut next = state.clone();
    next.active_branches
        .retain(|id| timeline.branch(*id).is_some());
    next.triggered.retain(|id| timeline.branch(*id).is_some());

    let main_len = timeline.main_len();
    next.position = match next.position {
        None => (main_len > 0).then_some(Position::OnMain { index: 0 }),
        Some(Position::OnMain { index }) => {
            (main_len > 0).then(|| Position::OnMain {
                index: index.min(main_len - 1),
            })
        }
        Some(Position::InBranch { branch_id, index }) => match timeline.branch(branch_id) {
            Some(branch) if !branch.injects.is_empty() => Some(Position::InBranch {
                branch_id,
                index: index.min(branch.injects.len() - 1),
            }),
            Some(branch) => {
                let parent = timeline.parent_index(branch).unwrap_or(0);
                (main_len > 0).then(|| Position::OnMain {
                    index: parent.min(main_len - 1),
                })
            }
            None => (main_len > 0).then_some(Position::OnMain { index: 0 }),
        },
    };
    next
}

fn current_position(
    timeline: &Timeline,
    state: &NavState,
) -> Result<Position, PlaybackError> {
    if timeline.main_len() == 0 {
        return Err(PlaybackError::NoContent);
    }
    state.position.ok_or(PlaybackError::NoContent)
}

fn advance(
    timeline: &Timeline,
    mut state: NavState,
    position: Position,
) -> Result<(NavState, NavOutcome), PlaybackError> {
    match position {
        Position::OnMain { index } => {
            if let Some(branch) = armed_branch_at(timeline, &state, index) {
                enter_branch(&mut state, branch);
                return Ok((state, NavOutcome::Moved));
            }
            if index + 1 >= timeline.main_len() {
                return Ok((state, NavOutcome::AtEnd));
            }
            arrive_at_main(timeline, &mut state, index + 1);
            Ok((state, NavOutcome::Moved))
        }
        Position::InBranch { branch_id, index } => {
            let branch = timeline
                .branch(branch_id)
                .ok_or(PlaybackError::UnknownBranch(branch_id))?;
            let is_active = state.active_branches.contains(&branch_id);

            if is_active && index + 1 < branch.injects.len() {
                state.position = Some(Position::InBranch {
                    branch_id,
                    index: index + 1,
                });
                return Ok((state, NavOutcome::Moved));
            }

            // The branch is over for us: either its last inject was just
            // displayed, or the operator disarmed it mid-display. A
            // disarmed branch is abandoned without merging.
            let parent = timeline.parent_index(branch).unwrap_or(0);
            let resume = if is_active {
                branch.merge_target_index.unwrap_or(parent + 1)
            } else {
                parent + 1
            };

            if resume >= timeline.main_len() {
                // Nothing left on the main sequence to resume at; leave the
                // state untouched and report the boundary.
                return Ok((state, NavOutcome::AtEnd));
            }

            state.active_branches.remove(&branch_id);
            arrive_at_main(timeline, &mut state, resume);
            Ok((state, NavOutcome::Moved))
        }
    }
}

fn retreat(
    timeline: &Timeline,
    mut state: NavState,
    position: Position,
) -> Result<(NavState, NavOutcome), PlaybackError> {
    match position {
        Position::OnMain { index: 0 } => Ok((state, NavOutcome::AtStart)),
        Position::OnMain { index } => {
            state.position = Some(Position::OnMain { index: index - 1 });
            Ok((state, NavOutcome::Moved))
        }
        Position::InBranch { branch_id, index } => {
            let branch = timeline
                .branch(branch_id)
                .ok_or(PlaybackError::UnknownBranch(branch_id))?;
            if index == 0 {
                let parent = timeline
                    .parent_index(branch)
                    .unwrap_or(0)
                    .min(timeline.main_len() - 1);
                state.position = Some(Position::OnMain { index: parent });
            } else {
                state.position = Some(Position::InBranch {
                    branch_id,
                    index: index - 1,
                });
            }
            Ok((state, NavOutcome::Moved))
        }
    }
}

/// Arrives at a main index via forward motion, entering an unfired
/// auto-trigger branch immediately instead of stopping on the main inject.
fn arrive_at_main(timeline: &Timeline, state: &mut NavState, index: usize) {
    state.position = Some(Position::OnMain { index });
    if let Some(branch) = timeline.auto_branch_at(index) {
        if !state.triggered.contains(&branch.id) && !branch.injects.is_empty() {
            enter_branch(state, branch);
        }
    }
}

/// The branch that an Advance from the given main index should enter, if
/// any: an unfired auto-trigger branch, or else the first armed manual
/// branch attached to that inject.
fn armed_branch_at<'a>(
    timeline: &'a Timeline,
    state: &NavState,
    index: usize,
) -> Option<&'a Branch> {
    if let Some(auto) = timeline.auto_branch_at(index) {
        // The cardinality invariant rules out siblings next to an
        // auto-trigger branch, so a fired one means nothing is armed here.
        return (!state.triggered.contains(&auto.id) && !auto.injects.is_empty())
            .then_some(auto);
    }
    timeline
        .branches_at(index)
        .find(|b| state.active_branches.contains(&b.id) && !b.injects.is_empty())
}

fn enter_branch(state: &mut NavState, branch: &Branch) {
    state.position = Some(Position::InBranch {
        branch_id: branch.id,
        index: 0,
    });
    if branch.auto_trigger {
        state.triggered.insert(branch.id);
        state.active_branches.insert(branch.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyteller_test_support::{attach_branch, timeline_with_mains};
    use uuid::Uuid;

    fn on_main(index: usize) -> Option<Position> {
        Some(Position::OnMain { index })
    }

    fn in_branch(branch_id: Uuid, index: usize) -> Option<Position> {
        Some(Position::InBranch { branch_id, index })
    }

    fn state_at(position: Option<Position>) -> NavState {
        NavState {
            position,
            ..NavState::default()
        }
    }

    fn apply(timeline: &Timeline, state: &NavState, command: NavCommand) -> (NavState, NavOutcome) {
        transition(timeline, state, command).unwrap()
    }

    #[test]
    fn test_advance_then_retreat_returns_to_origin_without_branches() {
        let timeline = timeline_with_mains(5);
        for index in 1..4 {
            let start = state_at(on_main(index));

            let (after_advance, _) = apply(&timeline, &start, NavCommand::Advance);
            let (after_retreat, _) = apply(&timeline, &after_advance, NavCommand::Retreat);

            assert_eq!(after_retreat.position, on_main(index));
        }
    }

    #[test]
    fn test_advance_at_end_is_a_no_op() {
        let timeline = timeline_with_mains(3);
        let start = state_at(on_main(2));

        let (state, outcome) = apply(&timeline, &start, NavCommand::Advance);

        assert_eq!(outcome, NavOutcome::AtEnd);
        assert_eq!(state.position, on_main(2));
    }

    #[test]
    fn test_retreat_at_start_is_a_no_op() {
        let timeline = timeline_with_mains(3);
        let start = state_at(on_main(0));

        let (state, outcome) = apply(&timeline, &start, NavCommand::Retreat);

        assert_eq!(outcome, NavOutcome::AtStart);
        assert_eq!(state.position, on_main(0));
    }

    #[test]
    fn test_every_command_on_empty_timeline_is_no_content() {
        let timeline = timeline_with_mains(0);
        let state = NavState::default();

        for command in [
            NavCommand::Advance,
            NavCommand::Retreat,
            NavCommand::JumpToMain { index: 0 },
        ] {
            let result = transition(&timeline, &state, command);
            assert_eq!(result.unwrap_err(), PlaybackError::NoContent);
        }
    }

    #[test]
    fn test_advance_into_auto_trigger_branch_enters_at_zero() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 1, true, None, 2);
        let start = state_at(on_main(0));

        let (state, outcome) = apply(&timeline, &start, NavCommand::Advance);

        assert_eq!(outcome, NavOutcome::Moved);
        assert_eq!(state.position, in_branch(branch_id, 0));
        assert!(state.active_branches.contains(&branch_id));
        assert!(state.triggered.contains(&branch_id));
    }

    #[test]
    fn test_auto_trigger_fires_at_most_once_per_activation() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 1, true, None, 1);
        let start = state_at(on_main(0));

        // Advance enters the branch, advance again exhausts it onto main 2.
        let (s1, _) = apply(&timeline, &start, NavCommand::Advance);
        assert_eq!(s1.position, in_branch(branch_id, 0));
        let (s2, _) = apply(&timeline, &s1, NavCommand::Advance);
        assert_eq!(s2.position, on_main(2));

        // Walk back past the parent and forward again: no re-entry.
        let (s3, _) = apply(&timeline, &s2, NavCommand::Retreat);
        assert_eq!(s3.position, on_main(1));
        let (s4, _) = apply(&timeline, &s3, NavCommand::Retreat);
        assert_eq!(s4.position, on_main(0));
        let (s5, _) = apply(&timeline, &s4, NavCommand::Advance);
        assert_eq!(s5.position, on_main(1));
        let (s6, _) = apply(&timeline, &s5, NavCommand::Advance);
        assert_eq!(s6.position, on_main(2));
    }

    #[test]
    fn test_branch_with_merge_target_resumes_exactly_there() {
        // Main 0..=2; auto branch of two injects on inject 0 merging to 2.
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 0, true, Some(2), 2);
        let start = state_at(on_main(0));

        let (s1, _) = apply(&timeline, &start, NavCommand::Advance);
        assert_eq!(s1.position, in_branch(branch_id, 0));

        let (s2, _) = apply(&timeline, &s1, NavCommand::Advance);
        assert_eq!(s2.position, in_branch(branch_id, 1));

        // Index 1 is skipped by the merge.
        let (s3, _) = apply(&timeline, &s2, NavCommand::Advance);
        assert_eq!(s3.position, on_main(2));
        assert!(!s3.active_branches.contains(&branch_id));
    }

    #[test]
    fn test_branch_without_merge_target_resumes_after_parent() {
        let mut timeline = timeline_with_mains(4);
        let branch_id = attach_branch(&mut timeline, 1, true, None, 1);
        let start = state_at(on_main(0));

        let (s1, _) = apply(&timeline, &start, NavCommand::Advance);
        assert_eq!(s1.position, in_branch(branch_id, 0));

        let (s2, _) = apply(&timeline, &s1, NavCommand::Advance);
        assert_eq!(s2.position, on_main(2));
    }

    #[test]
    fn test_merge_lands_on_chained_auto_trigger_branch() {
        let mut timeline = timeline_with_mains(4);
        let first = attach_branch(&mut timeline, 0, true, Some(2), 1);
        let second = attach_branch(&mut timeline, 2, true, None, 1);
        let start = state_at(on_main(0));

        let (s1, _) = apply(&timeline, &start, NavCommand::Advance);
        assert_eq!(s1.position, in_branch(first, 0));

        // Exhausting the first branch merges onto main 2, whose own
        // auto-trigger branch fires immediately.
        let (s2, _) = apply(&timeline, &s1, NavCommand::Advance);
        assert_eq!(s2.position, in_branch(second, 0));
        assert!(s2.triggered.contains(&second));
    }

    #[test]
    fn test_retreat_from_branch_start_returns_to_parent() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 1, true, None, 2);
        let start = state_at(in_branch(branch_id, 1));

        let (s1, _) = apply(&timeline, &start, NavCommand::Retreat);
        assert_eq!(s1.position, in_branch(branch_id, 0));

        let (s2, _) = apply(&timeline, &s1, NavCommand::Retreat);
        assert_eq!(s2.position, on_main(1));
    }

    #[test]
    fn test_manual_branch_plays_from_its_parent_when_armed() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 1, false, None, 2);
        let start = state_at(on_main(1));

        // Not armed: advance walks the main sequence.
        let (unarmed, _) = apply(&timeline, &start, NavCommand::Advance);
        assert_eq!(unarmed.position, on_main(2));

        // Armed: advance enters the branch instead.
        let (armed, outcome) =
            apply(&timeline, &start, NavCommand::ActivateBranch { branch_id });
        assert_eq!(outcome, NavOutcome::ArmingChanged);
        assert_eq!(armed.position, on_main(1));

        let (entered, _) = apply(&timeline, &armed, NavCommand::Advance);
        assert_eq!(entered.position, in_branch(branch_id, 0));
    }

    #[test]
    fn test_arming_a_manual_branch_does_not_move_position() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 2, false, None, 1);
        let start = state_at(on_main(0));

        let (state, outcome) =
            apply(&timeline, &start, NavCommand::ActivateBranch { branch_id });

        assert_eq!(outcome, NavOutcome::ArmingChanged);
        assert_eq!(state.position, on_main(0));
        assert!(state.active_branches.contains(&branch_id));
    }

    #[test]
    fn test_auto_trigger_branch_rejects_manual_arming() {
        let mut timeline = timeline_with_mains(2);
        let branch_id = attach_branch(&mut timeline, 1, true, None, 1);
        let state = state_at(on_main(0));

        let activate = transition(&timeline, &state, NavCommand::ActivateBranch { branch_id });
        let deactivate =
            transition(&timeline, &state, NavCommand::DeactivateBranch { branch_id });

        assert!(matches!(
            activate.unwrap_err(),
            PlaybackError::InvalidOperation(_)
        ));
        assert!(matches!(
            deactivate.unwrap_err(),
            PlaybackError::InvalidOperation(_)
        ));
    }

    #[test]
    fn test_disarming_the_displayed_branch_keeps_position_until_next_advance() {
        let mut timeline = timeline_with_mains(4);
        let branch_id = attach_branch(&mut timeline, 1, false, Some(3), 3);
        let mut state = state_at(on_main(1));
        state.active_branches.insert(branch_id);

        let (entered, _) = apply(&timeline, &state, NavCommand::Advance);
        assert_eq!(entered.position, in_branch(branch_id, 0));

        // Disarm while displayed: position holds.
        let (disarmed, outcome) =
            apply(&timeline, &entered, NavCommand::DeactivateBranch { branch_id });
        assert_eq!(outcome, NavOutcome::ArmingChanged);
        assert_eq!(disarmed.position, in_branch(branch_id, 0));

        // The next advance abandons the branch without merging.
        let (left, _) = apply(&timeline, &disarmed, NavCommand::Advance);
        assert_eq!(left.position, on_main(2));
    }

    #[test]
    fn test_jump_to_main_bypasses_auto_trigger() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 1, true, None, 1);
        let start = state_at(on_main(0));

        let (state, outcome) = apply(&timeline, &start, NavCommand::JumpToMain { index: 1 });

        assert_eq!(outcome, NavOutcome::Moved);
        assert_eq!(state.position, on_main(1));
        assert!(!state.triggered.contains(&branch_id));
        assert!(state.active_branches.is_empty());
    }

    #[test]
    fn test_jump_to_main_out_of_range_leaves_state_untouched() {
        let timeline = timeline_with_mains(3);
        let start = state_at(on_main(1));

        let result = transition(&timeline, &start, NavCommand::JumpToMain { index: 3 });

        assert!(matches!(result.unwrap_err(), PlaybackError::OutOfRange(_)));
    }

    #[test]
    fn test_jump_to_branch_positions_without_arming() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 0, false, None, 2);
        let start = state_at(on_main(2));

        let (state, outcome) = apply(
            &timeline,
            &start,
            NavCommand::JumpToBranch {
                branch_id,
                index: 1,
            },
        );

        assert_eq!(outcome, NavOutcome::Moved);
        assert_eq!(state.position, in_branch(branch_id, 1));
        assert!(state.active_branches.is_empty());
    }

    #[test]
    fn test_jump_to_branch_rejects_bad_targets() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 0, false, None, 2);
        let start = state_at(on_main(0));

        let out_of_range = transition(
            &timeline,
            &start,
            NavCommand::JumpToBranch {
                branch_id,
                index: 2,
            },
        );
        let unknown = transition(
            &timeline,
            &start,
            NavCommand::JumpToBranch {
                branch_id: Uuid::new_v4(),
                index: 0,
            },
        );

        assert!(matches!(
            out_of_range.unwrap_err(),
            PlaybackError::OutOfRange(_)
        ));
        assert!(matches!(
            unknown.unwrap_err(),
            PlaybackError::UnknownBranch(_)
        ));
    }

    #[test]
    fn test_exhausting_a_branch_on_the_last_main_inject_reports_at_end() {
        let mut timeline = timeline_with_mains(2);
        let branch_id = attach_branch(&mut timeline, 1, true, None, 1);
        let start = state_at(on_main(0));

        let (s1, _) = apply(&timeline, &start, NavCommand::Advance);
        assert_eq!(s1.position, in_branch(branch_id, 0));

        let (s2, outcome) = apply(&timeline, &s1, NavCommand::Advance);
        assert_eq!(outcome, NavOutcome::AtEnd);
        assert_eq!(s2.position, in_branch(branch_id, 0));
    }

    #[test]
    fn test_reconcile_clamps_a_stale_main_position() {
        // The snapshot shrank to two injects under a stored position of 4.
        let timeline = timeline_with_mains(2);
        let start = state_at(on_main(4));

        let (state, outcome) = apply(&timeline, &start, NavCommand::Advance);

        // Clamped to index 1, which is the end.
        assert_eq!(outcome, NavOutcome::AtEnd);
        assert_eq!(state.position, on_main(1));
    }

    #[test]
    fn test_reconcile_recovers_from_a_deleted_branch() {
        let mut timeline = timeline_with_mains(3);
        let branch_id = attach_branch(&mut timeline, 1, false, None, 2);
        let mut start = state_at(in_branch(branch_id, 1));
        start.active_branches.insert(branch_id);
        timeline.branches.clear();

        let (state, _) = apply(&timeline, &start, NavCommand::Advance);

        // Back on the main sequence, with the stale arming scrubbed.
        assert!(matches!(state.position, Some(Position::OnMain { .. })));
        assert!(state.active_branches.is_empty());
    }

    #[test]
    fn test_displayed_inject_resolves_main_and_branch_positions() {
        let mut timeline = timeline_with_mains(2);
        let branch_id = attach_branch(&mut timeline, 0, false, None, 1);

        let on_main_inject =
            displayed_inject(&timeline, Position::OnMain { index: 1 }).unwrap();
        assert_eq!(on_main_inject.heading, "inject 1");

        let branch_inject = displayed_inject(
            &timeline,
            Position::InBranch {
                branch_id,
                index: 0,
            },
        )
        .unwrap();
        assert_eq!(branch_inject.heading, "branch inject 0");

        assert!(displayed_inject(&timeline, Position::OnMain { index: 9 }).is_none());
    }

    #[test]
    fn test_empty_auto_trigger_branch_is_never_entered() {
        let mut timeline = timeline_with_mains(3);
        attach_branch(&mut timeline, 1, true, None, 0);
        let start = state_at(on_main(0));

        let (state, _) = apply(&timeline, &start, NavCommand::Advance);

        assert_eq!(state.position, on_main(1));
    }
}
