//! Timeline fixtures shared by unit and integration tests.

use storyteller_timeline::model::{Branch, Inject, Timeline};
use uuid::Uuid;

/// Builds a timeline with `n` main injects, headed "inject 0" .. "inject n-1".
#[must_use]
pub fn timeline_with_mains(n: usize) -> Timeline {
    let mut timeline = Timeline::new("fixture");
    for i in 0..n {
        timeline.injects.push(Inject::new(format!("inject {i}")));
    }
    timeline
}

/// Attaches a branch with `inject_count` injects to the main inject at
/// `parent_index` and returns the new branch's id.
pub fn attach_branch(
    timeline: &mut Timeline,
    parent_index: usize,
    auto_trigger: bool,
    merge_target_index: Option<usize>,
    inject_count: usize,
) -> Uuid {
    let branch = Branch {
        id: Uuid::new_v4(),
        parent_inject_id: timeline.injects[parent_index].id,
        name: format!("branch at {parent_index}"),
        auto_trigger,
        merge_target_index,
        injects: (0..inject_count)
            .map(|i| Inject::new(format!("branch inject {i}")))
            .collect(),
    };
    let id = branch.id;
    timeline.branches.push(branch);
    id
}

/// An inject visible only to the given viewer categories.
#[must_use]
pub fn restricted_inject(heading: &str, categories: &[&str]) -> Inject {
    let mut inject = Inject::new(heading);
    inject.visibility = categories.iter().map(|c| (*c).to_owned()).collect();
    inject
}
