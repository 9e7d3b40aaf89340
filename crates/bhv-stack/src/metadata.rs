//! Per-entry stack metadata and the linked-scope reachability walk.

use tracing::warn;

use bhv_behavior::{BehaviorContainer, BehaviorSet};
use bhv_core::{verify, BehaviorId};

/// Everything the stack caches about one entry at push time.
///
/// `delegates` and `linked_activation_scope` are computed once when the entry
/// is created and never refreshed: behaviors fix their delegate sets at init.
/// The synthetic root-parent entry has `behavior == None` and
/// `index_in_stack == None`; its only delegate is the root behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMetadataEntry {
    pub behavior:                Option<BehaviorId>,
    pub index_in_stack:          Option<usize>,
    pub delegates:               BehaviorSet,
    pub linked_activation_scope: BehaviorSet,
}

impl StackMetadataEntry {
    /// Entry for `behavior` at stack position `index`.
    pub fn new(
        behavior:       BehaviorId,
        index:          usize,
        container:      &BehaviorContainer,
        max_iterations: usize,
    ) -> Self {
        let delegates = container.all_delegates(behavior);
        let mut linked_activation_scope = BehaviorSet::new();
        for &delegate in &delegates {
            recursively_gather_linked_behaviors(delegate, container, &mut linked_activation_scope, max_iterations);
        }
        Self { behavior: Some(behavior), index_in_stack: Some(index), delegates, linked_activation_scope }
    }

    /// The synthetic parent of the root behavior.
    pub fn root_parent(root: BehaviorId, container: &BehaviorContainer, max_iterations: usize) -> Self {
        let mut linked_activation_scope = BehaviorSet::new();
        recursively_gather_linked_behaviors(root, container, &mut linked_activation_scope, max_iterations);
        Self {
            behavior: None,
            index_in_stack: None,
            delegates: BehaviorSet::from([root]),
            linked_activation_scope,
        }
    }

    /// Delegates followed by linked behaviors; a behavior in both appears twice.
    pub fn scope_members(&self) -> impl Iterator<Item = BehaviorId> + '_ {
        self.delegates.iter().chain(self.linked_activation_scope.iter()).copied()
    }
}

/// Add to `linked` every behavior reachable from `base` through declared
/// linked-scope sets, excluding `base` itself unless it links back to itself.
///
/// Breadth-first over a working set, each newly discovered behavior queried
/// once.  The walk stops after `max_iterations` steps with a warning so a
/// malformed declaration cannot hang the robot.
pub fn recursively_gather_linked_behaviors(
    base:           BehaviorId,
    container:      &BehaviorContainer,
    linked:         &mut BehaviorSet,
    max_iterations: usize,
) {
    let mut raw = BehaviorSet::new();
    container.linked_activatable_scope(base, &mut raw);

    let mut iterations = 0;
    while let Some(next) = raw.first().copied() {
        if iterations == max_iterations {
            warn!(
                base = container.label(base),
                remaining = raw.len(),
                "BehaviorStack.RecursivelyGatherLinkedBehaviors.IterationCapReached"
            );
            break;
        }
        iterations += 1;

        if linked.insert(next) {
            let before = cfg!(debug_assertions).then(|| raw.clone());
            container.linked_activatable_scope(next, &mut raw);
            if let Some(before) = before {
                verify!(
                    before.is_subset(&raw),
                    "BehaviorStack.RecursivelyGatherLinkedBehaviors.LinkedSetErased",
                    "{} removed entries while reporting its linked scope",
                    container.label(next)
                );
            }
        }
        raw.remove(&next);
    }
}
