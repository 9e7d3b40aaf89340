//! `StackVizMonitor` — keeps the latest debug tree for the web view.

use tracing::trace;

use bhv_behavior::BehaviorContainer;
use bhv_core::RobotClock;

use crate::{BehaviorStack, StackDebugTree, StackMonitor};

#[derive(Default)]
pub struct StackVizMonitor {
    latest:    Option<StackDebugTree>,
    snapshots: usize,
}

impl StackVizMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<&StackDebugTree> {
        self.latest.as_ref()
    }

    /// Number of snapshots taken, one per tick in which the stack changed.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }
}

impl StackMonitor for StackVizMonitor {
    fn notify_of_change(&mut self, stack: &BehaviorStack, container: &BehaviorContainer, clock: &RobotClock) {
        let tree = stack.build_debug_behavior_tree(container, clock);
        trace!(stack = ?tree.stack, "StackVizMonitor.Snapshot");
        self.latest = Some(tree);
        self.snapshots += 1;
    }
}
