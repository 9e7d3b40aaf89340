//! Debug views of the stack: the `"A/B/C"` string, a log dump, and the
//! parent/child tree served to the visualization page.

use serde::{Deserialize, Serialize};
use tracing::info;

use bhv_behavior::BehaviorContainer;
use bhv_core::RobotClock;

use crate::{BehaviorStack, StackError, StackResult};

/// One edge of the debug tree.  `parent` is `None` for the root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRelationship {
    #[serde(rename = "behaviorID")]
    pub behavior_id: String,
    pub parent:      Option<String>,
}

/// Snapshot of the stack for the visualization page.
///
/// `tree` lists every behavior reachable by delegation from an active entry,
/// with the active behavior that may delegate to it; `stack` is the active
/// chain root first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackDebugTree {
    pub time:  f64,
    pub tree:  Vec<TreeRelationship>,
    pub stack: Vec<String>,
}

impl StackDebugTree {
    pub fn parent_of(&self, label: &str) -> Option<&str> {
        self.tree
            .iter()
            .find(|r| r.behavior_id == label)
            .and_then(|r| r.parent.as_deref())
    }
}

impl BehaviorStack {
    /// Active chain as `"Root/Child/Grandchild"`.
    pub fn stack_to_behavior_string(&self, container: &BehaviorContainer) -> String {
        self.as_slice()
            .iter()
            .map(|&b| container.label(b))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Log every entry with its index and delegate count.
    pub fn debug_print_stack(&self, container: &BehaviorContainer, tag: &str) {
        info!(tag, depth = self.len(), "BehaviorStack.DebugPrintStack");
        for (index, &behavior) in self.as_slice().iter().enumerate() {
            let delegates = self.metadata(behavior).map_or(0, |e| e.delegates.len());
            info!(tag, index, behavior = container.label(behavior), delegates, "BehaviorStack.DebugPrintStack.Entry");
        }
    }

    pub fn build_debug_behavior_tree(&self, container: &BehaviorContainer, clock: &RobotClock) -> StackDebugTree {
        let mut tree = Vec::new();
        for entry in self.metadata_entries() {
            let parent = entry.behavior.map(|b| container.label(b).to_owned());
            for &delegate in &entry.delegates {
                tree.push(TreeRelationship {
                    behavior_id: container.label(delegate).to_owned(),
                    parent:      parent.clone(),
                });
            }
        }
        StackDebugTree {
            time: clock.now_s(),
            tree,
            stack: self.as_slice().iter().map(|&b| container.label(b).to_owned()).collect(),
        }
    }

    /// The debug tree as JSON; fails on an uninitialized stack.
    pub fn debug_tree_json(&self, container: &BehaviorContainer, clock: &RobotClock) -> StackResult<String> {
        if self.is_empty() {
            return Err(StackError::Empty);
        }
        Ok(serde_json::to_string(&self.build_debug_behavior_tree(container, clock))?)
    }
}
