//! Audio-branch notifications emitted on every push and pop.

use serde::Serialize;

/// Whether the branch named by an [`AudioBranchEvent`] just became active.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum BehaviorStackState {
    Active,
    NotActive,
}

/// The stack path (root first) down to the behavior that was pushed or is
/// about to be popped.
///
/// Buffered by the stack and forwarded by the owner to whatever drives audio.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AudioBranchEvent {
    pub state: BehaviorStackState,
    pub path:  Vec<String>,
}

impl AudioBranchEvent {
    /// Label of the behavior the event is about.
    pub fn behavior(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}
