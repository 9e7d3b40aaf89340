//! Actions: leaf units of work a behavior can delegate to instead of another
//! behavior.

use std::fmt;

use tracing::debug;

use bhv_core::ActionTag;

/// How a delegated action ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    Failure,
    Cancelled,
}

/// Returned by [`Action::update`] every tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActionStatus {
    Running,
    Complete(ActionResult),
}

/// A completion reported by [`ActionList::update`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CompletedAction {
    pub tag:    ActionTag,
    pub result: ActionResult,
}

/// A unit of robot work driven once per tick.
pub trait Action {
    fn name(&self) -> &str;

    /// Advance the action; `now_s` is robot time in seconds.
    fn update(&mut self, now_s: f64) -> ActionStatus;

    /// Called when the action is removed before completing.
    fn on_cancel(&mut self) {}
}

/// The queue of in-flight actions, owned by the behavior services.
#[derive(Default)]
pub struct ActionList {
    running:  Vec<(ActionTag, Box<dyn Action>)>,
    next_tag: u32,
}

impl fmt::Debug for ActionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionList")
            .field("running", &self.running.iter().map(|(t, a)| (*t, a.name())).collect::<Vec<_>>())
            .finish()
    }
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh tag for an action that is about to be queued.
    pub fn next_tag(&mut self) -> ActionTag {
        let tag = ActionTag(self.next_tag);
        self.next_tag = self.next_tag.wrapping_add(1);
        tag
    }

    pub fn queue(&mut self, tag: ActionTag, action: Box<dyn Action>) {
        debug!(action = action.name(), %tag, "ActionList.Queue");
        self.running.push((tag, action));
    }

    /// Remove a running action without reporting a completion.
    pub fn cancel(&mut self, tag: ActionTag) -> bool {
        let Some(pos) = self.running.iter().position(|(t, _)| *t == tag) else {
            return false;
        };
        let (_, mut action) = self.running.remove(pos);
        debug!(action = action.name(), %tag, "ActionList.Cancel");
        action.on_cancel();
        true
    }

    pub fn is_running(&self, tag: ActionTag) -> bool {
        self.running.iter().any(|(t, _)| *t == tag)
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Tick every running action, removing and returning those that finished.
    pub fn update(&mut self, now_s: f64) -> Vec<CompletedAction> {
        let mut completed = Vec::new();
        self.running.retain_mut(|(tag, action)| match action.update(now_s) {
            ActionStatus::Running => true,
            ActionStatus::Complete(result) => {
                completed.push(CompletedAction { tag: *tag, result });
                false
            }
        });
        completed
    }
}

// ── WaitAction ────────────────────────────────────────────────────────────────

/// Completes successfully once `duration_s` of robot time has passed since
/// its first update.
#[derive(Debug, Clone)]
pub struct WaitAction {
    duration_s: f64,
    started_s:  Option<f64>,
}

impl WaitAction {
    pub fn new(duration_s: f64) -> Self {
        Self { duration_s, started_s: None }
    }
}

impl Action for WaitAction {
    fn name(&self) -> &str {
        "Wait"
    }

    fn update(&mut self, now_s: f64) -> ActionStatus {
        let started = *self.started_s.get_or_insert(now_s);
        if now_s - started >= self.duration_s {
            ActionStatus::Complete(ActionResult::Success)
        } else {
            ActionStatus::Running
        }
    }
}
