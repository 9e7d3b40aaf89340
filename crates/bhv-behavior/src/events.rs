//! Asynchronous event routing into per-behavior buffers.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::trace;

use bhv_core::BehaviorId;

use crate::CompletedAction;

/// Tag of the debug event that forces a state machine into a named state.
pub const MOVE_TO_STATE_EVENT: &str = "MoveToState";

/// An event delivered to behaviors, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RobotEvent {
    pub tag:     String,
    pub payload: Vec<u8>,
}

impl RobotEvent {
    pub fn new(tag: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self { tag: tag.into(), payload: payload.into() }
    }

    /// Payload interpreted as UTF-8, if it is.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Fans events out to subscribed behaviors.
///
/// Queues are drained as each behavior is ticked; anything not drained by the
/// end of the tick is discarded by [`clear_undelivered`][Self::clear_undelivered].
#[derive(Debug, Default)]
pub struct AsyncMessageGate {
    subscribers: FxHashMap<String, BTreeSet<BehaviorId>>,
    queues:      FxHashMap<BehaviorId, Vec<RobotEvent>>,
}

impl AsyncMessageGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, behavior: BehaviorId, tag: impl Into<String>) {
        self.subscribers.entry(tag.into()).or_default().insert(behavior);
    }

    pub fn is_subscribed(&self, behavior: BehaviorId, tag: &str) -> bool {
        self.subscribers.get(tag).is_some_and(|s| s.contains(&behavior))
    }

    /// Queue `event` for every subscriber of its tag.  Returns the fan-out count.
    pub fn post(&mut self, event: RobotEvent) -> usize {
        let Some(subs) = self.subscribers.get(&event.tag) else {
            trace!(tag = %event.tag, "AsyncMessageGate.Post.NoSubscribers");
            return 0;
        };
        for &behavior in subs {
            self.queues.entry(behavior).or_default().push(event.clone());
        }
        subs.len()
    }

    /// Queue `event` for one behavior regardless of subscriptions.
    pub fn post_to(&mut self, behavior: BehaviorId, event: RobotEvent) {
        self.queues.entry(behavior).or_default().push(event);
    }

    pub fn take_events_for(&mut self, behavior: BehaviorId) -> Vec<RobotEvent> {
        self.queues.remove(&behavior).unwrap_or_default()
    }

    /// Drop events queued for behaviors that were not ticked.
    pub fn clear_undelivered(&mut self) {
        self.queues.clear();
    }
}

/// What the currently-ticking behavior sees this tick.
#[derive(Debug, Default)]
pub struct BehaviorEventBuffer {
    pub events:            Vec<RobotEvent>,
    pub actions_completed: Vec<CompletedAction>,
}

impl BehaviorEventBuffer {
    pub fn clear(&mut self) {
        self.events.clear();
        self.actions_completed.clear();
    }
}
