//! Delegation bookkeeping: who delegated to what, which completion callbacks
//! are owed, and which stack mutations are waiting to be applied.
//!
//! Behaviors never touch the stack directly.  Delegation calls on
//! [`BehaviorContext`][crate::BehaviorContext] validate against the live stack,
//! record the delegation here, and enqueue a [`DelegationRequest`].  The stack
//! drains the queue right after the hook that produced it returns.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use bhv_core::{ActionTag, BehaviorId};

use crate::{ActionList, ActionResult};

/// Continuation tag chosen by the delegating behavior.
///
/// Handed back through [`Behavior::on_delegate_complete`][crate::Behavior::on_delegate_complete]
/// so one behavior can tell its delegations apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallbackTag(pub u32);

/// What control was handed to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Delegate {
    Behavior(BehaviorId),
    Action(ActionTag),
}

/// Why a delegation ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DelegateOutcome {
    /// The delegated action finished with this result.
    ActionCompleted(ActionResult),
    /// The delegated behavior left the stack on its own.
    BehaviorStopped,
    /// The delegator cancelled the delegation and asked for the callback anyway.
    Cancelled,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DelegationRecord {
    pub delegate: Delegate,
    pub callback: Option<CallbackTag>,
}

/// A stack mutation produced by a delegation call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DelegationRequest {
    /// Push `delegate` on top of `delegator`.
    PushBehavior { delegator: BehaviorId, delegate: BehaviorId },
    /// Pop everything above `behavior`.
    PopAbove { behavior: BehaviorId },
    /// Pop `behavior` and everything above it.
    PopSelf { behavior: BehaviorId },
}

#[derive(Debug, Default)]
pub struct DelegationComponent {
    records:           FxHashMap<BehaviorId, DelegationRecord>,
    pending_callbacks: FxHashMap<BehaviorId, Vec<(CallbackTag, DelegateOutcome)>>,
    requests:          VecDeque<DelegationRequest>,
}

impl DelegationComponent {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Records ───────────────────────────────────────────────────────────────

    pub fn record(&self, delegator: BehaviorId) -> Option<&DelegationRecord> {
        self.records.get(&delegator)
    }

    pub fn is_control_delegated(&self, delegator: BehaviorId) -> bool {
        self.records.contains_key(&delegator)
    }

    pub fn delegated_behavior(&self, delegator: BehaviorId) -> Option<BehaviorId> {
        match self.records.get(&delegator)?.delegate {
            Delegate::Behavior(b) => Some(b),
            Delegate::Action(_) => None,
        }
    }

    pub fn insert_record(&mut self, delegator: BehaviorId, record: DelegationRecord) {
        self.records.insert(delegator, record);
    }

    pub fn remove_record(&mut self, delegator: BehaviorId) -> Option<DelegationRecord> {
        self.records.remove(&delegator)
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    pub(crate) fn push_request(&mut self, request: DelegationRequest) {
        self.requests.push_back(request);
    }

    pub fn pop_request(&mut self) -> Option<DelegationRequest> {
        self.requests.pop_front()
    }

    pub fn has_pending_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    // ── Callbacks ─────────────────────────────────────────────────────────────

    pub(crate) fn queue_callback(&mut self, delegator: BehaviorId, tag: CallbackTag, outcome: DelegateOutcome) {
        self.pending_callbacks.entry(delegator).or_default().push((tag, outcome));
    }

    /// Callbacks owed to `delegator`, in the order they were resolved.
    pub fn take_callbacks(&mut self, delegator: BehaviorId) -> Vec<(CallbackTag, DelegateOutcome)> {
        self.pending_callbacks.remove(&delegator).unwrap_or_default()
    }

    pub fn pending_callback_count(&self, delegator: BehaviorId) -> usize {
        self.pending_callbacks.get(&delegator).map_or(0, Vec::len)
    }

    // ── Resolution ────────────────────────────────────────────────────────────

    /// Resolve the delegation waiting on action `tag`.  Returns the delegator.
    pub fn resolve_action(&mut self, tag: ActionTag, result: ActionResult) -> Option<BehaviorId> {
        let delegator = self
            .records
            .iter()
            .find(|(_, r)| r.delegate == Delegate::Action(tag))
            .map(|(&b, _)| b)?;
        if let Some(record) = self.records.remove(&delegator) {
            if let Some(cb) = record.callback {
                self.queue_callback(delegator, cb, DelegateOutcome::ActionCompleted(result));
            }
        }
        Some(delegator)
    }

    /// Drop everything `popped` owned, then resolve its delegator's record.
    ///
    /// `parent` is the behavior directly below `popped` at the time of the
    /// pop.  A record naming `popped` under any other delegator is stale and
    /// is removed with a warning.
    pub fn on_behavior_popped(
        &mut self,
        popped:  BehaviorId,
        parent:  Option<BehaviorId>,
        actions: &mut ActionList,
    ) {
        if let Some(record) = self.records.remove(&popped) {
            if let Delegate::Action(tag) = record.delegate {
                actions.cancel(tag);
            }
        }
        self.pending_callbacks.remove(&popped);

        if let Some(parent) = parent {
            if self.delegated_behavior(parent) == Some(popped) {
                if let Some(record) = self.records.remove(&parent) {
                    debug!(%parent, %popped, "DelegationComponent.BehaviorStopped");
                    if let Some(cb) = record.callback {
                        self.queue_callback(parent, cb, DelegateOutcome::BehaviorStopped);
                    }
                }
            }
        }

        let stale: Vec<BehaviorId> = self
            .records
            .iter()
            .filter(|(_, r)| r.delegate == Delegate::Behavior(popped))
            .map(|(&b, _)| b)
            .collect();
        for delegator in stale {
            warn!(%delegator, %popped, "DelegationComponent.OnBehaviorPopped.StaleRecord");
            self.records.remove(&delegator);
        }
    }

    /// Forget every record, callback, and request.
    pub fn clear(&mut self) {
        self.records.clear();
        self.pending_callbacks.clear();
        self.requests.clear();
    }
}
