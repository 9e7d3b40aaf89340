//! Views passed to behavior hooks, and the delegation primitives.

use tracing::{debug, warn};

use bhv_core::{verify, BehaviorId, RobotClock, SystemConfig, Tick};

use crate::{
    Action, BehaviorContainer, BehaviorServices, CallbackTag, CompletedAction, Delegate,
    DelegateOutcome, DelegationRecord, DelegationRequest, RobotEvent, Whiteboard,
};

/// Read-only view of the active chain.
///
/// Implemented by the behavior stack; defined here so behaviors can ask
/// about their neighbors without depending on the stack crate.
pub trait StackView {
    fn top(&self) -> Option<BehaviorId>;
    fn is_in_stack(&self, behavior: BehaviorId) -> bool;
    fn behavior_above(&self, behavior: BehaviorId) -> Option<BehaviorId>;
    fn behavior_below(&self, behavior: BehaviorId) -> Option<BehaviorId>;
    /// Whether `delegated` is a declared delegate of `delegator`, which must be in the stack.
    fn is_valid_delegation(&self, delegator: BehaviorId, delegated: BehaviorId) -> bool;
    fn depth(&self) -> usize;
}

/// A [`StackView`] with nothing on it.
pub struct EmptyStack;

impl StackView for EmptyStack {
    fn top(&self) -> Option<BehaviorId> {
        None
    }
    fn is_in_stack(&self, _: BehaviorId) -> bool {
        false
    }
    fn behavior_above(&self, _: BehaviorId) -> Option<BehaviorId> {
        None
    }
    fn behavior_below(&self, _: BehaviorId) -> Option<BehaviorId> {
        None
    }
    fn is_valid_delegation(&self, _: BehaviorId, _: BehaviorId) -> bool {
        false
    }
    fn depth(&self) -> usize {
        0
    }
}

// ── ActivationContext ─────────────────────────────────────────────────────────

/// Read-only snapshot handed to `wants_to_be_activated` and conditions.
#[derive(Clone, Copy)]
pub struct ActivationContext<'a> {
    pub services:  &'a BehaviorServices,
    pub container: &'a BehaviorContainer,
    pub stack:     &'a dyn StackView,
}

impl<'a> ActivationContext<'a> {
    #[inline]
    pub fn new(
        services:  &'a BehaviorServices,
        container: &'a BehaviorContainer,
        stack:     &'a dyn StackView,
    ) -> Self {
        Self { services, container, stack }
    }

    pub fn clock(&self) -> &'a RobotClock {
        &self.services.clock
    }

    pub fn now_s(&self) -> f64 {
        self.services.clock.now_s()
    }

    pub fn tick(&self) -> Tick {
        self.services.clock.tick()
    }

    pub fn whiteboard(&self) -> &'a Whiteboard {
        &self.services.whiteboard
    }

    /// Full activation check for another behavior, including modifier gating.
    pub fn wants_to_be_activated(&self, behavior: BehaviorId) -> bool {
        self.container.wants_to_be_activated(behavior, self)
    }
}

// ── BehaviorContext ───────────────────────────────────────────────────────────

/// Mutable context for one lifecycle hook of one behavior.
///
/// Delegation calls validate against the live stack immediately and queue
/// the resulting stack mutation; the stack applies the queue as soon as the
/// hook returns.  `in_control` tracks what the top of the stack will be once
/// the queue is applied, so consecutive calls within one hook see each
/// other's effects.
pub struct BehaviorContext<'a> {
    id:            BehaviorId,
    services:      &'a mut BehaviorServices,
    container:     &'a BehaviorContainer,
    stack:         &'a dyn StackView,
    in_control:    Option<BehaviorId>,
    can_delegate:  bool,
    stopping:      bool,
    /// Set once this hook has queued a pop of everything above the behavior.
    popping_above: bool,
}

impl<'a> BehaviorContext<'a> {
    pub fn new(
        id:        BehaviorId,
        services:  &'a mut BehaviorServices,
        container: &'a BehaviorContainer,
        stack:     &'a dyn StackView,
    ) -> Self {
        let in_control = stack.top();
        Self {
            id,
            services,
            container,
            stack,
            in_control,
            can_delegate: true,
            stopping: false,
            popping_above: false,
        }
    }

    /// Context for teardown hooks: every delegation call is refused.
    pub fn without_delegation(
        id:        BehaviorId,
        services:  &'a mut BehaviorServices,
        container: &'a BehaviorContainer,
        stack:     &'a dyn StackView,
    ) -> Self {
        Self { can_delegate: false, ..Self::new(id, services, container, stack) }
    }

    // ── Read access ───────────────────────────────────────────────────────────

    pub fn id(&self) -> BehaviorId {
        self.id
    }

    pub fn label(&self) -> &'a str {
        self.container.label(self.id)
    }

    pub fn now_s(&self) -> f64 {
        self.services.clock.now_s()
    }

    pub fn tick(&self) -> Tick {
        self.services.clock.tick()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.services.config
    }

    pub fn whiteboard(&self) -> &Whiteboard {
        &self.services.whiteboard
    }

    pub fn whiteboard_mut(&mut self) -> &mut Whiteboard {
        &mut self.services.whiteboard
    }

    pub fn container(&self) -> &'a BehaviorContainer {
        self.container
    }

    pub fn stack(&self) -> &'a dyn StackView {
        self.stack
    }

    /// Events routed to this behavior for the current tick.
    pub fn events(&self) -> &[RobotEvent] {
        &self.services.event_buffer.events
    }

    /// Actions completed this tick; only non-empty for the top of the stack.
    pub fn actions_completed_this_tick(&self) -> &[CompletedAction] {
        &self.services.event_buffer.actions_completed
    }

    pub fn activation(&self) -> ActivationContext<'_> {
        ActivationContext::new(&*self.services, self.container, self.stack)
    }

    pub fn wants_to_be_activated(&self, behavior: BehaviorId) -> bool {
        self.activation().wants_to_be_activated(behavior)
    }

    pub fn can_be_gently_interrupted(&self, behavior: BehaviorId) -> bool {
        self.container.can_be_gently_interrupted(behavior)
    }

    // ── Delegation state ──────────────────────────────────────────────────────

    pub fn is_activated(&self) -> bool {
        self.stack.is_in_stack(self.id)
    }

    /// Whether this behavior is (or is about to be) the top of the stack.
    pub fn is_in_control(&self) -> bool {
        self.in_control == Some(self.id)
    }

    pub fn is_control_delegated(&self) -> bool {
        self.services.delegation.is_control_delegated(self.id)
    }

    pub fn delegated_behavior(&self) -> Option<BehaviorId> {
        self.services.delegation.delegated_behavior(self.id)
    }

    /// Whether this behavior asked to stop during the current hook.
    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    // ── Delegation primitives ─────────────────────────────────────────────────

    /// Delegate to `delegate` if this behavior is in control and has not
    /// delegated yet.  Returns whether the delegation was accepted.
    pub fn delegate_if_in_control(&mut self, delegate: BehaviorId, callback: Option<CallbackTag>) -> bool {
        if !self.check_can_delegate("Behavior.DelegateIfInControl") {
            return false;
        }
        if !self.is_in_control() {
            debug!(behavior = self.label(), "Behavior.DelegateIfInControl.NotInControl");
            return false;
        }
        if !verify!(
            !self.is_control_delegated(),
            "Behavior.DelegateIfInControl.AlreadyDelegated",
            "{}",
            self.label()
        ) {
            return false;
        }
        if !verify!(
            self.stack.is_valid_delegation(self.id, delegate),
            "Behavior.DelegateIfInControl.InvalidDelegation",
            "{} may not delegate to {}",
            self.label(),
            self.container.label(delegate)
        ) {
            return false;
        }
        let already_active = self.stack.is_in_stack(delegate)
            && !(self.popping_above && self.is_above_self(delegate));
        if !verify!(
            !already_active,
            "Behavior.DelegateIfInControl.DelegateAlreadyInStack",
            "{} is already active",
            self.container.label(delegate)
        ) {
            return false;
        }
        if !self.wants_to_be_activated(delegate) {
            warn!(
                behavior = self.label(),
                delegate = self.container.label(delegate),
                "Behavior.DelegateIfInControl.DelegateDoesNotWantToBeActivated"
            );
            return false;
        }

        self.services.delegation.insert_record(self.id, DelegationRecord {
            delegate: Delegate::Behavior(delegate),
            callback,
        });
        self.services.delegation.push_request(DelegationRequest::PushBehavior {
            delegator: self.id,
            delegate,
        });
        self.in_control = Some(delegate);
        true
    }

    /// Delegate an action if this behavior is in control and has not
    /// delegated yet.  The action does not occupy a stack slot.
    pub fn delegate_action_if_in_control(
        &mut self,
        action:   Box<dyn Action>,
        callback: Option<CallbackTag>,
    ) -> bool {
        if !self.check_can_delegate("Behavior.DelegateActionIfInControl") || !self.is_in_control() {
            return false;
        }
        if !verify!(
            !self.is_control_delegated(),
            "Behavior.DelegateActionIfInControl.AlreadyDelegated",
            "{}",
            self.label()
        ) {
            return false;
        }
        let tag = self.services.actions.next_tag();
        self.services.delegation.insert_record(self.id, DelegationRecord {
            delegate: Delegate::Action(tag),
            callback,
        });
        self.services.actions.queue(tag, action);
        true
    }

    /// Cancel whatever this behavior delegated to, then delegate to `delegate`.
    pub fn delegate_now(&mut self, delegate: BehaviorId, callback: Option<CallbackTag>) -> bool {
        if !self.take_control_now("Behavior.DelegateNow") {
            return false;
        }
        self.delegate_if_in_control(delegate, callback)
    }

    /// Cancel whatever this behavior delegated to, then delegate `action`.
    pub fn delegate_action_now(&mut self, action: Box<dyn Action>, callback: Option<CallbackTag>) -> bool {
        if !self.take_control_now("Behavior.DelegateActionNow") {
            return false;
        }
        self.delegate_action_if_in_control(action, callback)
    }

    fn take_control_now(&mut self, event: &'static str) -> bool {
        if !self.check_can_delegate(event) {
            return false;
        }
        if !verify!(self.is_activated(), event, "{} is not in the stack", self.label()) {
            return false;
        }
        if self.is_control_delegated() {
            self.cancel_delegates(false);
        }
        true
    }

    /// Cancel this behavior's delegate and everything above it.
    ///
    /// With `allow_callback` the completion callback (if one was requested)
    /// is still delivered, with [`DelegateOutcome::Cancelled`].  Returns
    /// whether anything was cancelled.
    pub fn cancel_delegates(&mut self, allow_callback: bool) -> bool {
        if !self.check_can_delegate("Behavior.CancelDelegates") {
            return false;
        }
        let Some(record) = self.services.delegation.remove_record(self.id) else {
            return false;
        };
        match record.delegate {
            Delegate::Behavior(_) => {
                self.services
                    .delegation
                    .push_request(DelegationRequest::PopAbove { behavior: self.id });
                self.popping_above = true;
            }
            Delegate::Action(tag) => {
                self.services.actions.cancel(tag);
            }
        }
        if allow_callback {
            if let Some(cb) = record.callback {
                self.services.delegation.queue_callback(self.id, cb, DelegateOutcome::Cancelled);
            }
        }
        self.in_control = Some(self.id);
        true
    }

    /// Stop this behavior: it and everything above it leave the stack.
    ///
    /// The delegator below receives [`DelegateOutcome::BehaviorStopped`];
    /// this behavior's own pending callbacks are dropped.
    pub fn cancel_self(&mut self) -> bool {
        if !self.check_can_delegate("Behavior.CancelSelf") {
            return false;
        }
        if !self.is_activated() || self.stopping {
            return false;
        }
        if let Some(record) = self.services.delegation.remove_record(self.id) {
            if let Delegate::Action(tag) = record.delegate {
                self.services.actions.cancel(tag);
            }
        }
        self.services
            .delegation
            .push_request(DelegationRequest::PopSelf { behavior: self.id });
        self.in_control = self.stack.behavior_below(self.id);
        self.stopping = true;
        true
    }

    fn is_above_self(&self, behavior: BehaviorId) -> bool {
        let mut cursor = self.stack.behavior_above(self.id);
        while let Some(above) = cursor {
            if above == behavior {
                return true;
            }
            cursor = self.stack.behavior_above(above);
        }
        false
    }

    fn check_can_delegate(&self, event: &'static str) -> bool {
        if self.stopping {
            return false;
        }
        verify!(self.can_delegate, event, "{} may not delegate from this hook", self.label())
    }

    // ── Hook plumbing ─────────────────────────────────────────────────────────

    /// Callbacks owed to this behavior; drained by the container before `update`.
    pub(crate) fn take_callbacks(&mut self) -> Vec<(CallbackTag, DelegateOutcome)> {
        self.services.delegation.take_callbacks(self.id)
    }
}
