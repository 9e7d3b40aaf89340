//! The `Behavior` trait — the main extension point for user code.

use std::any::Any;
use std::collections::BTreeSet;

use bhv_core::BehaviorId;

use crate::{
    ActivationContext, BehaviorContext, BehaviorOperationModifiers, BehaviorResolver,
    BehaviorResult, CallbackTag, DelegateOutcome,
};

/// Ordered set of behavior handles.  Ordered so that traversal, scope
/// notifications, and debug output are deterministic.
pub type BehaviorSet = BTreeSet<BehaviorId>;

/// Where a behavior is in its activation lifecycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ActivationState {
    #[default]
    NotActivated,
    Activated,
    Deactivated,
}

/// Upcast helper so the container can hand out concrete behavior types.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node of the behavior tree.
///
/// The container owns every behavior for the lifetime of the system; the
/// stack only refers to them by [`BehaviorId`].  Only
/// [`wants_to_be_activated`][Self::wants_to_be_activated] is required; every
/// other hook defaults to a no-op.
///
/// # Contract
///
/// - The sets reported by [`all_delegates`][Self::all_delegates] and
///   [`linked_activatable_scope`][Self::linked_activatable_scope] are fixed
///   after [`init`][Self::init].  Both methods must only *add* to the set
///   they are given.
/// - A behavior may only delegate to a member of its declared delegates.
/// - Delegation, cancellation, and completion callbacks go through the
///   [`BehaviorContext`] handed to the hooks; no hook mutates the stack.
pub trait Behavior: AsAny {
    /// Resolve configured names to handles.  Called once, before any other hook.
    fn init(&mut self, _resolver: &BehaviorResolver<'_>) -> BehaviorResult<()> {
        Ok(())
    }

    /// JSON keys this behavior reads beyond `behaviorClass`, `behaviorID`,
    /// and the operation modifier keys.  Anything else is rejected at load.
    fn expected_json_keys(&self, _keys: &mut BTreeSet<&'static str>) {}

    /// Adjust the operation modifiers.  Read once, after `init`.
    fn operation_modifiers(&self, _modifiers: &mut BehaviorOperationModifiers) {}

    /// Event tags this behavior wants routed to it.
    fn subscribed_events(&self, _tags: &mut BTreeSet<String>) {}

    /// Every behavior this one may ever delegate to.
    fn all_delegates(&self, _delegates: &mut BehaviorSet) {}

    /// Behaviors that must be in activatable scope whenever this one is,
    /// without being direct delegates.
    fn linked_activatable_scope(&self, _linked: &mut BehaviorSet) {}

    /// Whether the behavior would run if asked to right now.
    ///
    /// The container combines this with the operation-modifier gating; call
    /// [`ActivationContext::wants_to_be_activated`] rather than this directly.
    fn wants_to_be_activated(&self, ctx: &ActivationContext<'_>) -> bool;

    /// Whether a non-interrupting transition may replace this behavior now.
    fn can_be_gently_interrupted_now(&self) -> bool {
        false
    }

    fn on_entered_activatable_scope(&mut self) {}
    fn on_left_activatable_scope(&mut self) {}

    fn on_activated(&mut self, _ctx: &mut BehaviorContext<'_>) {}

    /// Called while the behavior is still on the stack, after everything
    /// above it has been popped.  Delegation calls are refused here.
    fn on_deactivated(&mut self, _ctx: &mut BehaviorContext<'_>) {}

    /// Once per tick while activated.
    fn update(&mut self, _ctx: &mut BehaviorContext<'_>) {}

    /// A delegation made with `Some(tag)` ended.  Delivered at the start of
    /// this behavior's next update.
    fn on_delegate_complete(
        &mut self,
        _tag:     CallbackTag,
        _outcome: DelegateOutcome,
        _ctx:     &mut BehaviorContext<'_>,
    ) {
    }
}
