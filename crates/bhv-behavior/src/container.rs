//! `BehaviorContainer` — the arena that owns every behavior.
//!
//! Behaviors are created once at load, never removed, and referred to by
//! [`BehaviorId`] (their index in the arena).  Each slot also carries the
//! bookkeeping the base layer keeps for every behavior: activation state and
//! times, the in-scope reference count, and the operation modifiers.
//!
//! Hooks are invoked by *checking out* the behavior from its slot: the boxed
//! behavior is taken out, the hook runs with a shared view of the rest of the
//! container, and the behavior is put back.  A behavior can therefore read
//! its siblings (ask whether a delegate wants to run, for instance) while it
//! is being mutated, without aliasing.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use bhv_core::{verify, BehaviorId, BehaviorRng, BhvError};

use crate::{
    ActivationContext, ActivationState, Behavior, BehaviorContext, BehaviorError,
    BehaviorOperationModifiers, BehaviorResult, BehaviorServices, BehaviorSet, StackView,
};

// ── BehaviorSlot ──────────────────────────────────────────────────────────────

pub struct BehaviorSlot {
    label:      String,
    class_name: String,
    behavior:   Option<Box<dyn Behavior>>,

    modifiers:          BehaviorOperationModifiers,
    json_modifier_keys: BTreeSet<String>,

    state:             ActivationState,
    activation_count:  u32,
    last_activated_s:  Option<f64>,
    first_activated_s: Option<f64>,
    scope_count:       u32,
    initialized:       bool,
}

impl BehaviorSlot {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn modifiers(&self) -> &BehaviorOperationModifiers {
        &self.modifiers
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn activation_count(&self) -> u32 {
        self.activation_count
    }

    /// Robot time of the most recent activation.
    pub fn last_activated_s(&self) -> Option<f64> {
        self.last_activated_s
    }

    /// Robot time of the first activation ever.
    pub fn first_activated_s(&self) -> Option<f64> {
        self.first_activated_s
    }

    /// Number of stack entries currently holding this behavior in scope.
    pub fn scope_count(&self) -> u32 {
        self.scope_count
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

// ── BehaviorResolver ──────────────────────────────────────────────────────────

/// Name lookup handed to [`Behavior::init`].
pub struct BehaviorResolver<'a> {
    container: &'a BehaviorContainer,
    owner:     BehaviorId,
    seed:      u64,
}

impl<'a> BehaviorResolver<'a> {
    pub fn owner(&self) -> BehaviorId {
        self.owner
    }

    pub fn owner_label(&self) -> &'a str {
        self.container.label(self.owner)
    }

    /// Resolve a behavior label, failing with the owner named in the error.
    pub fn find(&self, label: &str) -> BehaviorResult<BehaviorId> {
        self.container.find_by_label(label).ok_or_else(|| BehaviorError::UnknownDelegate {
            owner:  self.owner_label().to_owned(),
            target: label.to_owned(),
        })
    }

    /// Deterministic RNG stream for the owning behavior.
    pub fn rng(&self) -> BehaviorRng {
        BehaviorRng::new(self.seed, self.owner)
    }

    pub fn container(&self) -> &'a BehaviorContainer {
        self.container
    }
}

// ── BehaviorContainer ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct BehaviorContainer {
    slots:    Vec<BehaviorSlot>,
    by_label: FxHashMap<String, BehaviorId>,
}

impl BehaviorContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a behavior under a unique label with default operation modifiers.
    pub fn add(
        &mut self,
        label:      impl Into<String>,
        class_name: impl Into<String>,
        behavior:   Box<dyn Behavior>,
    ) -> BehaviorResult<BehaviorId> {
        self.add_with_modifiers(label, class_name, behavior, BehaviorOperationModifiers::default(), BTreeSet::new())
    }

    /// Store a behavior whose modifier defaults were already read from JSON.
    pub fn add_with_modifiers(
        &mut self,
        label:              impl Into<String>,
        class_name:         impl Into<String>,
        behavior:           Box<dyn Behavior>,
        modifiers:          BehaviorOperationModifiers,
        json_modifier_keys: BTreeSet<String>,
    ) -> BehaviorResult<BehaviorId> {
        let label = label.into();
        if self.by_label.contains_key(&label) {
            return Err(BehaviorError::DuplicateLabel(label));
        }
        let id = BehaviorId::try_from(self.slots.len())
            .map_err(|_| BehaviorError::Config("behavior arena is full".to_owned()))?;

        self.by_label.insert(label.clone(), id);
        self.slots.push(BehaviorSlot {
            label,
            class_name: class_name.into(),
            behavior: Some(behavior),
            modifiers,
            json_modifier_keys,
            state: ActivationState::NotActivated,
            activation_count: 0,
            last_activated_s: None,
            first_activated_s: None,
            scope_count: 0,
            initialized: false,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = BehaviorId> + '_ {
        (0..self.slots.len() as u32).map(BehaviorId)
    }

    pub fn contains(&self, id: BehaviorId) -> bool {
        id.index() < self.slots.len()
    }

    pub fn find_by_label(&self, label: &str) -> Option<BehaviorId> {
        self.by_label.get(label).copied()
    }

    pub fn require(&self, label: &str) -> BehaviorResult<BehaviorId> {
        self.find_by_label(label)
            .ok_or_else(|| BhvError::UnknownLabel(label.to_owned()).into())
    }

    /// Label of `id`, or `"<invalid>"` for a handle not in the arena.
    pub fn label(&self, id: BehaviorId) -> &str {
        self.slots.get(id.index()).map_or("<invalid>", |s| s.label.as_str())
    }

    pub fn slot(&self, id: BehaviorId) -> Option<&BehaviorSlot> {
        self.slots.get(id.index())
    }

    pub fn modifiers(&self, id: BehaviorId) -> Option<&BehaviorOperationModifiers> {
        self.slot(id).map(|s| &s.modifiers)
    }

    pub fn is_activated(&self, id: BehaviorId) -> bool {
        self.slot(id).is_some_and(|s| s.state == ActivationState::Activated)
    }

    pub fn is_in_activatable_scope(&self, id: BehaviorId) -> bool {
        self.slot(id).is_some_and(|s| s.scope_count > 0)
    }

    /// Concrete behavior behind `id`, if it has type `T` and is not checked out.
    pub fn get<T: Behavior>(&self, id: BehaviorId) -> Option<&T> {
        let behavior: &dyn Behavior = self.slots.get(id.index())?.behavior.as_deref()?;
        behavior.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: Behavior>(&mut self, id: BehaviorId) -> Option<&mut T> {
        let behavior: &mut dyn Behavior = self.slots.get_mut(id.index())?.behavior.as_deref_mut()?;
        behavior.as_any_mut().downcast_mut::<T>()
    }

    pub fn get_by_label<T: Behavior>(&self, label: &str) -> Option<&T> {
        self.get(self.find_by_label(label)?)
    }

    // ── Queries forwarded to behaviors ────────────────────────────────────────

    fn behavior(&self, id: BehaviorId, event: &'static str) -> Option<&dyn Behavior> {
        let slot = self.slots.get(id.index())?;
        let behavior = slot.behavior.as_deref();
        verify!(behavior.is_some(), event, "{} is checked out", slot.label);
        behavior
    }

    pub fn all_delegates(&self, id: BehaviorId) -> BehaviorSet {
        let mut delegates = BehaviorSet::new();
        if let Some(b) = self.behavior(id, "BehaviorContainer.AllDelegates.CheckedOut") {
            b.all_delegates(&mut delegates);
        }
        delegates
    }

    /// Add `id`'s linked activatable scope to `linked`.
    pub fn linked_activatable_scope(&self, id: BehaviorId, linked: &mut BehaviorSet) {
        if let Some(b) = self.behavior(id, "BehaviorContainer.LinkedActivatableScope.CheckedOut") {
            b.linked_activatable_scope(linked);
        }
    }

    pub fn can_be_gently_interrupted(&self, id: BehaviorId) -> bool {
        self.behavior(id, "BehaviorContainer.CanBeGentlyInterrupted.CheckedOut")
            .is_some_and(|b| b.can_be_gently_interrupted_now())
    }

    /// The behavior's own answer combined with operation-modifier gating
    /// against the robot facts on the whiteboard.
    pub fn wants_to_be_activated(&self, id: BehaviorId, ctx: &ActivationContext<'_>) -> bool {
        let Some(slot) = self.slots.get(id.index()) else {
            return false;
        };
        let Some(behavior) = self.behavior(id, "BehaviorContainer.WantsToBeActivated.CheckedOut") else {
            return false;
        };

        let m = &slot.modifiers;
        let robot = &ctx.services.whiteboard.robot;
        if robot.carrying_object && !m.wants_to_be_activated_when_carrying_object {
            return false;
        }
        if robot.off_treads && !m.wants_to_be_activated_when_off_treads {
            return false;
        }
        if robot.on_charger && !m.wants_to_be_activated_when_on_charger {
            return false;
        }
        if m.cube_connection_requirements.requires_connection() && !robot.cube_connected {
            return false;
        }
        behavior.wants_to_be_activated(ctx)
    }

    // ── Init ──────────────────────────────────────────────────────────────────

    /// Run `init` on every behavior, then read operation modifiers and event
    /// subscriptions.  Delegate sets are fixed from here on.
    pub fn init_all(&mut self, services: &mut BehaviorServices) -> BehaviorResult<()> {
        for idx in 0..self.slots.len() {
            let id = BehaviorId(idx as u32);
            if self.slots[idx].initialized {
                continue;
            }
            let Some(mut behavior) = self.slots[idx].behavior.take() else {
                continue;
            };

            let resolver = BehaviorResolver { container: self, owner: id, seed: services.config.seed };
            let result = behavior.init(&resolver);

            let json_defaults = self.slots[idx].modifiers.clone();
            let mut modifiers = json_defaults.clone();
            behavior.operation_modifiers(&mut modifiers);
            let overridden = json_defaults.changed_keys(&modifiers, &self.slots[idx].json_modifier_keys);
            if !overridden.is_empty() {
                warn!(
                    behavior = %self.slots[idx].label,
                    keys = ?overridden,
                    "BehaviorContainer.InitAll.JsonModifierOverriddenInCode"
                );
            }

            let mut tags = BTreeSet::new();
            behavior.subscribed_events(&mut tags);
            for tag in tags {
                services.message_gate.subscribe(id, tag);
            }

            let slot = &mut self.slots[idx];
            slot.modifiers = modifiers;
            slot.behavior = Some(behavior);
            slot.initialized = true;
            result?;
        }
        Ok(())
    }

    // ── Lifecycle (driven by the stack) ───────────────────────────────────────

    fn check_out(&mut self, id: BehaviorId) -> Option<Box<dyn Behavior>> {
        let slot = self.slots.get_mut(id.index())?;
        let behavior = slot.behavior.take();
        verify!(behavior.is_some(), "BehaviorContainer.CheckOut.AlreadyCheckedOut", "{}", slot.label);
        behavior
    }

    fn check_in(&mut self, id: BehaviorId, behavior: Box<dyn Behavior>) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            slot.behavior = Some(behavior);
        }
    }

    /// One more stack entry holds `id` in scope.  The hook fires on the
    /// first reference only.
    pub fn entered_activatable_scope(&mut self, id: BehaviorId, services: &mut BehaviorServices) {
        let Some(slot) = self.slots.get_mut(id.index()) else { return };
        slot.scope_count += 1;
        if slot.scope_count == 1 {
            services.vision_modes.request(&slot.modifiers.vision_modes_for_activatable_scope);
            if let Some(b) = slot.behavior.as_mut() {
                b.on_entered_activatable_scope();
            }
        }
    }

    /// One fewer stack entry holds `id` in scope.  The hook fires when the
    /// last reference is released.
    pub fn left_activatable_scope(&mut self, id: BehaviorId, services: &mut BehaviorServices) {
        let Some(slot) = self.slots.get_mut(id.index()) else { return };
        if !verify!(
            slot.scope_count > 0,
            "BehaviorContainer.LeftActivatableScope.NotInScope",
            "{}",
            slot.label
        ) {
            return;
        }
        slot.scope_count -= 1;
        if slot.scope_count == 0 {
            services.vision_modes.release(&slot.modifiers.vision_modes_for_activatable_scope);
            if let Some(b) = slot.behavior.as_mut() {
                b.on_left_activatable_scope();
            }
        }
    }

    pub fn activate(&mut self, id: BehaviorId, services: &mut BehaviorServices, stack: &dyn StackView) {
        let now = services.clock.now_s();
        let Some(slot) = self.slots.get_mut(id.index()) else { return };
        slot.state = ActivationState::Activated;
        slot.activation_count += 1;
        slot.last_activated_s = Some(now);
        slot.first_activated_s.get_or_insert(now);
        services.vision_modes.request(&slot.modifiers.vision_modes_for_active_scope);
        debug!(behavior = %slot.label, count = slot.activation_count, "Behavior.Activated");

        let Some(mut behavior) = self.check_out(id) else { return };
        {
            let mut ctx = BehaviorContext::new(id, services, &*self, stack);
            behavior.on_activated(&mut ctx);
        }
        self.check_in(id, behavior);
    }

    pub fn deactivate(&mut self, id: BehaviorId, services: &mut BehaviorServices, stack: &dyn StackView) {
        let Some(mut behavior) = self.check_out(id) else { return };
        {
            let mut ctx = BehaviorContext::without_delegation(id, services, &*self, stack);
            behavior.on_deactivated(&mut ctx);
        }
        self.check_in(id, behavior);

        let Some(slot) = self.slots.get_mut(id.index()) else { return };
        slot.state = ActivationState::Deactivated;
        services.vision_modes.release(&slot.modifiers.vision_modes_for_active_scope);
        debug!(behavior = %slot.label, "Behavior.Deactivated");
    }

    /// Deliver owed callbacks, run `update`, then apply the always-delegates
    /// auto-cancel.
    pub fn update(&mut self, id: BehaviorId, services: &mut BehaviorServices, stack: &dyn StackView) {
        let always_delegates = self
            .modifiers(id)
            .is_some_and(|m| m.behavior_always_delegates);
        let Some(mut behavior) = self.check_out(id) else { return };
        {
            let mut ctx = BehaviorContext::new(id, services, &*self, stack);
            for (tag, outcome) in ctx.take_callbacks() {
                if ctx.is_stopping() {
                    break;
                }
                behavior.on_delegate_complete(tag, outcome, &mut ctx);
            }
            if !ctx.is_stopping() {
                behavior.update(&mut ctx);
            }
            if always_delegates && !ctx.is_stopping() && !ctx.is_control_delegated() {
                debug!(behavior = ctx.label(), "Behavior.Update.NoDelegateCancellingSelf");
                ctx.cancel_self();
            }
        }
        self.check_in(id, behavior);
    }
}
