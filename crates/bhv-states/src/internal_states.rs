//! `InternalStatesBehavior` — a behavior whose delegate is chosen by a named
//! state machine with conditional transitions.

use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use bhv_behavior::{
    ActivationContext, Behavior, BehaviorConfig, BehaviorContext, BehaviorError, BehaviorFactory,
    BehaviorOperationModifiers, BehaviorResolver, BehaviorResult, BehaviorSet, CallbackTag,
    DelegateOutcome, MOVE_TO_STATE_EVENT,
};
use bhv_core::{verify, BehaviorId, StateId, Tick};

use crate::config::INTERNAL_STATES_KEYS;
use crate::{
    Condition, ConditionContext, ConditionFactory, InternalStatesConfig, NoHooks, StateMachineHooks,
    StateMachineView, StatesError, StatesResult, TransitionType,
};

const CB_PUT_DOWN: CallbackTag = CallbackTag(1);
const CB_GET_IN: CallbackTag = CallbackTag(2);
const CB_MAIN: CallbackTag = CallbackTag(3);

struct Transition {
    to:        StateId,
    kind:      TransitionType,
    condition: Box<dyn Condition>,
}

struct State {
    behavior_label: String,
    behavior:       BehaviorId,
    get_in_label:   Option<String>,
    get_in:         Option<BehaviorId>,
    /// In declaration order; evaluated per type in that order.
    transitions:    Vec<Transition>,
    get_in_ran:     bool,
}

/// A behavior driven by an internal state machine.
///
/// Each state names a main behavior (and optionally a get-in behavior run
/// first).  Every tick the current state's transitions are checked in this
/// order, the first satisfied one winning:
///
/// 1. `Interrupting`, always;
/// 2. `NonInterrupting`, when nothing is delegated or the delegate can be
///    gently interrupted now;
/// 3. `Exit`, once the main behavior has stopped on its own.
///
/// A transition taken on one tick is never followed by another on the same
/// tick.  When the main behavior stops and no `Exit` transition fires, it is
/// started again.
///
/// Forced transitions arrive as [`MOVE_TO_STATE_EVENT`] events whose payload
/// is the target state name.
pub struct InternalStatesBehavior<H: StateMachineHooks = NoHooks> {
    view:                StateMachineView,
    states:              Vec<State>,
    default_state:       StateId,
    resume_replacements: Vec<(StateId, StateId)>,

    put_down_label: Option<String>,
    put_down:       Option<BehaviorId>,

    is_running_put_down:  bool,
    is_running_get_in:    bool,
    last_transition_tick: Option<Tick>,

    hooks: H,
}

impl InternalStatesBehavior<NoHooks> {
    pub const CLASS: &'static str = "InternalStatesBehavior";

    pub fn from_config(config: &BehaviorConfig, conditions: &ConditionFactory) -> StatesResult<Self> {
        Self::with_hooks(config, conditions, |_| Ok(NoHooks))
    }
}

impl<H: StateMachineHooks> InternalStatesBehavior<H> {
    /// Parse states and transitions from `config`, then build the hooks,
    /// which may resolve state names through the view they are handed.
    pub fn with_hooks<F>(config: &BehaviorConfig, conditions: &ConditionFactory, make_hooks: F) -> StatesResult<Self>
    where
        F: FnOnce(&StateMachineView) -> StatesResult<H>,
    {
        let parsed: InternalStatesConfig = serde_json::from_value(Value::Object(config.params.clone()))?;
        Self::from_parsed(parsed, conditions, make_hooks)
    }

    pub fn from_parsed<F>(parsed: InternalStatesConfig, conditions: &ConditionFactory, make_hooks: F) -> StatesResult<Self>
    where
        F: FnOnce(&StateMachineView) -> StatesResult<H>,
    {
        let mut view = StateMachineView::new();
        let mut states = Vec::with_capacity(parsed.states.len());
        for state in parsed.states {
            view.add_state(&state.name)?;
            states.push(State {
                behavior_label: state.behavior,
                behavior:       BehaviorId::INVALID,
                get_in_label:   state.get_in_behavior,
                get_in:         None,
                transitions:    Vec::new(),
                get_in_ran:     false,
            });
        }
        let default_state = view.require_state(&parsed.initial_state)?;

        for group in &parsed.transition_definitions {
            for from in &group.from {
                let from = view.require_state(from)?;
                for transition in &group.transitions {
                    let to = view.require_state(&transition.to)?;
                    // Conditions carry per-state timers, so each source state gets its own.
                    let condition = conditions.create(&transition.condition, &view)?;
                    states[from.index() - 1].transitions.push(Transition { to, kind: transition.kind, condition });
                }
            }
        }

        if !parsed.ignore_missing_transitions {
            if let Some(id) = view.state_ids().find(|id| states[id.index() - 1].transitions.is_empty()) {
                let name = view.state_name(id).unwrap_or_default().to_owned();
                return Err(StatesError::NoTransitions(name));
            }
        }

        let resume_replacements = parsed
            .resume_replacements
            .iter()
            .map(|r| Ok((view.require_state(&r.resume_state)?, view.require_state(&r.replacement)?)))
            .collect::<StatesResult<Vec<_>>>()?;

        let hooks = make_hooks(&view)?;
        Ok(Self {
            view,
            states,
            default_state,
            resume_replacements,
            put_down_label: parsed.put_down_object_behavior,
            put_down: None,
            is_running_put_down: false,
            is_running_get_in: false,
            last_transition_tick: None,
            hooks,
        })
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    pub fn view(&self) -> &StateMachineView {
        &self.view
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.view.state_id(name)
    }

    pub fn state_name(&self, state: StateId) -> Option<&str> {
        self.view.state_name(state)
    }

    pub fn current_state_id(&self) -> StateId {
        self.view.current_state_id()
    }

    pub fn current_state_name(&self) -> Option<&str> {
        self.view.current_state_name()
    }

    pub fn last_time_started(&self, state: StateId) -> Option<f64> {
        self.view.last_time_started(state)
    }

    pub fn last_time_ended(&self, state: StateId) -> Option<f64> {
        self.view.last_time_ended(state)
    }

    pub fn is_state_running(&self, name: &str) -> bool {
        self.view.state_id(name).is_some_and(|id| self.view.is_state_running(id))
    }

    /// Condition labels of every transition, grouped by source state name.
    pub fn all_transitions(&self) -> Vec<(String, Vec<String>)> {
        self.view
            .state_ids()
            .map(|id| {
                let name = self.view.state_name(id).unwrap_or_default().to_owned();
                let labels = self.state(id).map_or_else(Vec::new, |s| {
                    s.transitions.iter().map(|t| t.condition.label()).collect()
                });
                (name, labels)
            })
            .collect()
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.index().checked_sub(1)?)
    }

    fn state_mut(&mut self, id: StateId) -> Option<&mut State> {
        self.states.get_mut(id.index().checked_sub(1)?)
    }

    fn name_of(&self, id: StateId) -> &str {
        self.view.state_name(id).unwrap_or("<invalid>")
    }

    /// First satisfied transition of `kind` out of the current state.
    fn find_transition(&self, kind: TransitionType, ctx: &BehaviorContext<'_>) -> Option<StateId> {
        let state = self.state(self.view.current_state_id())?;
        let cctx = ConditionContext::new(ctx.activation(), &self.view);
        state
            .transitions
            .iter()
            .filter(|t| t.kind == kind)
            .find(|t| t.condition.are_conditions_met(&cctx))
            .map(|t| t.to)
    }

    fn set_conditions_active(&mut self, state: StateId, active: bool, now_s: f64) {
        if let Some(state) = self.state_mut(state) {
            for transition in &mut state.transitions {
                transition.condition.set_active(active, now_s);
            }
        }
    }

    fn leave_current_state(&mut self, ctx: &mut BehaviorContext<'_>) {
        let current = self.view.current_state_id();
        if !current.is_valid() {
            return;
        }
        let now = ctx.now_s();
        self.view.exit(current, now);
        self.set_conditions_active(current, false, now);
        if ctx.is_control_delegated() {
            ctx.cancel_delegates(false);
        }
        self.is_running_put_down = false;
        self.is_running_get_in = false;
    }

    fn enter_state(&mut self, target: StateId, ctx: &mut BehaviorContext<'_>) {
        let now = ctx.now_s();
        self.view.enter(target, now);
        self.set_conditions_active(target, true, now);
        if let Some(state) = self.state_mut(target) {
            state.get_in_ran = false;
        }
        self.last_transition_tick = Some(ctx.tick());
        self.run_state(ctx);
    }

    fn transition_to_state(&mut self, target: StateId, ctx: &mut BehaviorContext<'_>) {
        let old = self.view.current_state_id();
        info!(
            behavior = ctx.label(),
            from = self.name_of(old),
            to = self.name_of(target),
            "InternalStatesBehavior.TransitionToState"
        );
        self.leave_current_state(ctx);
        self.hooks.on_state_name_change(self.name_of(old), self.name_of(target));
        self.enter_state(target, ctx);
    }

    /// Delegate to whatever the current state should be running now.
    fn run_state(&mut self, ctx: &mut BehaviorContext<'_>) {
        if ctx.is_control_delegated() {
            return;
        }
        if self.put_down_if_necessary(ctx) || self.run_get_in_if_able(ctx) {
            return;
        }
        self.run_main_state_behavior(ctx);
    }

    fn put_down_if_necessary(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let Some(put_down) = self.put_down else { return false };
        let Some(state) = self.state(self.view.current_state_id()) else { return false };
        if !ctx.whiteboard().robot.carrying_object {
            return false;
        }
        let allows_carrying = ctx
            .container()
            .modifiers(state.behavior)
            .is_some_and(|m| m.wants_to_be_activated_when_carrying_object);
        if allows_carrying {
            return false;
        }
        if ctx.delegate_if_in_control(put_down, Some(CB_PUT_DOWN)) {
            debug!(behavior = ctx.label(), "InternalStatesBehavior.PutDownObject");
            self.is_running_put_down = true;
            return true;
        }
        false
    }

    fn run_get_in_if_able(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let current = self.view.current_state_id();
        let Some(state) = self.state(current) else { return false };
        let Some(get_in) = state.get_in else { return false };
        if state.get_in_ran || !ctx.wants_to_be_activated(get_in) {
            return false;
        }
        if !ctx.delegate_if_in_control(get_in, Some(CB_GET_IN)) {
            return false;
        }
        self.is_running_get_in = true;
        if let Some(state) = self.state_mut(current) {
            state.get_in_ran = true;
        }
        true
    }

    fn run_main_state_behavior(&mut self, ctx: &mut BehaviorContext<'_>) {
        let current = self.view.current_state_id();
        let Some(behavior) = self.state(current).map(|s| s.behavior) else { return };
        if !ctx.wants_to_be_activated(behavior) {
            debug!(
                behavior = ctx.label(),
                state = self.name_of(current),
                delegate = ctx.container().label(behavior),
                "InternalStatesBehavior.RunMainStateBehavior.DoesNotWantToBeActivated"
            );
            return;
        }
        ctx.delegate_if_in_control(behavior, Some(CB_MAIN));
    }

    /// Apply any `MoveToState` event this tick.  Returns whether one applied.
    fn handle_forced_transitions(&mut self, ctx: &mut BehaviorContext<'_>) -> bool {
        let requested: Vec<String> = ctx
            .events()
            .iter()
            .filter(|e| e.tag == MOVE_TO_STATE_EVENT)
            .filter_map(|e| e.payload_str().map(str::to_owned))
            .collect();

        let mut moved = false;
        for name in requested {
            match self.view.state_id(&name) {
                Some(target) => {
                    info!(behavior = ctx.label(), state = %name, "InternalStatesBehavior.MoveToState");
                    self.transition_to_state(target, ctx);
                    moved = true;
                }
                None => warn!(behavior = ctx.label(), state = %name, "InternalStatesBehavior.MoveToState.UnknownState"),
            }
        }
        moved
    }

    fn resume_state(&mut self, ctx: &mut BehaviorContext<'_>) -> StateId {
        let previous = self.view.resume_state_id();
        let mut resume = if previous.is_valid() { previous } else { self.default_state };
        if let Some(&(_, replacement)) = self.resume_replacements.iter().find(|(from, _)| *from == resume) {
            debug!(
                behavior = ctx.label(),
                from = self.name_of(resume),
                to = self.name_of(replacement),
                "InternalStatesBehavior.ResumeReplacement"
            );
            resume = replacement;
        }
        self.hooks.override_resume_state(&mut resume, &self.view, ctx);
        if !verify!(
            self.state(resume).is_some(),
            "InternalStatesBehavior.OnActivated.InvalidResumeState",
            "{}",
            ctx.label()
        ) {
            resume = self.default_state;
        }
        resume
    }
}

impl<H: StateMachineHooks> Behavior for InternalStatesBehavior<H> {
    fn init(&mut self, resolver: &BehaviorResolver<'_>) -> BehaviorResult<()> {
        for state in &mut self.states {
            state.behavior = resolver.find(&state.behavior_label)?;
            state.get_in = state.get_in_label.as_deref().map(|l| resolver.find(l)).transpose()?;
        }
        self.put_down = self.put_down_label.as_deref().map(|l| resolver.find(l)).transpose()?;
        Ok(())
    }

    fn expected_json_keys(&self, keys: &mut BTreeSet<&'static str>) {
        keys.extend(INTERNAL_STATES_KEYS);
        self.hooks.expected_json_keys(keys);
    }

    /// The machine stays active while its state behavior declines to run, and
    /// puts carried objects down itself.
    fn operation_modifiers(&self, modifiers: &mut BehaviorOperationModifiers) {
        modifiers.behavior_always_delegates = false;
        modifiers.wants_to_be_activated_when_carrying_object = true;
        modifiers.wants_to_be_activated_when_off_treads = true;
    }

    fn subscribed_events(&self, tags: &mut BTreeSet<String>) {
        tags.insert(MOVE_TO_STATE_EVENT.to_owned());
    }

    fn all_delegates(&self, delegates: &mut BehaviorSet) {
        for state in &self.states {
            delegates.insert(state.behavior);
            delegates.extend(state.get_in);
        }
        delegates.extend(self.put_down);
    }

    fn wants_to_be_activated(&self, _ctx: &ActivationContext<'_>) -> bool {
        true
    }

    fn on_activated(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.view.on_activated(ctx.now_s());
        self.is_running_put_down = false;
        self.is_running_get_in = false;

        let target = self.resume_state(ctx);
        self.hooks.on_activated_internal(ctx);

        let old = self.view.resume_state_id();
        if old != target && old.is_valid() {
            self.hooks.on_state_name_change(self.name_of(old), self.name_of(target));
        }
        debug!(behavior = ctx.label(), state = self.name_of(target), "InternalStatesBehavior.OnActivated");
        self.enter_state(target, ctx);
    }

    fn on_deactivated(&mut self, ctx: &mut BehaviorContext<'_>) {
        let current = self.view.current_state_id();
        let now = ctx.now_s();
        if current.is_valid() {
            self.view.exit(current, now);
            self.set_conditions_active(current, false, now);
        }
        self.view.on_deactivated();
        self.is_running_put_down = false;
        self.is_running_get_in = false;
        self.hooks.on_deactivated_internal(ctx);
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) {
        if self.handle_forced_transitions(ctx) {
            return;
        }
        if self.last_transition_tick == Some(ctx.tick()) {
            return;
        }

        if let Some(target) = self.find_transition(TransitionType::Interrupting, ctx) {
            self.transition_to_state(target, ctx);
            return;
        }

        let gentle = match ctx.delegated_behavior() {
            Some(delegate) => ctx.can_be_gently_interrupted(delegate),
            None => !ctx.is_control_delegated(),
        };
        if gentle {
            if let Some(target) = self.find_transition(TransitionType::NonInterrupting, ctx) {
                self.transition_to_state(target, ctx);
                return;
            }
        }

        if ctx.is_control_delegated() || self.is_running_get_in || self.is_running_put_down {
            return;
        }
        if let Some(target) = self.find_transition(TransitionType::Exit, ctx) {
            self.transition_to_state(target, ctx);
            return;
        }
        debug!(
            behavior = ctx.label(),
            state = self.name_of(self.view.current_state_id()),
            "InternalStatesBehavior.Update.RestartingStateBehavior"
        );
        self.run_state(ctx);
    }

    fn on_delegate_complete(&mut self, tag: CallbackTag, outcome: DelegateOutcome, ctx: &mut BehaviorContext<'_>) {
        match tag {
            CB_PUT_DOWN => {
                self.is_running_put_down = false;
                self.run_state(ctx);
            }
            CB_GET_IN => {
                self.is_running_get_in = false;
                self.run_state(ctx);
            }
            _ => {
                debug!(
                    behavior = ctx.label(),
                    state = self.name_of(self.view.current_state_id()),
                    ?outcome,
                    "InternalStatesBehavior.StateBehaviorEnded"
                );
            }
        }
    }
}

// ── Factory registration ──────────────────────────────────────────────────────

/// Register `InternalStatesBehavior` (without hooks) under its class name.
pub fn register_internal_states(factory: &mut BehaviorFactory, conditions: Rc<ConditionFactory>) {
    register_internal_states_with(factory, InternalStatesBehavior::<NoHooks>::CLASS, conditions, |_, _| Ok(NoHooks));
}

/// Register a hooked state machine under `class`.  `make_hooks` reads its own
/// keys from the definition and may resolve state names through the view.
pub fn register_internal_states_with<H, F>(
    factory:    &mut BehaviorFactory,
    class:      &str,
    conditions: Rc<ConditionFactory>,
    make_hooks: F,
) where
    H: StateMachineHooks,
    F: Fn(&BehaviorConfig, &StateMachineView) -> StatesResult<H> + 'static,
{
    factory.register(class, move |config| {
        let machine = InternalStatesBehavior::with_hooks(config, &conditions, |view| make_hooks(config, view))
            .map_err(|e| BehaviorError::Config(format!("{}: {e}", config.label)))?;
        Ok(Box::new(machine) as Box<dyn Behavior>)
    });
}
