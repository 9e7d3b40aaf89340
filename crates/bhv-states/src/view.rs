//! `StateMachineView` — state names and timing, readable by conditions.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use bhv_core::StateId;

use crate::{StatesError, StatesResult};

/// What [`StateMachineView::state_exit_cooldown_expired`] answers for a state
/// that has never run.
///
/// "Never ran" has to be told apart from "ran long ago": a cooldown gating a
/// rare reaction usually defaults to ready, one gating a wander to not yet.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownDefault {
    #[default]
    True,
    False,
    /// Measure from the state machine's most recent activation.
    UseBehaviorActivationTime,
    /// Measure from the state machine's first-ever activation.
    UseFirstBehaviorActivationTime,
}

#[derive(Clone, Debug, Default)]
struct StateTiming {
    last_started_s: Option<f64>,
    last_ended_s:   Option<f64>,
}

/// Names, current state, and start/end times of one state machine.
///
/// `StateId(0)` is invalid; states are numbered from 1 in declaration order.
#[derive(Clone, Debug, Default)]
pub struct StateMachineView {
    names:   Vec<String>,
    by_name: FxHashMap<String, StateId>,
    timing:  Vec<StateTiming>,

    current:     StateId,
    resume_from: StateId,
    active:      bool,

    activated_s:       Option<f64>,
    first_activated_s: Option<f64>,
}

impl StateMachineView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state name, returning its id.
    pub fn add_state(&mut self, name: &str) -> StatesResult<StateId> {
        if self.by_name.contains_key(name) {
            return Err(StatesError::DuplicateState(name.to_owned()));
        }
        self.names.push(name.to_owned());
        self.timing.push(StateTiming::default());
        let id = StateId(self.names.len() as u32);
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateId> + '_ {
        (1..=self.names.len() as u32).map(StateId)
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    pub fn require_state(&self, name: &str) -> StatesResult<StateId> {
        self.state_id(name).ok_or_else(|| StatesError::UnknownState(name.to_owned()))
    }

    pub fn state_name(&self, state: StateId) -> Option<&str> {
        let index = state.index().checked_sub(1)?;
        self.names.get(index).map(String::as_str)
    }

    pub fn current_state_id(&self) -> StateId {
        self.current
    }

    /// The state the machine was in when it last deactivated.
    pub fn resume_state_id(&self) -> StateId {
        self.resume_from
    }

    pub fn current_state_name(&self) -> Option<&str> {
        self.state_name(self.current)
    }

    /// Whether the state machine is active and sitting in `state`.
    pub fn is_state_running(&self, state: StateId) -> bool {
        self.active && self.current == state && state.is_valid()
    }

    pub fn last_time_started(&self, state: StateId) -> Option<f64> {
        self.timing(state)?.last_started_s
    }

    pub fn last_time_ended(&self, state: StateId) -> Option<f64> {
        self.timing(state)?.last_ended_s
    }

    /// Seconds spent in the current state, or zero when inactive.
    pub fn current_state_active_time(&self, now_s: f64) -> f64 {
        if !self.active {
            return 0.0;
        }
        self.last_time_started(self.current).map_or(0.0, |t| (now_s - t).max(0.0))
    }

    pub fn activated_s(&self) -> Option<f64> {
        self.activated_s
    }

    pub fn first_activated_s(&self) -> Option<f64> {
        self.first_activated_s
    }

    /// Whether `state` last ended at least `timeout_s` before `now_s`.
    pub fn state_exit_cooldown_expired(
        &self,
        state:     StateId,
        timeout_s: f64,
        never_run: CooldownDefault,
        now_s:     f64,
    ) -> bool {
        let elapsed_since = |t: Option<f64>| t.is_some_and(|t| now_s - t >= timeout_s);
        if let Some(ended) = self.last_time_ended(state) {
            return now_s - ended >= timeout_s;
        }
        match never_run {
            CooldownDefault::True => true,
            CooldownDefault::False => false,
            CooldownDefault::UseBehaviorActivationTime => elapsed_since(self.activated_s),
            CooldownDefault::UseFirstBehaviorActivationTime => elapsed_since(self.first_activated_s),
        }
    }

    // ── Mutation (owned by the state machine) ─────────────────────────────────

    pub(crate) fn on_activated(&mut self, now_s: f64) {
        self.active = true;
        self.activated_s = Some(now_s);
        self.first_activated_s.get_or_insert(now_s);
    }

    pub(crate) fn on_deactivated(&mut self) {
        self.active = false;
        if self.current.is_valid() {
            self.resume_from = self.current;
        }
        self.current = StateId::INVALID;
    }

    pub(crate) fn enter(&mut self, state: StateId, now_s: f64) {
        self.current = state;
        if let Some(t) = self.timing_mut(state) {
            t.last_started_s = Some(now_s);
        }
    }

    pub(crate) fn exit(&mut self, state: StateId, now_s: f64) {
        if let Some(t) = self.timing_mut(state) {
            t.last_ended_s = Some(now_s);
        }
    }

    fn timing(&self, state: StateId) -> Option<&StateTiming> {
        self.timing.get(state.index().checked_sub(1)?)
    }

    fn timing_mut(&mut self, state: StateId) -> Option<&mut StateTiming> {
        self.timing.get_mut(state.index().checked_sub(1)?)
    }
}
