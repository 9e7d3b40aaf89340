//! Extension points of `InternalStatesBehavior`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use bhv_behavior::{BehaviorConfig, BehaviorContext};
use bhv_core::{StateId, Tick};

use crate::{StateMachineView, StatesError, StatesResult};

pub const SUGGESTION_RESUME_OVERRIDES_KEY: &str = "postBehaviorSuggestionResumeOverrides";

/// Customization of an [`InternalStatesBehavior`][crate::InternalStatesBehavior].
///
/// Every method has a no-op default; [`NoHooks`] uses them all.
pub trait StateMachineHooks: 'static {
    /// Extra JSON keys the hooks read from the behavior definition.
    fn expected_json_keys(&self, _keys: &mut BTreeSet<&'static str>) {}

    /// Redirect the state entered when the machine is re-activated.
    fn override_resume_state(
        &mut self,
        _resume:  &mut StateId,
        _machine: &StateMachineView,
        _ctx:     &mut BehaviorContext<'_>,
    ) {
    }

    fn on_state_name_change(&self, _old: &str, _new: &str) {}

    fn on_activated_internal(&mut self, _ctx: &mut BehaviorContext<'_>) {}

    fn on_deactivated_internal(&mut self, _ctx: &mut BehaviorContext<'_>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl StateMachineHooks for NoHooks {}

/// Resume into a state chosen by the freshest post-behavior suggestion.
///
/// Configured as `"postBehaviorSuggestionResumeOverrides": { "<suggestion>":
/// "<state>", ... }`.  A suggestion posted more than the configured number of
/// ticks ago is ignored; using one clears all pending suggestions.
#[derive(Debug, Clone, Default)]
pub struct SuggestionResumeOverride {
    overrides: BTreeMap<String, StateId>,
}

impl SuggestionResumeOverride {
    pub fn new(overrides: BTreeMap<String, StateId>) -> Self {
        Self { overrides }
    }

    /// Read the overrides map (optional) from `config`, resolving state names.
    pub fn from_config(config: &BehaviorConfig, machine: &StateMachineView) -> StatesResult<Self> {
        let Some(value) = config.params.get(SUGGESTION_RESUME_OVERRIDES_KEY) else {
            return Ok(Self::default());
        };
        let map: BTreeMap<String, String> = serde_json::from_value(value.clone())?;
        let mut overrides = BTreeMap::new();
        for (suggestion, state) in map {
            let id = machine
                .state_id(&state)
                .ok_or_else(|| StatesError::UnknownResumeOverride { suggestion: suggestion.clone(), state })?;
            overrides.insert(suggestion, id);
        }
        Ok(Self { overrides })
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// The state of the most recently posted configured suggestion, with its tick.
    fn freshest(&self, ctx: &BehaviorContext<'_>) -> Option<(Tick, StateId)> {
        let mut best: Option<(Tick, StateId)> = None;
        for (name, &state) in &self.overrides {
            if let Some(tick) = ctx.whiteboard().suggestion_tick(name) {
                if best.is_none_or(|(t, _)| tick >= t) {
                    best = Some((tick, state));
                }
            }
        }
        best
    }
}

impl StateMachineHooks for SuggestionResumeOverride {
    fn expected_json_keys(&self, keys: &mut BTreeSet<&'static str>) {
        keys.insert(SUGGESTION_RESUME_OVERRIDES_KEY);
    }

    fn override_resume_state(
        &mut self,
        resume:  &mut StateId,
        machine: &StateMachineView,
        ctx:     &mut BehaviorContext<'_>,
    ) {
        let Some((posted, state)) = self.freshest(ctx) else { return };
        let freshness = ctx.config().suggestion_freshness_ticks;
        if posted.offset(freshness) < ctx.tick() {
            debug!(behavior = ctx.label(), %posted, "SuggestionResumeOverride.StaleSuggestion");
            return;
        }
        info!(
            behavior = ctx.label(),
            from = machine.state_name(*resume).unwrap_or("<invalid>"),
            to = machine.state_name(state).unwrap_or("<invalid>"),
            "SuggestionResumeOverride.Override"
        );
        *resume = state;
        ctx.whiteboard_mut().clear_suggestions();
    }
}
