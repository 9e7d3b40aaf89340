//! Transition conditions and the JSON condition factory.
//!
//! A condition is described in JSON either by type:
//!
//! ```json
//! { "conditionType": "Compound",
//!   "and": [ { "conditionType": "WhiteboardFact", "fact": "FaceDetected" },
//!            { "conditionType": "StateExitCooldown", "state": "Socializing", "cooldown_s": 30.0 } ] }
//! ```
//!
//! or by the name of a custom condition injected into the
//! [`ConditionFactory`] by the application:
//!
//! ```json
//! { "customCondition": "CloseFaceForSocializing" }
//! ```

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;

use bhv_behavior::{ActivationContext, RobotFacts, Whiteboard};
use bhv_core::{StateId, Tick};

use crate::{CooldownDefault, StateMachineView, StatesError, StatesResult};

pub const CUSTOM_CONDITION_KEY: &str = "customCondition";

// ── Evaluation context ────────────────────────────────────────────────────────

/// Everything a condition may read: the world through `activation`, and the
/// owning state machine's timing through `machine`.
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    pub activation: ActivationContext<'a>,
    pub machine:    &'a StateMachineView,
}

impl<'a> ConditionContext<'a> {
    pub fn new(activation: ActivationContext<'a>, machine: &'a StateMachineView) -> Self {
        Self { activation, machine }
    }

    pub fn now_s(&self) -> f64 {
        self.activation.now_s()
    }

    pub fn tick(&self) -> Tick {
        self.activation.tick()
    }

    pub fn whiteboard(&self) -> &'a Whiteboard {
        self.activation.whiteboard()
    }
}

// ── Condition trait ───────────────────────────────────────────────────────────

/// A boolean predicate guarding a transition.
///
/// Conditions of a state are set active when the state is entered and
/// inactive when it is left; stateful conditions (timers) reset there.
pub trait Condition {
    fn label(&self) -> String;

    fn set_active(&mut self, _active: bool, _now_s: f64) {}

    fn are_conditions_met(&self, ctx: &ConditionContext<'_>) -> bool;
}

impl fmt::Debug for dyn Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

pub type CustomConditionFn = Rc<dyn Fn(&ConditionContext<'_>) -> bool>;

// ── Concrete conditions ───────────────────────────────────────────────────────

pub struct ConstantCondition(pub bool);

impl Condition for ConstantCondition {
    fn label(&self) -> String {
        if self.0 { "TrueCondition".to_owned() } else { "FalseCondition".to_owned() }
    }

    fn are_conditions_met(&self, _ctx: &ConditionContext<'_>) -> bool {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CompoundOp {
    And,
    Or,
    Not,
}

/// Boolean combination of sub-conditions.  `Not` has exactly one operand.
pub struct CompoundCondition {
    op:       CompoundOp,
    operands: Vec<Box<dyn Condition>>,
}

impl CompoundCondition {
    pub fn new(op: CompoundOp, operands: Vec<Box<dyn Condition>>) -> StatesResult<Self> {
        let arity_ok = match op {
            CompoundOp::Not => operands.len() == 1,
            CompoundOp::And | CompoundOp::Or => !operands.is_empty(),
        };
        if !arity_ok {
            return Err(StatesError::InvalidCondition(format!(
                "{op:?} with {} operands",
                operands.len()
            )));
        }
        Ok(Self { op, operands })
    }
}

impl Condition for CompoundCondition {
    fn label(&self) -> String {
        let inner: Vec<String> = self.operands.iter().map(|c| c.label()).collect();
        format!("{:?}({})", self.op, inner.join(","))
    }

    fn set_active(&mut self, active: bool, now_s: f64) {
        for operand in &mut self.operands {
            operand.set_active(active, now_s);
        }
    }

    fn are_conditions_met(&self, ctx: &ConditionContext<'_>) -> bool {
        match self.op {
            CompoundOp::And => self.operands.iter().all(|c| c.are_conditions_met(ctx)),
            CompoundOp::Or => self.operands.iter().any(|c| c.are_conditions_met(ctx)),
            CompoundOp::Not => !self.operands[0].are_conditions_met(ctx),
        }
    }
}

/// True while the time since the condition was set active lies in
/// `[begin_s, end_s)`.  Without `end_s` the range is open-ended.
pub struct TimerInRangeCondition {
    begin_s:    f64,
    end_s:      Option<f64>,
    started_at: Option<f64>,
}

impl TimerInRangeCondition {
    pub fn new(begin_s: f64, end_s: Option<f64>) -> Self {
        Self { begin_s, end_s, started_at: None }
    }
}

impl Condition for TimerInRangeCondition {
    fn label(&self) -> String {
        match self.end_s {
            Some(end) => format!("TimerInRange[{},{})", self.begin_s, end),
            None => format!("TimerInRange[{},inf)", self.begin_s),
        }
    }

    fn set_active(&mut self, active: bool, now_s: f64) {
        self.started_at = active.then_some(now_s);
    }

    fn are_conditions_met(&self, ctx: &ConditionContext<'_>) -> bool {
        let Some(start) = self.started_at else { return false };
        let elapsed = ctx.now_s() - start;
        elapsed >= self.begin_s && self.end_s.is_none_or(|end| elapsed < end)
    }
}

pub struct WhiteboardFactCondition {
    fact:  String,
    value: bool,
}

impl Condition for WhiteboardFactCondition {
    fn label(&self) -> String {
        format!("WhiteboardFact({}={})", self.fact, self.value)
    }

    fn are_conditions_met(&self, ctx: &ConditionContext<'_>) -> bool {
        ctx.whiteboard().fact(&self.fact) == self.value
    }
}

/// Reads one of the physical robot facts (`OnCharger`, `CarryingObject`, ...).
pub struct RobotStateCondition {
    state: String,
    value: bool,
}

impl Condition for RobotStateCondition {
    fn label(&self) -> String {
        format!("RobotState({}={})", self.state, self.value)
    }

    fn are_conditions_met(&self, ctx: &ConditionContext<'_>) -> bool {
        ctx.whiteboard().robot.by_name(&self.state) == Some(self.value)
    }
}

pub struct StateExitCooldownCondition {
    state:      StateId,
    state_name: String,
    cooldown_s: f64,
    never_run:  CooldownDefault,
}

impl Condition for StateExitCooldownCondition {
    fn label(&self) -> String {
        format!("StateExitCooldown({},{}s)", self.state_name, self.cooldown_s)
    }

    fn are_conditions_met(&self, ctx: &ConditionContext<'_>) -> bool {
        ctx.machine
            .state_exit_cooldown_expired(self.state, self.cooldown_s, self.never_run, ctx.now_s())
    }
}

/// An application-supplied predicate registered under a name.
pub struct LambdaCondition {
    name: String,
    func: CustomConditionFn,
}

impl Condition for LambdaCondition {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn are_conditions_met(&self, ctx: &ConditionContext<'_>) -> bool {
        (self.func)(ctx)
    }
}

// ── JSON descriptors ──────────────────────────────────────────────────────────

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(tag = "conditionType", deny_unknown_fields)]
enum ConditionConfig {
    TrueCondition,
    FalseCondition,
    Compound {
        and: Option<Vec<Value>>,
        or:  Option<Vec<Value>>,
        not: Option<Box<Value>>,
    },
    TimerInRange {
        #[serde(default)]
        begin_s: f64,
        end_s:   Option<f64>,
    },
    WhiteboardFact {
        fact: String,
        #[serde(default = "yes")]
        value: bool,
    },
    RobotState {
        state: String,
        #[serde(default = "yes")]
        value: bool,
    },
    StateExitCooldown {
        state:      String,
        cooldown_s: f64,
        #[serde(default, rename = "neverRunDefault")]
        never_run:  CooldownDefault,
    },
}

// ── Factory ───────────────────────────────────────────────────────────────────

/// Builds conditions from JSON.  Custom conditions are injected by name
/// before any state machine that uses them is constructed.
#[derive(Default, Clone)]
pub struct ConditionFactory {
    custom: FxHashMap<String, CustomConditionFn>,
}

impl ConditionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a custom condition.
    pub fn inject_custom<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&ConditionContext<'_>) -> bool + 'static,
    {
        self.custom.insert(name.into(), Rc::new(func));
    }

    pub fn has_custom(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Build one condition.  State names are resolved against `machine`.
    pub fn create(&self, json: &Value, machine: &StateMachineView) -> StatesResult<Box<dyn Condition>> {
        if let Some(name) = json.get(CUSTOM_CONDITION_KEY) {
            let name = name
                .as_str()
                .ok_or_else(|| StatesError::InvalidCondition(format!("{CUSTOM_CONDITION_KEY} must be a string")))?;
            let func = self
                .custom
                .get(name)
                .ok_or_else(|| StatesError::UnknownCustomCondition(name.to_owned()))?;
            return Ok(Box::new(LambdaCondition { name: name.to_owned(), func: Rc::clone(func) }));
        }

        let config: ConditionConfig = serde_json::from_value(json.clone())
            .map_err(|e| StatesError::InvalidCondition(format!("{e} in {json}")))?;

        Ok(match config {
            ConditionConfig::TrueCondition => Box::new(ConstantCondition(true)),
            ConditionConfig::FalseCondition => Box::new(ConstantCondition(false)),
            ConditionConfig::Compound { and, or, not } => {
                let (op, operands) = match (and, or, not) {
                    (Some(list), None, None) => (CompoundOp::And, list),
                    (None, Some(list), None) => (CompoundOp::Or, list),
                    (None, None, Some(single)) => (CompoundOp::Not, vec![*single]),
                    _ => {
                        return Err(StatesError::InvalidCondition(
                            "Compound needs exactly one of and/or/not".to_owned(),
                        ));
                    }
                };
                let operands = operands
                    .iter()
                    .map(|o| self.create(o, machine))
                    .collect::<StatesResult<Vec<_>>>()?;
                Box::new(CompoundCondition::new(op, operands)?)
            }
            ConditionConfig::TimerInRange { begin_s, end_s } => Box::new(TimerInRangeCondition::new(begin_s, end_s)),
            ConditionConfig::WhiteboardFact { fact, value } => Box::new(WhiteboardFactCondition { fact, value }),
            ConditionConfig::RobotState { state, value } => {
                if RobotFacts::default().by_name(&state).is_none() {
                    return Err(StatesError::UnknownRobotState(state));
                }
                Box::new(RobotStateCondition { state, value })
            }
            ConditionConfig::StateExitCooldown { state, cooldown_s, never_run } => {
                Box::new(StateExitCooldownCondition {
                    state: machine.require_state(&state)?,
                    state_name: state,
                    cooldown_s,
                    never_run,
                })
            }
        })
    }
}
