//! `bhv-states` — condition-driven internal state machines.
//!
//! # Crate layout
//!
//! | Module              | Contents                                                       |
//! |---------------------|----------------------------------------------------------------|
//! | [`internal_states`] | `InternalStatesBehavior`, factory registration                 |
//! | [`view`]            | `StateMachineView` (names, current state, timing), `CooldownDefault` |
//! | [`condition`]       | `Condition` trait, built-in conditions, `ConditionFactory`     |
//! | [`hooks`]           | `StateMachineHooks`, `NoHooks`, `SuggestionResumeOverride`     |
//! | [`config`]          | Serde shapes of a state machine definition                     |
//! | [`error`]           | `StatesError`, `StatesResult<T>`                               |
//!
//! # Ticking
//!
//! A state machine is an ordinary behavior.  Its delegate is the current
//! state's behavior (preceded by a put-down and a get-in behavior when those
//! apply), so whatever the state runs sits directly above it in the stack.
//! Conditions are evaluated during the machine's own update, after
//! delegation callbacks for the tick have been delivered.

pub mod condition;
pub mod config;
pub mod error;
pub mod hooks;
pub mod internal_states;
pub mod view;


pub use condition::{
    CompoundCondition, CompoundOp, Condition, ConditionContext, ConditionFactory, ConstantCondition,
    CustomConditionFn, LambdaCondition, RobotStateCondition, StateExitCooldownCondition,
    TimerInRangeCondition, WhiteboardFactCondition,
};
pub use config::{
    InternalStatesConfig, ResumeReplacementConfig, StateConfig, TransitionConfig, TransitionGroupConfig,
    TransitionType,
};
pub use error::{StatesError, StatesResult};
pub use hooks::{NoHooks, StateMachineHooks, SuggestionResumeOverride};
pub use internal_states::{register_internal_states, register_internal_states_with, InternalStatesBehavior};
pub use view::{CooldownDefault, StateMachineView};
