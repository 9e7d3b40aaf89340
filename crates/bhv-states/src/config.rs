//! Serde shapes of an `InternalStatesBehavior` definition.
//!
//! ```json
//! {
//!   "behaviorClass": "InternalStatesBehavior",
//!   "behaviorID": "Freeplay",
//!   "initialState": "Observing",
//!   "states": [
//!     { "name": "Observing",   "behavior": "ObservingWait" },
//!     { "name": "Socializing", "behavior": "Socialize", "getInBehavior": "TurnToFace" }
//!   ],
//!   "transitionDefinitions": [
//!     { "from": ["Observing"],
//!       "transitions": [ { "to": "Socializing", "type": "NonInterrupting",
//!                          "condition": { "conditionType": "WhiteboardFact", "fact": "FaceDetected" } } ] },
//!     { "from": ["Socializing"],
//!       "transitions": [ { "to": "Observing", "type": "Exit",
//!                          "condition": { "conditionType": "TrueCondition" } } ] }
//!   ]
//! }
//! ```

use serde::Deserialize;
use serde_json::Value;

pub const INITIAL_STATE_KEY: &str = "initialState";
pub const STATES_KEY: &str = "states";
pub const TRANSITIONS_KEY: &str = "transitionDefinitions";
pub const RESUME_REPLACEMENTS_KEY: &str = "resumeReplacements";
pub const IGNORE_MISSING_TRANSITIONS_KEY: &str = "ignoreMissingTransitions";
pub const PUT_DOWN_OBJECT_KEY: &str = "putDownObjectBehavior";

/// Every key an `InternalStatesBehavior` definition may carry.
pub const INTERNAL_STATES_KEYS: [&str; 6] = [
    INITIAL_STATE_KEY,
    STATES_KEY,
    TRANSITIONS_KEY,
    RESUME_REPLACEMENTS_KEY,
    IGNORE_MISSING_TRANSITIONS_KEY,
    PUT_DOWN_OBJECT_KEY,
];

/// When a transition is allowed to fire relative to the current delegate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum TransitionType {
    /// Only while the delegate says it can be gently interrupted, or when
    /// nothing is delegated.
    NonInterrupting,
    /// Any tick, whatever the delegate is doing.
    Interrupting,
    /// Only after the delegate stopped on its own.
    Exit,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StateConfig {
    pub name:            String,
    pub behavior:        String,
    #[serde(default)]
    pub get_in_behavior: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionConfig {
    pub to:        String,
    #[serde(rename = "type")]
    pub kind:      TransitionType,
    pub condition: Value,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionGroupConfig {
    pub from:        Vec<String>,
    pub transitions: Vec<TransitionConfig>,
}

/// On resume, enter `replacement` instead of `resume_state`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResumeReplacementConfig {
    pub resume_state: String,
    pub replacement:  String,
}

/// Keys outside this struct (read by state machine hooks) are ignored here;
/// the behavior factory rejects keys nobody expects.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalStatesConfig {
    pub initial_state:              String,
    pub states:                     Vec<StateConfig>,
    #[serde(default)]
    pub transition_definitions:     Vec<TransitionGroupConfig>,
    #[serde(default)]
    pub resume_replacements:        Vec<ResumeReplacementConfig>,
    #[serde(default)]
    pub ignore_missing_transitions: bool,
    #[serde(default)]
    pub put_down_object_behavior:   Option<String>,
}
