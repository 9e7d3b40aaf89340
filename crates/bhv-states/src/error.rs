use thiserror::Error;

use bhv_behavior::BehaviorError;

#[derive(Debug, Error)]
pub enum StatesError {
    #[error("unknown state {0:?}")]
    UnknownState(String),

    #[error("state {0:?} declared twice")]
    DuplicateState(String),

    #[error("state {0:?} has no transitions (set ignoreMissingTransitions to allow)")]
    NoTransitions(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("unknown custom condition {0:?}")]
    UnknownCustomCondition(String),

    #[error("unknown robot state {0:?}")]
    UnknownRobotState(String),

    #[error("post-behavior suggestion {suggestion:?} resumes unknown state {state:?}")]
    UnknownResumeOverride { suggestion: String, state: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Behavior(#[from] BehaviorError),
}

pub type StatesResult<T> = Result<T, StatesError>;

impl From<StatesError> for BehaviorError {
    fn from(err: StatesError) -> Self {
        match err {
            StatesError::Behavior(inner) => inner,
            other => BehaviorError::Config(other.to_string()),
        }
    }
}
