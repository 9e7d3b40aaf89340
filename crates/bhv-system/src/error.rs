use thiserror::Error;

use bhv_behavior::BehaviorError;
use bhv_stack::StackError;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("no root behavior was named")]
    MissingRoot,

    #[error("root behavior {0:?} is not defined")]
    UnknownRoot(String),

    #[error("root behavior {0:?} does not want to be activated")]
    RootDeclined(String),

    #[error("behavior definitions in {path}: {reason}")]
    Definitions { path: String, reason: String },

    #[error(transparent)]
    Behavior(#[from] BehaviorError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SystemResult<T> = Result<T, SystemError>;
