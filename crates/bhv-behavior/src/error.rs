use thiserror::Error;

use bhv_core::BhvError;

#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error("behavior configuration error: {0}")]
    Config(String),

    #[error("behavior {label:?}: missing required key {key:?}")]
    MissingKey { label: String, key: String },

    #[error("behavior {label:?}: unexpected key {key:?}")]
    UnexpectedKey { label: String, key: String },

    #[error("behavior {label:?}: key {key:?} may not be set from configuration")]
    IllegalKey { label: String, key: String },

    #[error("duplicate behavior label {0:?}")]
    DuplicateLabel(String),

    #[error("unknown behavior class {0:?}")]
    UnknownClass(String),

    #[error("behavior {owner:?} refers to unknown behavior {target:?}")]
    UnknownDelegate { owner: String, target: String },

    #[error(transparent)]
    Core(#[from] BhvError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BehaviorResult<T> = Result<T, BehaviorError>;
