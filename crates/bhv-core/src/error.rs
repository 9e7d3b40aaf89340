//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `BhvError` as one variant
//! where they need to surface a core failure.

use thiserror::Error;

use crate::BehaviorId;

/// The top-level error type for `bhv-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum BhvError {
    #[error("behavior {0} not found")]
    BehaviorNotFound(BehaviorId),

    #[error("no behavior labelled {0:?}")]
    UnknownLabel(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `bhv-*` crates.
pub type BhvResult<T> = Result<T, BhvError>;
