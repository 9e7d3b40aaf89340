use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("behavior stack is empty")]
    Empty,

    #[error("debug tree serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StackResult<T> = Result<T, StackError>;
