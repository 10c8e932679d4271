use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event '{event}' is not valid on step '{step}'")]
    InvalidTransition { step: String, event: String },

    #[error("Step '{step}' rejected input: {reason}")]
    GuardRejected { step: String, reason: String },

    #[error("Flow already closed")]
    SessionClosed,

    #[error("Unknown value '{value}' in column '{column}'")]
    CorruptRow { column: &'static str, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FlowResult<T> = Result<T, FlowError>;
