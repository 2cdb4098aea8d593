use crate::run::Stage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HumidityError {
    #[error("invalid config: {0}")]
    Config(String),

    #[error("forecast lookup failed: {0}")]
    Gateway(String),

    #[error("forecast only returned {found} overnight periods; need {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("unsupported temperature unit {0:?}")]
    UnsupportedUnit(String),

    #[error("mail delivery failed: {0}")]
    Notifier(String),

    #[error("mail provider rejected message: {status}: {body}")]
    NotifierRejected { status: String, body: String },

    #[error("state error: {0}")]
    State(String),

    #[error("run deadline exceeded while {stage}")]
    DeadlineExceeded { stage: Stage },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HumidityError>;
