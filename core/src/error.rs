use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid distribution: expected 0 <= min <= mode <= max, got ({min}, {mode}, {max})")]
    InvalidDistribution { min: f64, mode: f64, max: f64 },

    #[error("Invalid control timing: {reason}")]
    InvalidControlTiming { reason: String },

    #[error("Missing parameters: contact frequency, probability of action and primary loss are all absent")]
    MissingParameters,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Simulation cancelled after {completed} of {requested} trials")]
    Cancelled { completed: usize, requested: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RiskResult<T> = Result<T, RiskError>;
