use thiserror::Error;

/// Failure taxonomy for the signal engine. Per-indicator and per-cycle
/// errors are contained and downgraded to error-tagged results; only
/// configuration errors at startup are fatal.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("insufficient data: have {have}, need {need}")]
    DataInsufficiency { have: usize, need: usize },

    #[error("computation failed: {0}")]
    Computation(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}
