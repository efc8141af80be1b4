use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Network / rate-limit failures. Retried with backoff; after the attempt
    /// budget is exhausted the unit (cell or place) is skipped and recorded
    /// as a coverage gap.
    #[error("Transient provider error: {0}")]
    ProviderTransient(String),

    /// Auth / quota failures. Fatal for the run.
    #[error("Permanent provider error: {0}")]
    ProviderPermanent(String),

    /// The embedding provider returned a vector of the wrong width. Never
    /// coerced — this signals a provider/config inconsistency.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A single review that cannot be used. Dropped locally, never fatal.
    #[error("Malformed review text: {0}")]
    MalformedReview(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::ProviderTransient(_))
    }
}
