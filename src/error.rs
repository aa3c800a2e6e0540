//! Error types shared by the risk engines

use thiserror::Error;

/// Minimum number of observations required by the statistical engines
pub const MIN_OBSERVATIONS: usize = 30;

/// Risk engine errors
#[derive(Debug, Error)]
pub enum RiskError {
    /// Invalid configuration (bounds, budgets, weights). Never corrected silently.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Not enough observations for a statistically valid result
    #[error("Insufficient data: {required} observations required, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    /// Malformed input series
    #[error("Invalid series: {0}")]
    InvalidSeries(String),
    /// Distribution could not be constructed from the given parameters
    #[error("Distribution error: {0}")]
    Distribution(String),
    /// Offloaded computation did not complete
    #[error("Offloaded task failed: {0}")]
    Offload(String),
    /// Report export failed
    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),
    /// Serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RiskError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Fail with `InsufficientData` unless `actual >= required`
    pub fn require_observations(required: usize, actual: usize) -> Result<(), Self> {
        if actual < required {
            return Err(Self::InsufficientData { required, actual });
        }
        Ok(())
    }
}

/// Result alias for risk engine operations
pub type RiskResult<T> = Result<T, RiskError>;
