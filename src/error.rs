//! Error taxonomy for the decision pipeline.
//!
//! Everything the core can refuse to do is a variant here. Provider
//! failures from the I/O layer arrive as `anyhow::Error` and are wrapped,
//! never retried.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad request parameters (leg count, wager, ladder).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Too few historical samples to analyse.
    #[error("Insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Line search exhausted every historical value without a qualifying line.
    #[error("No eligible line for {subject} ({direction})")]
    NoEligibleLine { subject: String, direction: String },

    /// Fewer eligible legs than requested.
    #[error("Insufficient eligible legs: requested {requested}, only {available} eligible")]
    NoEligibleLegs { requested: usize, available: usize },

    /// A locked rule table is missing an expected key.
    #[error("Configuration invariant violated: {0}")]
    ConfigurationInvariant(String),

    /// Lookup of a cached parlay or leg failed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream data provider failed.
    #[error("Provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
