//! # Error Handling
//!
//! Error taxonomy shared by every index family.
//!
//! ## Design Principles
//!
//! 1. **Actionable**: every error names the value that was rejected
//! 2. **Contextual**: dimension and size conflicts carry both sides
//! 3. **Honest**: a failed operation never commits partial state; the
//!    error is the whole story

use thiserror::Error;

/// Result type alias for Kinjo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for the Kinjo index library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration rejected at construction time
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Vector is empty or contains non-finite components
    #[error("invalid vector: {message}")]
    InvalidVector { message: String },

    /// Operation argument out of range (k, nprobe, ef)
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Vector dimension conflicts with the index's declared dimension
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// IVF operation that requires training attempted before train()
    #[error("index not trained: call train() first")]
    NotTrained,

    /// train() called with fewer vectors than clusters
    #[error("insufficient training data: need at least {needed} vectors, got {got}")]
    InsufficientTrainingData { needed: usize, got: usize },

    /// A distance computation failed mid-operation; `context` identifies
    /// the offending pair
    #[error("distance calculation failed at {context}")]
    MetricFailure {
        context: String,
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error from a metric evaluation with the pair that caused it.
    pub fn metric_failure(context: impl Into<String>, source: Error) -> Self {
        Error::MetricFailure {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// True for errors caused by the caller's input rather than index state.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidVector { .. }
                | Error::InvalidArgument { .. }
                | Error::DimensionMismatch { .. }
        )
    }
}
