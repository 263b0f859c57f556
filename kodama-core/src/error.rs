//! # Error Handling
//!
//! Error types for grove and forest initialization.
//!
//! The write path (`put`/`remove`/`get`) is deliberately infallible: a call
//! that would violate an invariant is a programming error and fails an
//! assertion rather than returning. Errors exist only where the caller can
//! react, which is configuration and resource acquisition at startup.

use thiserror::Error;

/// Result type alias for Kodama operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for grove and forest construction
#[derive(Error, Debug)]
pub enum Error {
    /// The declared schema cannot be realized (e.g. two trees hash to the
    /// same identity digest).
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A caller-supplied budget is unusable (zero cache capacity, zero
    /// commit budget, zero node count).
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A fixed-capacity resource ran out during initialization. The caller
    /// may retry with smaller budgets.
    #[error("resource exhausted: {resource}")]
    ResourceExhausted { resource: String },
}

impl Error {
    /// Check if the error is recoverable by retrying with smaller budgets
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::ResourceExhausted { .. } => true,
            Error::Schema { .. } => false,
            Error::Configuration { .. } => false,
        }
    }

    /// Get error code for monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Schema { .. } => "SCHEMA_ERROR",
            Error::Configuration { .. } => "CONFIG_ERROR",
            Error::ResourceExhausted { .. } => "RESOURCE_EXHAUSTED",
        }
    }
}
