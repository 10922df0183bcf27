//! Error types for the benchmarking core

use thiserror::Error;

use crate::capability::Capability;

/// Core error type for benchmarking operations
#[derive(Error, Debug)]
pub enum BenchError {
    /// A stimulus or action fell outside its declared space. Always fatal.
    #[error("Space violation: {value} is not a member of {space}")]
    SpaceViolation {
        /// Description of the offending space
        space: String,
        /// Description of the offending value
        value: String,
    },

    /// A test required a capability the model does not declare. Fatal.
    #[error("Capability missing: {subject} does not declare {capability:?}")]
    CapabilityMissing {
        /// Name of the object lacking the capability
        subject: String,
        /// The required capability
        capability: Capability,
    },

    /// Environment and model disagree on space types.
    #[error("Env/model mismatch: {0}")]
    EnvModelMismatch(String),

    /// The optimizer failed outright (non-convergence is not an error).
    #[error("Optimization error: {0}")]
    Optimization(String),

    /// Model-level errors (bad parameters, unsupported protocol)
    #[error("Model error: {0}")]
    Model(String),

    /// Environment-level errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// Invalid distribution parameters
    #[error("Distribution error: {0}")]
    Distribution(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for benchmarking operations
pub type Result<T> = std::result::Result<T, BenchError>;
