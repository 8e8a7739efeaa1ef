//! Host-level errors.
//!
//! Failures inside promise handlers are rejection reasons and never surface
//! here. These errors come from driving the event loop or loading its
//! configuration.

use core_types::JsError;
use thiserror::Error;

/// Errors returned by the event loop drivers and configuration loading.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A task, timer or microtask returned an error
    #[error("task failed: {0}")]
    TaskFailed(#[from] JsError),

    /// The configured turn limit was reached before the loop went idle
    #[error("event loop exceeded {limit} turns")]
    TurnLimitExceeded {
        /// The configured limit
        limit: usize,
    },

    /// Configuration document could not be parsed
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
