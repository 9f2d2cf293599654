//! Error types for pagesmith-common.

use thiserror::Error;

/// A submission that parsed as JSON but breaks a field invariant.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("round must be >= 1, got {0}")]
    RoundOutOfRange(i64),

    #[error("task must not be empty")]
    EmptyTask,

    #[error("evaluation_url is not a valid URL: {0}")]
    InvalidEvaluationUrl(String),

    #[error("evaluation_url must use http or https, got '{0}'")]
    UnsupportedScheme(String),
}
