//! Shared domain types for the pagesmith deployment service.
//!
//! - [`types`]: submission payloads and deployment results
//! - [`error`]: [`ValidationError`]

pub mod error;
pub mod types;

pub use error::ValidationError;
pub use types::{
    Attachment, DeploymentResult, EvaluationNotice, SubmissionRequest, SubmissionResponse,
};
