//! Wire types for the submit/revise contract.
//!
//! Everything here is built per request and dropped when the request ends;
//! nothing is persisted.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A file the grader wants placed in the repository.
///
/// `url` is either an inline `data:<mime>;base64,<payload>` URI or a remote
/// URL. Only the inline form is materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Body of `POST /submit` and `POST /revise`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub round: i64,
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl SubmissionRequest {
    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.round < 1 {
            return Err(ValidationError::RoundOutOfRange(self.round));
        }
        if self.task.trim().is_empty() {
            return Err(ValidationError::EmptyTask);
        }
        let url = url::Url::parse(&self.evaluation_url)
            .map_err(|e| ValidationError::InvalidEvaluationUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ValidationError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Repository name for this task: `prefix + task` with path separators
    /// and spaces turned into dashes.
    pub fn repo_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.task).replace(['/', ' '], "-")
    }

    /// Commit message shared by every file written in this round.
    pub fn commit_message(&self) -> String {
        let kind = if self.round > 1 { "revise" } else { "initial" };
        format!("{}: {}", kind, self.task)
    }
}

/// Outcome of one deployment pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
}

/// Response body for a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub email: String,
    pub task: String,
    pub round: i64,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

impl SubmissionResponse {
    pub fn new(request: &SubmissionRequest, result: &DeploymentResult) -> Self {
        Self {
            email: request.email.clone(),
            task: request.task.clone(),
            round: request.round,
            nonce: request.nonce.clone(),
            repo_url: result.repo_url.clone(),
            commit_sha: result.commit_sha.clone(),
            pages_url: result.pages_url.clone(),
        }
    }
}

/// Body POSTed to the grader's `evaluation_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationNotice {
    pub email: String,
    pub task: String,
    pub round: i64,
    pub nonce: String,
    pub repo_url: String,
    pub pages_url: String,
    pub commit_sha: String,
    pub latency_ms: u64,
}

impl EvaluationNotice {
    pub fn new(response: &SubmissionResponse, latency_ms: u64) -> Self {
        Self {
            email: response.email.clone(),
            task: response.task.clone(),
            round: response.round,
            nonce: response.nonce.clone(),
            repo_url: response.repo_url.clone(),
            pages_url: response.pages_url.clone(),
            commit_sha: response.commit_sha.clone(),
            latency_ms,
        }
    }
}
