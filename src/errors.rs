//! Typed error hierarchy for pagesmith.
//!
//! - `ConfigError`: startup configuration problems (fatal)
//! - `GitHubError`: repository host failures, surfaced as request failures
//! - `GenerationError`: completion backend failures, always recovered
//! - `DeployError`: what the orchestrator hands back to the HTTP layer

use thiserror::Error;

/// Errors raised while assembling [`crate::config::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ParseFailed {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from the GitHub REST API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitHub returned {status} for {method} {url}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected GitHub response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Invalid GitHub API URL '{0}'")]
    BadUrl(String),
}

impl GitHubError {
    /// HTTP status reported by GitHub, if the failure was a non-2xx response.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from a single completion call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Completion request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Completion API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Completion response had no usable content")]
    EmptyCompletion,

    #[error("Failed to build completion client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Errors that abort a deployment pass.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Failed to ensure repository {owner}/{repo}: {source}")]
    EnsureRepository {
        owner: String,
        repo: String,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to commit files to {owner}/{repo}: {source}")]
    Commit {
        owner: String,
        repo: String,
        #[source]
        source: GitHubError,
    },

    #[error("Failed to enable Pages for {owner}/{repo}: {source}")]
    EnablePages {
        owner: String,
        repo: String,
        #[source]
        source: GitHubError,
    },

    #[error("Deployment task stopped unexpectedly: {0}")]
    Aborted(String),
}
