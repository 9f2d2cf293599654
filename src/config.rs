//! Process configuration.
//!
//! Settings are layered: an optional TOML file first, then environment
//! variables (a `.env` file is loaded by `main` before this runs).
//!
//! ```toml
//! student_email = "student@example.com"
//! student_secret = "change-me"
//! github_username = "octocat"
//! repo_prefix = "tds-"
//! http_timeout_secs = 20
//! openai_model = "gpt-4o-mini"
//! ```
//!
//! Tokens can live in the file too, but the environment is the usual place.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::ConfigError;

pub const DEFAULT_STUDENT_EMAIL: &str = "student@example.com";
pub const DEFAULT_STUDENT_SECRET: &str = "change-me";
pub const DEFAULT_REPO_PREFIX: &str = "tds-";
pub const DEFAULT_HTTP_TIMEOUT_SECS: f64 = 20.0;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// On-disk shape of the optional config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub student_email: Option<String>,
    pub student_secret: Option<String>,
    pub github_token: Option<String>,
    pub github_username: Option<String>,
    pub repo_prefix: Option<String>,
    pub http_timeout_secs: Option<f64>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub github_api_url: Option<String>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Completion backend settings. Usable on their own by `pagesmith generate`.
#[derive(Clone)]
pub struct GenerationConfig {
    /// `None` disables model-backed generation for the whole process.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GenerationConfig {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::from_lookup(&file, |key| std::env::var(key).ok()))
    }

    pub fn from_lookup<F>(file: &FileConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| non_blank(lookup(key));
        Self {
            api_key: env("OPENAI_API_KEY").or_else(|| non_blank(file.openai_api_key.clone())),
            model: env("OPENAI_MODEL")
                .or_else(|| file.openai_model.clone())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: env("OPENAI_BASE_URL")
                .or_else(|| file.openai_base_url.clone())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolved settings, fixed for the lifetime of the process.
#[derive(Clone)]
pub struct Config {
    pub student_email: String,
    pub student_secret: String,
    pub github_token: String,
    pub github_username: String,
    pub repo_prefix: String,
    /// Timeout for the evaluation callback.
    pub http_timeout: Duration,
    pub generation: GenerationConfig,
    pub github_api_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("student_email", &self.student_email)
            .field("student_secret", &"<redacted>")
            .field("github_token", &"<redacted>")
            .field("github_username", &self.github_username)
            .field("repo_prefix", &self.repo_prefix)
            .field("http_timeout", &self.http_timeout)
            .field("generation", &self.generation)
            .field("github_api_url", &self.github_api_url)
            .finish()
    }
}

impl Config {
    /// Load from an optional file plus the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        Self::from_lookup(file, |key| std::env::var(key).ok())
    }

    /// Resolve settings from a file layer and an environment lookup.
    ///
    /// Blank environment values count as unset.
    pub fn from_lookup<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| non_blank(lookup(key));
        let generation = GenerationConfig::from_lookup(&file, &lookup);

        let github_token = env("GITHUB_TOKEN")
            .or(file.github_token)
            .ok_or(ConfigError::Missing("GITHUB_TOKEN"))?;
        let github_username = env("GH_USERNAME")
            .or(file.github_username)
            .ok_or(ConfigError::Missing("GH_USERNAME"))?;

        let timeout_secs = match env("HTTP_TIMEOUT") {
            Some(raw) => raw.parse::<f64>().map_err(|e| ConfigError::Invalid {
                key: "HTTP_TIMEOUT",
                message: e.to_string(),
            })?,
            None => file.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        };
        let http_timeout =
            Duration::try_from_secs_f64(timeout_secs).map_err(|e| ConfigError::Invalid {
                key: "HTTP_TIMEOUT",
                message: e.to_string(),
            })?;

        Ok(Self {
            student_email: env("STUDENT_EMAIL")
                .or(file.student_email)
                .unwrap_or_else(|| DEFAULT_STUDENT_EMAIL.to_string()),
            student_secret: env("STUDENT_SECRET")
                .or(file.student_secret)
                .unwrap_or_else(|| DEFAULT_STUDENT_SECRET.to_string()),
            github_token,
            github_username,
            repo_prefix: env("GH_REPO_PREFIX")
                .or(file.repo_prefix)
                .unwrap_or_else(|| DEFAULT_REPO_PREFIX.to_string()),
            http_timeout,
            generation,
            github_api_url: env("GITHUB_API_URL")
                .or(file.github_api_url)
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
        })
    }
}
