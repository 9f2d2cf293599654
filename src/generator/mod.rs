//! Static app content generation.
//!
//! The generator produces five files. `index.html` and `script.js` come from
//! the completion backend when one is configured; any failure in either step
//! discards both and uses the fallback pair from [`templates`], so a page is
//! never shipped with a script written for a different page. The other three
//! files are always template output.

pub mod backend;
pub mod prompts;
pub mod templates;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Datelike;

pub use backend::{CompletionBackend, OpenAiBackend};

use crate::config::GenerationConfig;
use crate::errors::GenerationError;

pub const INDEX_PATH: &str = "index.html";
pub const STYLE_PATH: &str = "style.css";
pub const SCRIPT_PATH: &str = "script.js";
pub const README_PATH: &str = "README.md";
pub const LICENSE_PATH: &str = "LICENSE";

/// Generated text files keyed by repository path.
pub type AppFiles = BTreeMap<String, String>;

/// Where the page and script came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Model,
    Fallback,
}

/// Output of one generation pass.
#[derive(Debug, Clone)]
pub struct GeneratedApp {
    pub files: AppFiles,
    pub source: ContentSource,
}

pub struct Generator {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl Generator {
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>) -> Self {
        Self { backend }
    }

    /// Generator that only ever uses templates.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Decide once, at startup, whether a completion backend is available.
    pub fn from_config(config: &GenerationConfig) -> Self {
        let Some(api_key) = config.api_key.as_deref() else {
            tracing::info!("OPENAI_API_KEY not set; using fallback templates");
            return Self::disabled();
        };
        match OpenAiBackend::new(api_key, &config.model, &config.base_url) {
            Ok(backend) => {
                tracing::info!(
                    model = %backend.model(),
                    endpoint = %backend.endpoint(),
                    "completion backend configured"
                );
                Self::new(Some(Arc::new(backend)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "completion backend init failed; using fallback templates");
                Self::disabled()
            }
        }
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Produce the five app files for a brief.
    pub async fn generate(
        &self,
        brief: &str,
        checks: &[String],
        attachments: &[String],
    ) -> GeneratedApp {
        let (html, js, source) = match &self.backend {
            Some(backend) => {
                match generate_page_and_script(backend.as_ref(), brief, checks, attachments).await {
                    Ok((html, js)) => (html, js, ContentSource::Model),
                    Err(e) => {
                        tracing::warn!(error = %e, "model generation failed; using fallback templates");
                        fallback_pair(brief, checks)
                    }
                }
            }
            None => fallback_pair(brief, checks),
        };

        let mut files = AppFiles::new();
        files.insert(INDEX_PATH.to_string(), html);
        files.insert(STYLE_PATH.to_string(), templates::style_css());
        files.insert(SCRIPT_PATH.to_string(), js);
        files.insert(README_PATH.to_string(), templates::readme(brief, checks));
        files.insert(
            LICENSE_PATH.to_string(),
            templates::mit_license(chrono::Utc::now().year()),
        );
        GeneratedApp { files, source }
    }
}

fn fallback_pair(brief: &str, checks: &[String]) -> (String, String, ContentSource) {
    (
        templates::fallback_index_html(brief, checks),
        templates::fallback_script_js(),
        ContentSource::Fallback,
    )
}

async fn generate_page_and_script(
    backend: &dyn CompletionBackend,
    brief: &str,
    checks: &[String],
    attachments: &[String],
) -> Result<(String, String), GenerationError> {
    let html = complete_code(
        backend,
        prompts::INDEX_SYSTEM_PROMPT,
        &prompts::index_html_prompt(brief, checks, attachments),
    )
    .await?;
    let js = complete_code(
        backend,
        prompts::SCRIPT_SYSTEM_PROMPT,
        &prompts::script_js_prompt(brief, checks, attachments),
    )
    .await?;
    Ok((html, js))
}

async fn complete_code(
    backend: &dyn CompletionBackend,
    system: &str,
    user: &str,
) -> Result<String, GenerationError> {
    let raw = backend.complete(system, user).await?;
    let code = strip_code_fence(&raw);
    if code.is_empty() {
        return Err(GenerationError::EmptyCompletion);
    }
    Ok(code.to_string())
}

/// Remove a Markdown fence wrapped around the whole reply, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```html) along with the opening line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}
