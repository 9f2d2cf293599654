//! Offline generation, `pagesmith generate`. Needs no GitHub credentials.

use std::path::Path;

use anyhow::{Context, Result};
use pagesmith::config::GenerationConfig;
use pagesmith::generator::{ContentSource, Generator};

pub async fn cmd_generate(
    config_path: Option<&Path>,
    brief: &str,
    checks: &[String],
    attachments: &[String],
    out: &Path,
) -> Result<()> {
    let config = GenerationConfig::load(config_path).context("Failed to load configuration")?;
    let generator = Generator::from_config(&config);
    let app = generator.generate(brief, checks, attachments).await;

    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create {}", out.display()))?;
    for (name, content) in &app.files {
        let path = out.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("{}", path.display());
    }

    if app.source == ContentSource::Fallback {
        eprintln!("note: index.html and script.js came from the fallback templates");
    }
    Ok(())
}
