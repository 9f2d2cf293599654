//! HTTP service command, `pagesmith serve`.

use std::path::Path;

use anyhow::{Context, Result};
use pagesmith::config::Config;
use pagesmith::server::{self, ServerConfig};

pub async fn cmd_serve(config_path: Option<&Path>, host: &str, port: u16) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");

    server::start_server(
        &config,
        ServerConfig {
            host: host.to_string(),
            port,
        },
    )
    .await
}
