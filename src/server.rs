use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState, Credentials};
use crate::config::Config;
use crate::deploy::Deployer;
use crate::generator::Generator;
use crate::github::GitHubClient;
use crate::notify::Notifier;

/// Where the service listens.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Wire the long-lived collaborators from configuration.
pub fn build_state(config: &Config) -> Result<Arc<AppState>> {
    let github = GitHubClient::new(&config.github_api_url, &config.github_token)
        .context("Failed to initialize GitHub client")?;
    let generator = Generator::from_config(&config.generation);
    let deployer = Deployer::new(
        Arc::new(github),
        Arc::new(generator),
        &config.github_username,
        &config.repo_prefix,
    );
    Ok(Arc::new(AppState {
        credentials: Credentials {
            email: config.student_email.clone(),
            secret: config.student_secret.clone(),
        },
        deployer: Arc::new(deployer),
        notifier: Notifier::new(config.http_timeout),
    }))
}

/// Start the service and run until Ctrl+C.
pub async fn start_server(config: &Config, server: ServerConfig) -> Result<()> {
    let app = build_router(build_state(config)?);

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, owner = %config.github_username, "pagesmith listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn config() -> Config {
        Config::from_lookup(FileConfig::default(), |key| match key {
            "GITHUB_TOKEN" => Some("ghp_test".into()),
            "GH_USERNAME" => Some("octocat".into()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = build_router(build_state(&config()).unwrap());
        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight_is_allowed() {
        let app = build_router(build_state(&config()).unwrap());
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/submit")
            .header("origin", "https://grader.example")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = build_router(build_state(&config()).unwrap());
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_build_state_rejects_bad_api_url() {
        let mut config = config();
        config.github_api_url = "not a url".into();
        assert!(build_state(&config).is_err());
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
    }
}
