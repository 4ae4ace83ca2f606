//! Vernite API server
//!
//! Serves the project-tracking REST API and, when the GitHub App is
//! configured, the integration and webhook endpoints.

mod auth;
mod config;
mod routes;
mod state;

use anyhow::Context;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vernite_github::GitHubConfig;

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vernite_api_server=debug,vernite_github=debug,vernite_core=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!("Using data directory: {:?}", config.data_dir);

    let github = GitHubConfig::from_env().context("invalid GitHub App settings")?;
    match &github {
        Some(github) => tracing::info!(app_id = github.app_id, "GitHub integration enabled"),
        None => tracing::info!("GitHub integration disabled"),
    }

    let state = AppState::new(config.data_dir.clone(), github)
        .await
        .context("failed to initialize application state")?;

    let mut app = routes::router().with_state(state);
    if config.cors_permissive {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    let app = app.layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("REST API listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
