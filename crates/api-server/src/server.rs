//! API server — serves the recommender UI and its JSON endpoints.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use bookrec_core::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    skip_ingestion: bool,
}

impl ApiServer {
    pub fn new(config: AppConfig, skip_ingestion: bool) -> Self {
        Self {
            config,
            skip_ingestion,
        }
    }

    /// All routes with their middleware, bound to a fresh state.
    pub fn router(&self) -> Router {
        routes(AppState::new(self.config.clone(), self.skip_ingestion))
    }

    /// Start the HTTP server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router();
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.api.metrics_port,
            ))
            .install()?;

        info!(port = self.config.api.metrics_port, "Metrics exporter started");
        Ok(())
    }
}

/// The router over an existing state.
pub fn routes(state: AppState) -> Router {
    Router::new()
        // UI
        .route("/", get(rest::index))
        .route("/recommend", get(rest::show_recommendations))
        .route("/train", post(rest::train_from_page))
        // JSON API
        .route("/api/books", get(rest::list_books))
        .route("/api/recommendations", get(rest::get_recommendations))
        .route("/api/train", post(rest::train_model))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
