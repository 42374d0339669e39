//! Dashboard HTTP server

use askama_axum::Template;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{DashboardView, StatusView};
use crate::config::PathResolver;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    logs: Vec<String>,
    status: StatusView,
    version: String,
}

pub struct AppState {
    pub paths: PathResolver,
}

// Dashboard page
async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = DashboardView::load(&state.paths).await;
    let logs = view.logs_newest_first().map(str::to_string).collect();

    DashboardTemplate {
        logs,
        status: view.status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

// Same data as the page, as JSON
async fn status(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(DashboardView::load(&state.paths).await)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the dashboard router; every route is a read-only GET
pub fn router(paths: PathResolver) -> Router {
    let state = Arc::new(AppState { paths });

    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the dashboard on a TCP address
pub struct DashboardServer {
    paths: PathResolver,
    addr: String,
}

impl DashboardServer {
    pub fn new(paths: PathResolver, addr: String) -> Self {
        Self { paths, addr }
    }

    pub async fn run(&self) -> std::io::Result<()> {
        let router = router(self.paths.clone());

        info!("Starting dashboard on {}", self.addr);
        info!("  Log file: {}", self.paths.log_file().display());
        info!("  Status file: {}", self.paths.status_file().display());

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
