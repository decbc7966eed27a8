//! # depot-api — Repository HTTP Server
//!
//! Serves an [`ArtifactStore`](depot_store::ArtifactStore) over HTTP in
//! Maven repository layout, through the [`depot_vfs`] projection.
//!
//! ## API Surface
//!
//! | Path                          | Module                    | Purpose                    |
//! |-------------------------------|---------------------------|----------------------------|
//! | `/health/liveness`            | this module               | Liveness check             |
//! | `/health/readiness`           | this module               | Readiness check            |
//! | `{context}/settings.xml`      | [`routes::settings`]      | Maven settings document    |
//! | `{context}/{path}`            | [`routes::files`]         | Files, indexes, uploads    |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - Handlers hold no repository logic; they delegate to `depot-vfs`.
//! - All errors map to structured HTTP responses via [`AppError`].
//! - Startup problems ([`ConfigError`], [`ServerError`]) are the only fatal errors.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod listing;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod server;
pub mod state;

pub use bootstrap::create_store;
pub use config::{ConfigError, DepotConfig, RepositoryConfig};
pub use error::AppError;
pub use registry::ServerRegistry;
pub use server::{ServerError, ServerHandle, ServerState};
pub use state::AppState;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Extension, Router};

use crate::middleware::metrics::ApiMetrics;

/// Assemble the application router with fresh metrics.
pub fn app(state: AppState) -> Router {
    router(state, ApiMetrics::new())
}

/// Assemble the application router, recording into `metrics`.
///
/// Repository paths are handled by a fallback so that the context path can
/// be stripped in one place.
pub fn router(state: AppState, metrics: ApiMetrics) -> Router {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .fallback(routes::files::dispatch)
        .with_state(state)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(Extension(metrics))
        .layer(middleware::tracing_layer::layer())
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}
