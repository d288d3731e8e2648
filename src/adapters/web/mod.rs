//! Web server adapter.
//!
//! JSON API over one shared [`SharedSession`], plus the browser front end
//! served as static files. Session work runs on the blocking pool because a
//! new round fits a model.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::domain::session::SharedSession;

pub const DEFAULT_FIT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub session: Arc<SharedSession>,
    pub fit_timeout: Duration,
}

impl AppState {
    pub fn new(session: SharedSession) -> Self {
        Self {
            session: Arc::new(session),
            fit_timeout: DEFAULT_FIT_TIMEOUT,
        }
    }
}

/// API routes only; unknown paths get a JSON 404.
pub fn build_api_router(state: AppState) -> Router {
    api_routes()
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// API routes with everything else served from `static_dir`.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    api_routes()
        .fallback_service(ServeDir::new(static_dir))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/round", get(handlers::current_round))
        .route("/api/round/next", post(handlers::next_round))
        .route("/api/round/submit", post(handlers::submit_forecast))
        .route("/api/scores", get(handlers::scores))
        .route("/api/rotation/reset", post(handlers::reset_rotation))
}
