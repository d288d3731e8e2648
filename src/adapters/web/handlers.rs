//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::domain::error::ForecastGameError;
use crate::domain::session::{RoundSnapshot, ScoreState, SharedSession, SubmitResult};

use super::{AppState, WebError};

#[derive(Debug, Default, Deserialize)]
pub struct RoundQuery {
    #[serde(default)]
    pub reveal: bool,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub forecast: Vec<f64>,
}

/// Runs `f` against the session on the blocking pool, bounded by the
/// configured fit timeout. A timed-out task still finishes in the background.
async fn with_session<T, F>(state: &AppState, f: F) -> Result<T, WebError>
where
    T: Send + 'static,
    F: FnOnce(&SharedSession) -> Result<T, ForecastGameError> + Send + 'static,
{
    let session = Arc::clone(&state.session);
    let task = tokio::task::spawn_blocking(move || f(session.as_ref()));

    match tokio::time::timeout(state.fit_timeout, task).await {
        Ok(Ok(result)) => result.map_err(WebError::from),
        Ok(Err(join)) => Err(WebError::internal(format!("session task failed: {}", join))),
        Err(_) => Err(WebError::timeout(format!(
            "round engine did not respond within {}s",
            state.fit_timeout.as_secs_f64()
        ))),
    }
}

pub async fn current_round(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoundQuery>,
) -> Result<Json<RoundSnapshot>, WebError> {
    let snapshot = with_session(&state, move |s| Ok(s.snapshot(query.reveal))).await?;
    Ok(Json(snapshot))
}

pub async fn next_round(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RoundSnapshot>, WebError> {
    let snapshot = with_session(&state, |s| s.new_round()).await?;
    Ok(Json(snapshot))
}

pub async fn submit_forecast(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResult>, WebError> {
    let result = with_session(&state, move |s| s.submit(&request.forecast)).await?;
    Ok(Json(result))
}

pub async fn scores(State(state): State<Arc<AppState>>) -> Result<Json<ScoreState>, WebError> {
    let scores = with_session(&state, |s| Ok(s.scores())).await?;
    Ok(Json(scores))
}

pub async fn reset_rotation(State(state): State<Arc<AppState>>) -> Result<StatusCode, WebError> {
    with_session(&state, |s| {
        s.restart_rotation();
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}
