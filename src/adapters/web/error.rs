//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::error::ForecastGameError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    pub expected: Option<usize>,
    pub actual: Option<usize>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual: Option<usize>,
}

impl WebError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

pub fn status_from_error(err: &ForecastGameError) -> StatusCode {
    match err {
        ForecastGameError::LengthMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ForecastGameError::RoundAlreadyResolved { .. } => StatusCode::CONFLICT,
        ForecastGameError::PoolExhaustedPermanently
        | ForecastGameError::RoundUnavailable { .. }
        | ForecastGameError::InsufficientHistory { .. }
        | ForecastGameError::ModelFitFailed { .. }
        | ForecastGameError::SeriesUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ForecastGameError::ConfigParse { .. }
        | ForecastGameError::ConfigMissing { .. }
        | ForecastGameError::ConfigInvalid { .. }
        | ForecastGameError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ForecastGameError> for WebError {
    fn from(err: ForecastGameError) -> Self {
        let mut web = Self::new(status_from_error(&err), err.kind(), err.to_string());
        if let ForecastGameError::LengthMismatch { expected, actual } = err {
            web.expected = Some(expected);
            web.actual = Some(actual);
        }
        web
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, kind = self.kind, error = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
            expected: self.expected,
            actual: self.actual,
        };
        (self.status, Json(body)).into_response()
    }
}
