//! Mean-squared-error scoring of two competing forecasts.

use serde::Serialize;

use crate::domain::error::ForecastGameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    pub mse_a: f64,
    pub mse_b: f64,
    pub winner: Side,
}

/// mean((actual - forecast)^2). Empty inputs score 0.
pub fn mean_squared_error(actual: &[f64], forecast: &[f64]) -> Result<f64, ForecastGameError> {
    if actual.len() != forecast.len() {
        return Err(ForecastGameError::LengthMismatch {
            expected: actual.len(),
            actual: forecast.len(),
        });
    }
    if actual.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = actual
        .iter()
        .zip(forecast)
        .map(|(a, f)| (a - f).powi(2))
        .sum();
    Ok(sum / actual.len() as f64)
}

/// Scores both forecasts against `actual`.
///
/// `a` wins only with a strictly lower MSE. Ties, and comparisons a NaN makes
/// undecidable, go to `b`.
pub fn score(
    actual: &[f64],
    forecast_a: &[f64],
    forecast_b: &[f64],
) -> Result<ScoreOutcome, ForecastGameError> {
    let mse_a = mean_squared_error(actual, forecast_a)?;
    let mse_b = mean_squared_error(actual, forecast_b)?;
    let winner = if mse_a < mse_b { Side::A } else { Side::B };
    Ok(ScoreOutcome {
        mse_a,
        mse_b,
        winner,
    })
}
