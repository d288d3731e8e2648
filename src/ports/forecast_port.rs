//! Forecast model port trait.

use crate::domain::error::ForecastGameError;
use crate::domain::forecast::ModelForecast;

/// A model that fits a training segment and forecasts `horizon` points ahead.
///
/// Implementations must return exactly `horizon` finite values or fail with
/// `ModelFitFailed`; they must not panic on degenerate input.
pub trait ForecastModel {
    fn name(&self) -> &str;

    fn fit_and_forecast(
        &self,
        train: &[f64],
        horizon: usize,
    ) -> Result<ModelForecast, ForecastGameError>;
}
