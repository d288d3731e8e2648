//! Forecast models for the round engine.

pub mod arima;
pub mod auto_arima;
pub mod kpss;
pub mod nelder_mead;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::error::ForecastGameError;
use crate::ports::forecast_port::ForecastModel;

pub use auto_arima::{AutoArima, AutoArimaConfig};

/// A model's point forecast for one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelForecast {
    pub values: Vec<f64>,
    pub label: String,
}

/// Repeats the last observed value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveForecast;

impl ForecastModel for NaiveForecast {
    fn name(&self) -> &str {
        "naive"
    }

    fn fit_and_forecast(
        &self,
        train: &[f64],
        horizon: usize,
    ) -> Result<ModelForecast, ForecastGameError> {
        match train.last() {
            Some(last) if last.is_finite() => Ok(ModelForecast {
                values: vec![*last; horizon],
                label: "naive (last value)".into(),
            }),
            Some(_) => Err(ForecastGameError::ModelFitFailed {
                reason: "last training value is not finite".into(),
            }),
            None => Err(ForecastGameError::ModelFitFailed {
                reason: "empty training segment".into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Arima,
    Naive,
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arima" | "auto-arima" | "auto_arima" => Ok(Self::Arima),
            "naive" => Ok(Self::Naive),
            other => Err(format!("unknown model kind '{}'", other)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arima => f.write_str("arima"),
            Self::Naive => f.write_str("naive"),
        }
    }
}

pub fn build_model(kind: ModelKind, arima: AutoArimaConfig) -> Arc<dyn ForecastModel + Send + Sync> {
    match kind {
        ModelKind::Arima => Arc::new(AutoArima::new(arima)),
        ModelKind::Naive => Arc::new(NaiveForecast),
    }
}
