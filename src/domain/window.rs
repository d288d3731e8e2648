//! Round window extraction and the train/eval split.

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

use crate::domain::error::ForecastGameError;
use crate::domain::series::{OhlcRow, SeriesRecord};

pub const DEFAULT_WINDOW_LENGTH: usize = 100;
pub const DEFAULT_TRAIN_LENGTH: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub window_length: usize,
    pub train_length: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            train_length: DEFAULT_TRAIN_LENGTH,
        }
    }
}

impl WindowConfig {
    /// Number of held-out points, which is also the forecast horizon.
    pub fn horizon(&self) -> usize {
        self.window_length.saturating_sub(self.train_length)
    }
}

/// One round's slice of a series. Immutable after extraction.
#[derive(Debug, Clone, Serialize)]
pub struct RoundWindow {
    pub series_id: String,
    pub start_index: usize,
    pub window_length: usize,
    pub train_segment: Vec<f64>,
    pub eval_segment: Vec<f64>,
    pub ohlc_rows: Vec<OhlcRow>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl RoundWindow {
    pub fn horizon(&self) -> usize {
        self.eval_segment.len()
    }

    /// The window's close column, train segment first.
    pub fn closes(&self) -> Vec<f64> {
        self.train_segment
            .iter()
            .chain(&self.eval_segment)
            .copied()
            .collect()
    }
}

/// Cuts a `window_length` slice out of `series` at a random offset and splits
/// its closes at `train_length`.
///
/// Series shorter than the window fail with `InsufficientHistory`; a series of
/// exactly `window_length` rows is used whole.
pub fn extract<R: Rng + ?Sized>(
    series: &SeriesRecord,
    config: &WindowConfig,
    rng: &mut R,
) -> Result<RoundWindow, ForecastGameError> {
    let WindowConfig {
        window_length,
        train_length,
    } = *config;

    if train_length == 0 || train_length >= window_length {
        return Err(ForecastGameError::ConfigInvalid {
            section: "round".into(),
            key: "train_length".into(),
            reason: format!(
                "train_length ({}) must be between 1 and window_length - 1 ({})",
                train_length,
                window_length.saturating_sub(1)
            ),
        });
    }

    let rows = series.rows();
    if rows.len() < window_length {
        return Err(ForecastGameError::InsufficientHistory {
            series_id: series.id().to_string(),
            rows: rows.len(),
            minimum: window_length,
        });
    }

    let start_index = rng.gen_range(0..=rows.len() - window_length);
    let window = &rows[start_index..start_index + window_length];

    let closes: Vec<f64> = window.iter().map(|r| r.close).collect();
    let (train, eval) = closes.split_at(train_length);

    Ok(RoundWindow {
        series_id: series.id().to_string(),
        start_index,
        window_length,
        train_segment: train.to_vec(),
        eval_segment: eval.to_vec(),
        ohlc_rows: window.to_vec(),
        start_date: window[0].date(),
        end_date: window[window_length - 1].date(),
    })
}
