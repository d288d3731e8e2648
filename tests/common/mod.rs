#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use forecast_duel::domain::error::ForecastGameError;
use forecast_duel::domain::forecast::ModelForecast;
pub use forecast_duel::domain::series::{OhlcRow, SeriesRecord};
use forecast_duel::domain::session::{RoundConfig, RoundSession, shared_pool};
use forecast_duel::ports::forecast_port::ForecastModel;
use forecast_duel::ports::series_port::SeriesStore;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct MockSeriesStore {
    pub data: HashMap<String, Vec<OhlcRow>>,
    pub errors: HashMap<String, String>,
    pub loads: AtomicUsize,
}

impl MockSeriesStore {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn with_rows(mut self, id: &str, rows: Vec<OhlcRow>) -> Self {
        self.data.insert(id.to_string(), rows);
        self
    }

    pub fn with_series(self, id: &str, count: usize, start_price: f64) -> Self {
        self.with_rows(id, generate_rows(count, start_price))
    }

    pub fn with_error(mut self, id: &str, reason: &str) -> Self {
        self.errors.insert(id.to_string(), reason.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SeriesStore for MockSeriesStore {
    fn list_ids(&self) -> Result<BTreeSet<String>, ForecastGameError> {
        Ok(self.data.keys().chain(self.errors.keys()).cloned().collect())
    }

    fn load(&self, id: &str) -> Result<SeriesRecord, ForecastGameError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(id) {
            return Err(ForecastGameError::SeriesUnavailable {
                series_id: id.to_string(),
                reason: reason.clone(),
            });
        }
        let rows = self
            .data
            .get(id)
            .cloned()
            .ok_or_else(|| ForecastGameError::SeriesUnavailable {
                series_id: id.to_string(),
                reason: "unknown id".to_string(),
            })?;
        SeriesRecord::new(id, rows)
    }
}

/// Forecasts `value` at every step.
pub struct ConstantModel {
    pub value: f64,
}

impl ForecastModel for ConstantModel {
    fn name(&self) -> &str {
        "constant"
    }

    fn fit_and_forecast(
        &self,
        _train: &[f64],
        horizon: usize,
    ) -> Result<ModelForecast, ForecastGameError> {
        Ok(ModelForecast {
            values: vec![self.value; horizon],
            label: format!("constant {}", self.value),
        })
    }
}

/// Fails the first `failures` fits, then repeats the last training value.
pub struct FlakyModel {
    pub failures: usize,
    pub calls: AtomicUsize,
}

impl FlakyModel {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ForecastModel for FlakyModel {
    fn name(&self) -> &str {
        "flaky"
    }

    fn fit_and_forecast(
        &self,
        train: &[f64],
        horizon: usize,
    ) -> Result<ModelForecast, ForecastGameError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ForecastGameError::ModelFitFailed {
                reason: format!("synthetic failure {}", call + 1),
            });
        }
        let last = train.last().copied().unwrap_or_default();
        Ok(ModelForecast {
            values: vec![last; horizon],
            label: "flaky".to_string(),
        })
    }
}

/// Repeats the last training value until switched into failing mode.
pub struct ToggleModel {
    pub failing: AtomicBool,
}

impl ToggleModel {
    pub fn new() -> Self {
        Self {
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ForecastModel for ToggleModel {
    fn name(&self) -> &str {
        "toggle"
    }

    fn fit_and_forecast(
        &self,
        train: &[f64],
        horizon: usize,
    ) -> Result<ModelForecast, ForecastGameError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ForecastGameError::ModelFitFailed {
                reason: "switched off".to_string(),
            });
        }
        let last = train.last().copied().unwrap_or_default();
        Ok(ModelForecast {
            values: vec![last; horizon],
            label: "toggle".to_string(),
        })
    }
}

pub fn start_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2024, 1, 2, 9, 30, 0)
        .unwrap()
}

/// Hourly rows whose close rises by one each step.
pub fn generate_rows(count: usize, start_price: f64) -> Vec<OhlcRow> {
    (0..count)
        .map(|i| {
            let close = start_price + i as f64;
            OhlcRow {
                timestamp: start_time() + Duration::hours(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
            }
        })
        .collect()
}

pub fn seeded_config(seed: u64) -> RoundConfig {
    RoundConfig {
        seed: Some(seed),
        ..RoundConfig::default()
    }
}

pub fn start_session(
    store: Arc<MockSeriesStore>,
    model: Arc<dyn ForecastModel + Send + Sync>,
    config: RoundConfig,
) -> Result<RoundSession, ForecastGameError> {
    let pool = shared_pool(store.as_ref())?;
    RoundSession::start(store, model, pool, config)
}

/// Writes rows in the hourly download layout, including the ignored columns.
pub fn write_series_csv(dir: &Path, id: &str, rows: &[OhlcRow]) {
    let mut content = String::from("Datetime,Open,High,Low,Close,Volume,Dividends,Stock Splits\n");
    for row in rows {
        content.push_str(&format!(
            "{},{},{},{},{},1000,0.0,0.0\n",
            row.timestamp.format("%Y-%m-%d %H:%M:%S%:z"),
            row.open,
            row.high,
            row.low,
            row.close
        ));
    }
    fs::write(dir.join(format!("{}.csv", id)), content).unwrap();
}
