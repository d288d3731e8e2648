//! Domain error types.

/// Top-level error type for forecast-duel.
#[derive(Debug, thiserror::Error)]
pub enum ForecastGameError {
    #[error("series pool is empty: no series available to draw")]
    PoolExhaustedPermanently,

    #[error("insufficient history for {series_id}: have {rows} rows, need {minimum}")]
    InsufficientHistory {
        series_id: String,
        rows: usize,
        minimum: usize,
    },

    #[error("model fit failed: {reason}")]
    ModelFitFailed { reason: String },

    #[error("forecast length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("series {series_id} unavailable: {reason}")]
    SeriesUnavailable { series_id: String, reason: String },

    #[error("round {round_number} is already resolved")]
    RoundAlreadyResolved { round_number: u64 },

    #[error("no playable round after {attempts} attempts: {source}")]
    RoundUnavailable {
        attempts: usize,
        #[source]
        source: Box<ForecastGameError>,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ForecastGameError {
    /// Failures that another draw from the pool may get past.
    pub fn is_retryable_draw(&self) -> bool {
        matches!(
            self,
            ForecastGameError::InsufficientHistory { .. }
                | ForecastGameError::ModelFitFailed { .. }
                | ForecastGameError::SeriesUnavailable { .. }
        )
    }

    /// Stable machine-readable name, used in web error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastGameError::PoolExhaustedPermanently => "pool_exhausted_permanently",
            ForecastGameError::InsufficientHistory { .. } => "insufficient_history",
            ForecastGameError::ModelFitFailed { .. } => "model_fit_failed",
            ForecastGameError::LengthMismatch { .. } => "length_mismatch",
            ForecastGameError::SeriesUnavailable { .. } => "series_unavailable",
            ForecastGameError::RoundAlreadyResolved { .. } => "round_already_resolved",
            ForecastGameError::RoundUnavailable { .. } => "round_unavailable",
            ForecastGameError::ConfigParse { .. } => "config_parse",
            ForecastGameError::ConfigMissing { .. } => "config_missing",
            ForecastGameError::ConfigInvalid { .. } => "config_invalid",
            ForecastGameError::Io(_) => "io",
        }
    }
}

impl From<&ForecastGameError> for std::process::ExitCode {
    fn from(err: &ForecastGameError) -> Self {
        let code: u8 = match err {
            ForecastGameError::Io(_) => 1,
            ForecastGameError::ConfigParse { .. }
            | ForecastGameError::ConfigMissing { .. }
            | ForecastGameError::ConfigInvalid { .. } => 2,
            ForecastGameError::PoolExhaustedPermanently
            | ForecastGameError::SeriesUnavailable { .. } => 3,
            ForecastGameError::InsufficientHistory { .. }
            | ForecastGameError::RoundUnavailable { .. } => 4,
            ForecastGameError::ModelFitFailed { .. } => 5,
            ForecastGameError::LengthMismatch { .. }
            | ForecastGameError::RoundAlreadyResolved { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
