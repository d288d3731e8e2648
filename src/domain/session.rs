//! Round lifecycle and the state carried between rounds.
//!
//! A [`RoundSession`] is always holding one round, either awaiting the
//! player's forecast or resolved. Advancing builds the next round completely
//! before replacing the current one, so a failed draw leaves the session as it
//! was. [`SharedSession`] serialises every operation behind one mutex; the pool
//! mutex is only ever taken while the session lock is held.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::domain::error::ForecastGameError;
use crate::domain::forecast::ModelForecast;
use crate::domain::pool::PoolSampler;
use crate::domain::scorer::{self, Side};
use crate::domain::series::OhlcRow;
use crate::domain::window::{self, RoundWindow, WindowConfig};
use crate::ports::forecast_port::ForecastModel;
use crate::ports::series_port::SeriesStore;

pub const DEFAULT_MAX_DRAW_ATTEMPTS: usize = 5;

/// Process-wide pool, shared by reference with the session.
pub type SharedPool = Arc<Mutex<PoolSampler>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundConfig {
    pub window: WindowConfig,
    pub max_draw_attempts: usize,
    pub seed: Option<u64>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            max_draw_attempts: DEFAULT_MAX_DRAW_ATTEMPTS,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Player,
    Model,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreState {
    pub wins_player: u64,
    pub wins_model: u64,
}

impl ScoreState {
    fn record(&mut self, winner: Winner) {
        match winner {
            Winner::Player => self.wins_player += 1,
            Winner::Model => self.wins_model += 1,
        }
    }

    pub fn rounds_played(&self) -> u64 {
        self.wins_player + self.wins_model
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitResult {
    pub winner: Winner,
    pub mse_player: f64,
    pub mse_model: f64,
    pub eval_segment: Vec<f64>,
    pub scores: ScoreState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundPhase {
    AwaitingSubmission,
    Resolved(SubmitResult),
}

/// Plain-data view of the current round for the request layer.
#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub round_number: u64,
    pub instrument_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub train_segment: Vec<f64>,
    pub eval_segment: Option<Vec<f64>>,
    pub model_forecast: Vec<f64>,
    pub model_label: String,
    pub ohlc_rows: Vec<OhlcRow>,
    pub scores: ScoreState,
    pub resolved: bool,
}

#[derive(Debug, Clone)]
struct ActiveRound {
    window: RoundWindow,
    forecast: ModelForecast,
    phase: RoundPhase,
}

pub fn shared_pool(store: &dyn SeriesStore) -> Result<SharedPool, ForecastGameError> {
    let ids = store.list_ids()?;
    Ok(Arc::new(Mutex::new(PoolSampler::new(ids))))
}

fn lock_pool(pool: &Mutex<PoolSampler>) -> MutexGuard<'_, PoolSampler> {
    pool.lock().unwrap_or_else(PoisonError::into_inner)
}

fn try_round(
    store: &dyn SeriesStore,
    model: &dyn ForecastModel,
    series_id: &str,
    config: &RoundConfig,
    rng: &mut StdRng,
) -> Result<ActiveRound, ForecastGameError> {
    let series = store.load(series_id)?;
    let window = window::extract(&series, &config.window, rng)?;
    let horizon = window.horizon();
    let forecast = model.fit_and_forecast(&window.train_segment, horizon)?;
    if forecast.values.len() != horizon {
        return Err(ForecastGameError::ModelFitFailed {
            reason: format!(
                "{} returned {} values for a horizon of {}",
                model.name(),
                forecast.values.len(),
                horizon
            ),
        });
    }
    Ok(ActiveRound {
        window,
        forecast,
        phase: RoundPhase::AwaitingSubmission,
    })
}

/// Draws series until one yields a playable round. Retryable failures move on
/// to another draw; anything else, or running out of attempts, is returned.
fn build_round(
    store: &dyn SeriesStore,
    model: &dyn ForecastModel,
    pool: &Mutex<PoolSampler>,
    config: &RoundConfig,
    rng: &mut StdRng,
) -> Result<ActiveRound, ForecastGameError> {
    let attempts = config.max_draw_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let series_id = lock_pool(pool).draw(rng)?;

        match try_round(store, model, &series_id, config, rng) {
            Ok(round) => {
                tracing::info!(
                    series_id = %series_id,
                    start_index = round.window.start_index,
                    model = %round.forecast.label,
                    attempt,
                    "round ready"
                );
                return Ok(round);
            }
            Err(e) if e.is_retryable_draw() && attempt < attempts => {
                tracing::warn!(series_id = %series_id, attempt, error = %e, "draw unusable, trying another series");
            }
            Err(e) if e.is_retryable_draw() => {
                return Err(ForecastGameError::RoundUnavailable {
                    attempts,
                    source: Box::new(e),
                });
            }
            Err(e) => return Err(e),
        }
    }
}

pub struct RoundSession {
    store: Arc<dyn SeriesStore + Send + Sync>,
    model: Arc<dyn ForecastModel + Send + Sync>,
    pool: SharedPool,
    config: RoundConfig,
    rng: StdRng,
    round_number: u64,
    round: ActiveRound,
    scores: ScoreState,
}

impl RoundSession {
    /// Builds round 0 with fresh scores.
    pub fn start(
        store: Arc<dyn SeriesStore + Send + Sync>,
        model: Arc<dyn ForecastModel + Send + Sync>,
        pool: SharedPool,
        config: RoundConfig,
    ) -> Result<Self, ForecastGameError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let round = build_round(store.as_ref(), model.as_ref(), &pool, &config, &mut rng)?;
        Ok(Self {
            store,
            model,
            pool,
            config,
            rng,
            round_number: 0,
            round,
            scores: ScoreState::default(),
        })
    }

    /// Replaces the current round with a freshly drawn one. Scores carry over.
    /// On failure the current round is left untouched.
    pub fn new_round(&mut self) -> Result<(), ForecastGameError> {
        let round = build_round(
            self.store.as_ref(),
            self.model.as_ref(),
            &self.pool,
            &self.config,
            &mut self.rng,
        )?;
        self.round = round;
        self.round_number += 1;
        Ok(())
    }

    /// Scores the player's forecast against the model's. The model wins ties.
    pub fn submit(&mut self, player_forecast: &[f64]) -> Result<SubmitResult, ForecastGameError> {
        if let RoundPhase::Resolved(_) = self.round.phase {
            return Err(ForecastGameError::RoundAlreadyResolved {
                round_number: self.round_number,
            });
        }

        let outcome = scorer::score(
            &self.round.window.eval_segment,
            player_forecast,
            &self.round.forecast.values,
        )?;
        let winner = match outcome.winner {
            Side::A => Winner::Player,
            Side::B => Winner::Model,
        };
        self.scores.record(winner);

        let result = SubmitResult {
            winner,
            mse_player: outcome.mse_a,
            mse_model: outcome.mse_b,
            eval_segment: self.round.window.eval_segment.clone(),
            scores: self.scores,
        };
        tracing::info!(
            round = self.round_number,
            series_id = %self.round.window.series_id,
            winner = ?winner,
            mse_player = outcome.mse_a,
            mse_model = outcome.mse_b,
            "round resolved"
        );
        self.round.phase = RoundPhase::Resolved(result.clone());
        Ok(result)
    }

    /// The held-out segment, and the OHLC rows past the training prefix, are
    /// included only once the round is resolved or when `reveal` is set.
    pub fn snapshot(&self, reveal: bool) -> RoundSnapshot {
        let window = &self.round.window;
        let resolved = self.is_resolved();
        let shown = if resolved || reveal {
            window.ohlc_rows.len()
        } else {
            window.train_segment.len()
        };
        RoundSnapshot {
            round_number: self.round_number,
            instrument_id: window.series_id.clone(),
            start_date: window.start_date,
            end_date: window.end_date,
            train_segment: window.train_segment.clone(),
            eval_segment: (resolved || reveal).then(|| window.eval_segment.clone()),
            model_forecast: self.round.forecast.values.clone(),
            model_label: self.round.forecast.label.clone(),
            ohlc_rows: window.ohlc_rows.iter().take(shown).cloned().collect(),
            scores: self.scores,
            resolved,
        }
    }

    /// Starts a new pool rotation without touching the current round.
    pub fn restart_rotation(&self) {
        lock_pool(&self.pool).reset();
        tracing::info!("series rotation restarted");
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.round.phase, RoundPhase::Resolved(_))
    }

    pub fn phase(&self) -> &RoundPhase {
        &self.round.phase
    }

    pub fn window(&self) -> &RoundWindow {
        &self.round.window
    }

    pub fn model_forecast(&self) -> &ModelForecast {
        &self.round.forecast
    }

    pub fn scores(&self) -> ScoreState {
        self.scores
    }

    pub fn round_number(&self) -> u64 {
        self.round_number
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }
}

/// A [`RoundSession`] behind one mutex, shareable across request handlers.
pub struct SharedSession {
    inner: Mutex<RoundSession>,
}

impl SharedSession {
    pub fn new(session: RoundSession) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }

    /// Runs `f` with exclusive access to the session.
    pub fn with<T>(&self, f: impl FnOnce(&mut RoundSession) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self, reveal: bool) -> RoundSnapshot {
        self.with(|s| s.snapshot(reveal))
    }

    pub fn new_round(&self) -> Result<RoundSnapshot, ForecastGameError> {
        self.with(|s| {
            s.new_round()?;
            Ok(s.snapshot(false))
        })
    }

    pub fn submit(&self, player_forecast: &[f64]) -> Result<SubmitResult, ForecastGameError> {
        self.with(|s| s.submit(player_forecast))
    }

    pub fn scores(&self) -> ScoreState {
        self.with(|s| s.scores())
    }

    pub fn restart_rotation(&self) {
        self.with(|s| s.restart_rotation())
    }
}
