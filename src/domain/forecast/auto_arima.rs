//! Automatic ARIMA order selection.
//!
//! `d` comes from repeated KPSS tests. Orders are then searched either
//! stepwise, starting from a handful of seed models and moving to any
//! neighbour that lowers the information criterion, or over the full grid
//! bounded by `max_p`, `max_q` and `max_order`. A constant term is only
//! considered when d <= 1.

use std::collections::HashSet;

use super::arima::{self, ArimaFit, ArimaSpec, InformationCriterion};
use super::kpss::ndiffs;
use super::ModelForecast;
use crate::domain::error::ForecastGameError;
use crate::ports::forecast_port::ForecastModel;

#[derive(Debug, Clone, PartialEq)]
pub struct AutoArimaConfig {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    pub max_order: usize,
    pub start_p: usize,
    pub start_q: usize,
    pub max_steps: usize,
    pub stepwise: bool,
    pub criterion: InformationCriterion,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_d: 2,
            max_q: 5,
            max_order: 5,
            start_p: 2,
            start_q: 2,
            max_steps: 100,
            stepwise: true,
            criterion: InformationCriterion::Aic,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AutoArima {
    config: AutoArimaConfig,
}

const NEIGHBOUR_MOVES: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
];

struct Search<'a> {
    x: &'a [f64],
    d: usize,
    config: &'a AutoArimaConfig,
    visited: HashSet<ArimaSpec>,
    best: Option<(ArimaFit, f64)>,
    last_error: Option<String>,
    fits: usize,
}

impl<'a> Search<'a> {
    fn in_bounds(&self, p: usize, q: usize) -> bool {
        p <= self.config.max_p && q <= self.config.max_q && p + q <= self.config.max_order
    }

    fn allow_constant(&self) -> bool {
        self.d <= 1
    }

    /// Fits `spec` unless already tried. Returns true when it became the best.
    fn consider(&mut self, spec: ArimaSpec) -> bool {
        if !self.in_bounds(spec.p, spec.q) || !self.visited.insert(spec) {
            return false;
        }
        self.fits += 1;

        match arima::fit(self.x, spec) {
            Ok(fit) => {
                let score = fit.criterion(self.config.criterion);
                tracing::debug!(model = %spec, score, converged = fit.converged, "fitted candidate");
                let better = self.best.as_ref().is_none_or(|(_, best)| score < *best);
                if better {
                    self.best = Some((fit, score));
                }
                better
            }
            Err(e) => {
                tracing::debug!(model = %spec, error = %e, "candidate rejected");
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    fn stepwise(&mut self) {
        let c = self.allow_constant();
        let d = self.d;
        let seeds = [
            (self.config.start_p.min(self.config.max_p), self.config.start_q.min(self.config.max_q), c),
            (0, 0, c),
            (1, 0, c),
            (0, 1, c),
            (0, 0, false),
        ];
        for (p, q, constant) in seeds {
            self.consider(ArimaSpec { p, d, q, constant });
        }

        'search: loop {
            let Some(current) = self.best.as_ref().map(|(fit, _)| fit.spec) else {
                break;
            };

            let mut candidates: Vec<ArimaSpec> = NEIGHBOUR_MOVES
                .iter()
                .filter_map(|(dp, dq)| {
                    let p = current.p.checked_add_signed(*dp)?;
                    let q = current.q.checked_add_signed(*dq)?;
                    Some(ArimaSpec { p, q, ..current })
                })
                .collect();
            if c {
                candidates.push(ArimaSpec {
                    constant: !current.constant,
                    ..current
                });
            }

            let mut moved = false;
            for spec in candidates {
                if self.fits >= self.config.max_steps {
                    break 'search;
                }
                if self.consider(spec) {
                    moved = true;
                    break;
                }
            }
            if !moved {
                break;
            }
        }
    }

    fn grid(&mut self) {
        let constants: &[bool] = if self.allow_constant() { &[true, false] } else { &[false] };
        for p in 0..=self.config.max_p {
            for q in 0..=self.config.max_q {
                for &constant in constants {
                    self.consider(ArimaSpec { p, d: self.d, q, constant });
                }
            }
        }
    }
}

impl AutoArima {
    pub fn new(config: AutoArimaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AutoArimaConfig {
        &self.config
    }

    /// Runs the order search on `x` and returns the best fit.
    pub fn select(&self, x: &[f64]) -> Result<ArimaFit, ForecastGameError> {
        if x.is_empty() {
            return Err(ForecastGameError::ModelFitFailed {
                reason: "empty training segment".into(),
            });
        }
        if let Some(i) = x.iter().position(|v| !v.is_finite()) {
            return Err(ForecastGameError::ModelFitFailed {
                reason: format!("non-finite training value at index {}", i),
            });
        }

        let d = ndiffs(x, self.config.max_d);
        let mut search = Search {
            x,
            d,
            config: &self.config,
            visited: HashSet::new(),
            best: None,
            last_error: None,
            fits: 0,
        };

        if self.config.stepwise {
            search.stepwise();
        } else {
            search.grid();
        }

        match search.best {
            Some((fit, score)) => {
                tracing::info!(
                    model = %fit.spec,
                    criterion = %self.config.criterion,
                    score,
                    candidates = search.fits,
                    "selected model"
                );
                Ok(fit)
            }
            None => Err(ForecastGameError::ModelFitFailed {
                reason: search.last_error.unwrap_or_else(|| {
                    format!("no admissible model for {} observations", x.len())
                }),
            }),
        }
    }
}

impl ForecastModel for AutoArima {
    fn name(&self) -> &str {
        "auto-arima"
    }

    fn fit_and_forecast(
        &self,
        train: &[f64],
        horizon: usize,
    ) -> Result<ModelForecast, ForecastGameError> {
        let fit = self.select(train)?;
        let values = fit.forecast(horizon);
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastGameError::ModelFitFailed {
                reason: format!("{} produced a non-finite forecast at step {}", fit.spec, i + 1),
            });
        }
        Ok(ModelForecast {
            values,
            label: fit.spec.to_string(),
        })
    }
}
