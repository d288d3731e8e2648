//! Non-seasonal ARIMA(p, d, q) fitted by conditional sum of squares.
//!
//! The series is differenced `d` times and an ARMA(p, q) with optional mean
//! (called drift when d = 1) is fitted to the result:
//!
//! ```text
//! w[t] - mu = sum_i ar[i] (w[t-1-i] - mu) + e[t] + sum_j ma[j] e[t-1-j]
//! ```
//!
//! The first `p` residuals are conditioned to zero. Parameters outside the
//! stationary (AR) or invertible (MA) region are rejected by the objective.

use std::fmt;
use std::str::FromStr;

use super::kpss::{difference, integrate};
use super::nelder_mead::{self, NelderMeadOptions};

/// Largest partial autocorrelation modulus accepted as stationary.
const UNIT_ROOT_MARGIN: f64 = 1.0 - 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArimaSpec {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub constant: bool,
}

impl ArimaSpec {
    /// Coefficients estimated, not counting the innovation variance.
    pub fn coefficient_count(&self) -> usize {
        self.p + self.q + usize::from(self.constant)
    }
}

impl fmt::Display for ArimaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.constant {
            match self.d {
                0 => write!(f, " with non-zero mean")?,
                _ => write!(f, " with drift")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformationCriterion {
    Aic,
    Aicc,
    Bic,
}

impl FromStr for InformationCriterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aic" => Ok(Self::Aic),
            "aicc" => Ok(Self::Aicc),
            "bic" => Ok(Self::Bic),
            other => Err(format!("unknown information criterion '{}'", other)),
        }
    }
}

impl fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Aic => "aic",
            Self::Aicc => "aicc",
            Self::Bic => "bic",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("{spec} needs more than {needed} usable observations, have {have}")]
    TooFewObservations {
        spec: ArimaSpec,
        have: usize,
        needed: usize,
    },

    #[error("{spec} produced a non-finite {what}")]
    NonFinite { spec: ArimaSpec, what: &'static str },
}

#[derive(Debug, Clone)]
pub struct ArimaFit {
    pub spec: ArimaSpec,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub mean: f64,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    pub converged: bool,
    history: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

impl ArimaFit {
    pub fn criterion(&self, ic: InformationCriterion) -> f64 {
        match ic {
            InformationCriterion::Aic => self.aic,
            InformationCriterion::Aicc => self.aicc,
            InformationCriterion::Bic => self.bic,
        }
    }

    /// Point forecasts for the next `horizon` steps on the original scale.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let n = self.differenced.len();
        let mut z: Vec<f64> = self.differenced.iter().map(|w| w - self.mean).collect();
        let mut e = self.residuals.clone();

        for _ in 0..horizon {
            let t = z.len();
            let mut pred = 0.0;
            for (i, phi) in self.ar.iter().enumerate().filter(|(i, _)| t > *i) {
                pred += phi * z[t - 1 - i];
            }
            for (j, theta) in self.ma.iter().enumerate().filter(|(j, _)| t > *j) {
                pred += theta * e[t - 1 - j];
            }
            z.push(pred);
            e.push(0.0);
        }

        let steps: Vec<f64> = z[n..].iter().map(|v| v + self.mean).collect();
        integrate(&steps, &self.history, self.spec.d)
    }
}

/// Residuals of the ARMA recursion, zero for the first `ar.len()` points.
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64], mean: f64) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut pred = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mean);
        }
        for (j, theta) in ma.iter().enumerate().filter(|(j, _)| t > *j) {
            pred += theta * e[t - 1 - j];
        }
        e[t] = (w[t] - mean) - pred;
    }
    e
}

/// True when every root of `1 - c[0] z - ... - c[k-1] z^k` lies outside the
/// unit circle.
///
/// Runs the Durbin-Levinson recursion backwards: the polynomial is stationary
/// exactly when every partial autocorrelation it steps down through has
/// modulus below one.
pub fn is_stable(coeffs: &[f64]) -> bool {
    if !coeffs.iter().all(|c| c.is_finite()) {
        return false;
    }
    let mut a = coeffs.to_vec();
    while let Some(&r) = a.last() {
        if r.abs() >= UNIT_ROOT_MARGIN {
            return false;
        }
        let k = a.len();
        let scale = 1.0 - r * r;
        a = (0..k - 1).map(|j| (a[j] + r * a[k - 2 - j]) / scale).collect();
        if !a.iter().all(|c| c.is_finite()) {
            return false;
        }
    }
    true
}

fn is_invertible(ma: &[f64]) -> bool {
    let negated: Vec<f64> = ma.iter().map(|t| -t).collect();
    is_stable(&negated)
}

fn split_params(params: &[f64], spec: &ArimaSpec) -> (Vec<f64>, Vec<f64>, f64) {
    let ar = params[..spec.p].to_vec();
    let ma = params[spec.p..spec.p + spec.q].to_vec();
    let mean = if spec.constant {
        params[spec.p + spec.q]
    } else {
        0.0
    };
    (ar, ma, mean)
}

/// Fits `spec` to `x` by minimising the conditional sum of squares.
pub fn fit(x: &[f64], spec: ArimaSpec) -> Result<ArimaFit, FitError> {
    let w = difference(x, spec.d);
    let k = spec.coefficient_count() + 1;
    let n_eff = w.len().saturating_sub(spec.p);
    if n_eff <= k + 1 {
        return Err(FitError::TooFewObservations {
            spec,
            have: n_eff,
            needed: k + 1,
        });
    }

    let w_mean = w.iter().sum::<f64>() / w.len() as f64;
    let w_sd = (w.iter().map(|v| (v - w_mean).powi(2)).sum::<f64>() / w.len() as f64).sqrt();

    let mut x0 = vec![0.0; spec.p + spec.q];
    let mut steps = vec![0.1; spec.p + spec.q];
    if spec.constant {
        x0.push(w_mean);
        steps.push((0.1 * w_sd).max(1e-6));
    }

    let objective = |params: &[f64]| -> f64 {
        let (ar, ma, mean) = split_params(params, &spec);
        if !is_stable(&ar) || !is_invertible(&ma) {
            return f64::INFINITY;
        }
        css_residuals(&w, &ar, &ma, mean)[spec.p..]
            .iter()
            .map(|e| e * e)
            .sum()
    };

    let options = NelderMeadOptions {
        max_iter: 500 * (x0.len() + 1),
        ..NelderMeadOptions::default()
    };
    let min = nelder_mead::minimize(objective, &x0, &steps, &options);
    if !min.value.is_finite() {
        return Err(FitError::NonFinite {
            spec,
            what: "sum of squares",
        });
    }

    let (ar, ma, mean) = split_params(&min.x, &spec);
    let residuals = css_residuals(&w, &ar, &ma, mean);

    let nf = n_eff as f64;
    let sigma2 = (min.value / nf).max(f64::MIN_POSITIVE);
    let log_likelihood = -0.5 * nf * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
    let kf = k as f64;
    let aic = -2.0 * log_likelihood + 2.0 * kf;
    let aicc = aic + 2.0 * kf * (kf + 1.0) / (nf - kf - 1.0);
    let bic = -2.0 * log_likelihood + kf * nf.ln();

    if !aic.is_finite() || !aicc.is_finite() || !bic.is_finite() {
        return Err(FitError::NonFinite {
            spec,
            what: "information criterion",
        });
    }

    Ok(ArimaFit {
        spec,
        ar,
        ma,
        mean,
        sigma2,
        log_likelihood,
        aic,
        aicc,
        bic,
        converged: min.converged,
        history: x.to_vec(),
        differenced: w,
        residuals,
    })
}
