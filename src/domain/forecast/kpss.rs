//! Differencing and the KPSS level-stationarity test used to pick `d`.

/// 5% critical value of the KPSS level-stationarity statistic.
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// Applies the first difference `d` times.
pub fn difference(x: &[f64], d: usize) -> Vec<f64> {
    let mut out = x.to_vec();
    for _ in 0..d {
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Undoes `d` differences of `history` for a forecast of the `d`-th
/// differenced series.
pub fn integrate(forecast: &[f64], history: &[f64], d: usize) -> Vec<f64> {
    let mut levels = Vec::with_capacity(d);
    let mut level = history.to_vec();
    for _ in 0..d {
        let next = difference(&level, 1);
        levels.push(level);
        level = next;
    }

    let mut out = forecast.to_vec();
    for series in levels.iter().rev() {
        let mut last = series.last().copied().unwrap_or(0.0);
        for v in out.iter_mut() {
            last += *v;
            *v = last;
        }
    }
    out
}

/// KPSS statistic for level stationarity with the short Newey–West lag
/// `trunc(3 * sqrt(n) / 13)`. `None` when the series is too short or constant.
pub fn kpss_level_statistic(x: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean = x.iter().sum::<f64>() / nf;
    let resid: Vec<f64> = x.iter().map(|v| v - mean).collect();

    let mut partial = 0.0;
    let eta = resid
        .iter()
        .map(|e| {
            partial += e;
            partial * partial
        })
        .sum::<f64>()
        / (nf * nf);

    let lags = ((3.0 * nf.sqrt() / 13.0).trunc() as usize).min(n - 1);
    let mut s2 = resid.iter().map(|e| e * e).sum::<f64>();
    for lag in 1..=lags {
        let weight = 1.0 - lag as f64 / (lags as f64 + 1.0);
        let cov: f64 = (lag..n).map(|t| resid[t] * resid[t - lag]).sum();
        s2 += 2.0 * weight * cov;
    }
    s2 /= nf;

    let scale = x.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    if !s2.is_finite() || s2 <= 1e-20 * scale * scale {
        return None;
    }
    Some(eta / s2)
}

/// Number of differences needed before KPSS stops rejecting level
/// stationarity, capped at `max_d`.
pub fn ndiffs(x: &[f64], max_d: usize) -> usize {
    let mut d = 0;
    let mut series = x.to_vec();
    while d < max_d {
        match kpss_level_statistic(&series) {
            Some(stat) if stat > KPSS_CRITICAL_5PCT => {
                d += 1;
                series = difference(&series, 1);
            }
            _ => break,
        }
    }
    d
}
