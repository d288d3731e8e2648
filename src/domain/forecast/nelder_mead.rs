//! Nelder–Mead simplex minimisation.
//!
//! Standard coefficients: reflection 1, expansion 2, contraction 0.5,
//! shrink 0.5. NaN objective values are treated as +inf so a point outside the
//! admissible region is never preferred.

#[derive(Debug, Clone, Copy)]
pub struct NelderMeadOptions {
    pub max_iter: usize,
    pub f_tol: f64,
    pub x_tol: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iter: 2_000,
            f_tol: 1e-10,
            x_tol: 1e-8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Minimises `f` starting from `x0`; `steps[i]` is the initial simplex edge
/// along coordinate `i`.
pub fn minimize<F>(mut f: F, x0: &[f64], steps: &[f64], options: &NelderMeadOptions) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let mut eval = |x: &[f64]| {
        let v = f(x);
        if v.is_nan() { f64::INFINITY } else { v }
    };

    let n = x0.len();
    if n == 0 {
        let value = eval(x0);
        return Minimum {
            x: Vec::new(),
            value,
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((x0.to_vec(), eval(x0)));
    for i in 0..n {
        let mut x = x0.to_vec();
        x[i] += steps.get(i).copied().unwrap_or(0.1);
        let v = eval(&x);
        simplex.push((x, v));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iter {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));

        let best = simplex[0].1;
        let worst = simplex[n].1;
        if best.is_finite() && worst.is_finite() {
            let f_spread = (worst - best).abs();
            let x_spread = simplex[1..]
                .iter()
                .flat_map(|(x, _)| x.iter().zip(&simplex[0].0).map(|(a, b)| (a - b).abs()))
                .fold(0.0_f64, f64::max);
            if f_spread <= options.f_tol * (1.0 + best.abs()) && x_spread <= options.x_tol {
                converged = true;
                break;
            }
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
            .collect();
        let toward = |from: &[f64], coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(from)
                .map(|(c, x)| c + coef * (x - c))
                .collect()
        };

        let reflected = toward(&simplex[n].0, -ALPHA);
        let f_reflected = eval(&reflected);

        if f_reflected < simplex[0].1 {
            let expanded = toward(&reflected, GAMMA);
            let f_expanded = eval(&expanded);
            simplex[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }

        if f_reflected < simplex[n - 1].1 {
            simplex[n] = (reflected, f_reflected);
            continue;
        }

        let (contracted, f_contracted, accept) = if f_reflected < simplex[n].1 {
            let c = toward(&reflected, RHO);
            let fc = eval(&c);
            let ok = fc <= f_reflected;
            (c, fc, ok)
        } else {
            let c = toward(&simplex[n].0, RHO);
            let fc = eval(&c);
            let ok = fc < simplex[n].1;
            (c, fc, ok)
        };

        if accept {
            simplex[n] = (contracted, f_contracted);
            continue;
        }

        let best_x = simplex[0].0.clone();
        for (x, v) in simplex.iter_mut().skip(1) {
            for (xi, bi) in x.iter_mut().zip(&best_x) {
                *xi = bi + SIGMA * (*xi - bi);
            }
            *v = eval(x);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, value) = simplex.swap_remove(0);
    Minimum {
        x,
        value,
        iterations,
        converged,
    }
}
