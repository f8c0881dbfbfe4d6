//! Calculus-flavoured per-bar scoring signal.
//!
//! Every row from index 3 onward gets five raw features built from the state vector
//! x = [return, range %, body %, volume z-score]. Each feature column is min-max
//! normalized over those rows and the weighted sum becomes `calculus_strength` in
//! [0, 1]. This is a ranking heuristic, not a forecast.

use crate::domain::derived::{DerivedRow, ratio};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rows before this index have too little history and stay zero.
pub const WARMUP: usize = 3;
pub const GREENS_WINDOW: usize = 15;

const EXTRAPOLATION_SHARPNESS: f64 = 15.0;
const WEIGHTS: [f64; 5] = [0.22, 0.18, 0.20, 0.20, 0.20];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculusFeatureRow {
    pub time: DateTime<Utc>,
    pub jacobian_norm: f64,
    pub hessian_trace: f64,
    pub greens_circulation: f64,
    pub taylor_score: f64,
    pub lagrange_score: f64,
    pub calculus_strength: f64,
}

type State = [f64; 4];

fn state(row: &DerivedRow) -> State {
    [
        row.return_1,
        row.high_low_spread,
        row.open_close_spread,
        row.volume_zscore_20.unwrap_or(0.0),
    ]
}

fn phi(x: &State) -> State {
    [
        x[0].sin(),
        (15.0 * x[1]).atan(),
        (8.0 * x[2]).tanh(),
        (-x[3] * x[3]).exp(),
    ]
}

fn norm(v: &State) -> f64 {
    v.iter().map(|a| a * a).sum::<f64>().sqrt()
}

/// Frobenius norm of outer(a, b), which factors into |a| * |b|.
fn outer_frobenius(a: &State, b: &State) -> f64 {
    norm(a) * norm(b)
}

/// Signed shoelace area of the closed polygon through `xs`/`ys`.
pub fn shoelace(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for k in 0..n {
        let next = (k + 1) % n;
        sum += xs[k] * ys[next] - xs[next] * ys[k];
    }
    sum / 2.0
}

fn standardize(values: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = var.sqrt();
    values.iter().map(|v| ratio(v - mean, sd)).collect()
}

/// Min-max normalizes `values` to [0, 1]; a constant column maps to all zeros.
pub fn min_max(values: &[f64]) -> Vec<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    values
        .iter()
        .map(|v| if span > 0.0 { (v - lo) / span } else { 0.0 })
        .collect()
}

fn extrapolation_score(predicted: f64, actual: f64) -> f64 {
    let err = ratio((predicted - actual).abs(), actual.abs());
    (-EXTRAPOLATION_SHARPNESS * err).exp()
}

pub fn compute_calculus(rows: &[DerivedRow]) -> Vec<CalculusFeatureRow> {
    let mut out: Vec<CalculusFeatureRow> = rows
        .iter()
        .map(|r| CalculusFeatureRow {
            time: r.time,
            jacobian_norm: 0.0,
            hessian_trace: 0.0,
            greens_circulation: 0.0,
            taylor_score: 0.0,
            lagrange_score: 0.0,
            calculus_strength: 0.0,
        })
        .collect();
    if rows.len() <= WARMUP {
        return out;
    }

    let states: Vec<State> = rows.iter().map(state).collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let volumes: Vec<f64> = rows.iter().map(|r| r.volume).collect();

    let mut raw: [Vec<f64>; 5] = Default::default();
    for i in WARMUP..rows.len() {
        let x = &states[i];
        let prev = &states[i - 1];
        let prev2 = &states[i - 2];

        let delta: State = std::array::from_fn(|k| x[k] - prev[k]);
        let second: State = std::array::from_fn(|k| x[k] - 2.0 * prev[k] + prev2[k]);
        raw[0].push(outer_frobenius(&phi(x), &delta));
        raw[1].push(second.iter().map(|d| d * d).sum());

        let from = (i + 1).saturating_sub(GREENS_WINDOW);
        let zc = standardize(&closes[from..=i]);
        let zv = standardize(&volumes[from..=i]);
        raw[2].push(shoelace(&zc, &zv).abs());

        let (c1, c2, c3) = (closes[i - 1], closes[i - 2], closes[i - 3]);
        let taylor = c1 + (c1 - c2) + 0.5 * (c1 - 2.0 * c2 + c3);
        let lagrange = 3.0 * c1 - 3.0 * c2 + c3;
        raw[3].push(extrapolation_score(taylor, closes[i]));
        raw[4].push(extrapolation_score(lagrange, closes[i]));
    }

    let normalized: Vec<Vec<f64>> = raw.iter().map(|col| min_max(col)).collect();
    for (k, row) in out[WARMUP..].iter_mut().enumerate() {
        row.jacobian_norm = normalized[0][k];
        row.hessian_trace = normalized[1][k];
        row.greens_circulation = normalized[2][k];
        row.taylor_score = normalized[3][k];
        row.lagrange_score = normalized[4][k];
        row.calculus_strength = (0..5).map(|f| WEIGHTS[f] * normalized[f][k]).sum();
    }
    out
}
