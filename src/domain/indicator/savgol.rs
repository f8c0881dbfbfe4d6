//! Savitzky-Golay smoothing.
//!
//! Each sample is replaced by the value of a least-squares polynomial of the given
//! degree fitted over a centered odd window. At the edges the polynomial fitted to the
//! first (or last) full window is evaluated at the sample's offset, so every sample
//! gets a value. Uses future samples: the output is non-causal.
//!
//! If the series is shorter than the window, the window shrinks to the largest odd
//! length that fits; if that is not longer than the degree the input is returned as-is.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_savgol(values: &[f64], window: usize, degree: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::SavitzkyGolay { window, degree };
    let n = values.len();

    let mut w = window.min(n);
    if w % 2 == 0 {
        w = w.saturating_sub(1);
    }
    if w <= degree {
        return IndicatorSeries {
            indicator_type,
            values: values.iter().copied().map(Some).collect(),
        };
    }

    let half = w / 2;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = if i < half {
            0
        } else if i + half >= n {
            n - w
        } else {
            i - half
        };
        let xs: Vec<f64> = (0..w).map(|k| k as f64 - half as f64).collect();
        let coeffs = polyfit(&xs, &values[lo..lo + w], degree);
        let x = i as f64 - lo as f64 - half as f64;
        out.push(Some(polyval(&coeffs, x)));
    }

    IndicatorSeries {
        indicator_type,
        values: out,
    }
}

/// Least-squares polynomial coefficients, lowest order first.
fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Vec<f64> {
    let m = degree + 1;
    let mut a = vec![vec![0.0; m + 1]; m];
    for (&x, &y) in xs.iter().zip(ys) {
        let powers: Vec<f64> = (0..2 * m).map(|p| x.powi(p as i32)).collect();
        for row in 0..m {
            for col in 0..m {
                a[row][col] += powers[row + col];
            }
            a[row][m] += y * powers[row];
        }
    }
    solve(a)
}

/// Gaussian elimination with partial pivoting on an augmented matrix.
fn solve(mut a: Vec<Vec<f64>>) -> Vec<f64> {
    let m = a.len();
    for col in 0..m {
        let pivot = (col..m)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        a.swap(col, pivot);
        let p = a[col][col];
        if p.abs() < 1e-12 {
            continue;
        }
        for row in 0..m {
            if row != col {
                let factor = a[row][col] / p;
                for k in col..=m {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }
    }
    (0..m)
        .map(|i| {
            if a[i][i].abs() < 1e-12 {
                0.0
            } else {
                a[i][m] / a[i][i]
            }
        })
        .collect()
}

fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
