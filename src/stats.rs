//! Descriptive statistics over score sequences.
//!
//! Every function is total: empty or degenerate input yields `0` rather than
//! `NaN` or an error.

use serde::Serialize;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Population variance (divides by N).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    values.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn std_deviation(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Centered sums `(Sxy, Sxx, Syy)`, or `None` for unusable input.
fn co_moments(xs: &[f64], ys: &[f64]) -> Option<(f64, f64, f64)> {
    if xs.is_empty() || xs.len() != ys.len() {
        return None;
    }

    let mean_x = mean(xs);
    let mean_y = mean(ys);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;

    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    Some((sxy, sxx, syy))
}

/// Pearson's r. Returns 0 for mismatched lengths, empty input, or a sequence
/// with no variance.
pub fn pearson_correlation(xs: &[f64], ys: &[f64]) -> f64 {
    match co_moments(xs, ys) {
        Some((sxy, sxx, syy)) if sxx > 0.0 && syy > 0.0 => {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        }
        _ => 0.0,
    }
}

/// Least-squares slope of `ys` on `xs`, 0 under the same conditions as
/// [`pearson_correlation`].
pub fn regression_slope(xs: &[f64], ys: &[f64]) -> f64 {
    match co_moments(xs, ys) {
        Some((sxy, sxx, syy)) if sxx > 0.0 && syy > 0.0 => sxy / sxx,
        _ => 0.0,
    }
}

/// Percentage of `values` that are less than or equal to `score`.
pub fn percentile_rank(score: f64, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let at_or_below = values.iter().filter(|v| **v <= score).count();
    at_or_below as f64 / values.len() as f64 * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

pub fn correlation_strength(r: f64) -> CorrelationStrength {
    let magnitude = r.abs();
    if magnitude >= 0.7 {
        CorrelationStrength::Strong
    } else if magnitude >= 0.4 {
        CorrelationStrength::Moderate
    } else {
        CorrelationStrength::Weak
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
