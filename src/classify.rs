use serde::Serialize;

pub fn letter_grade(percentage: f64) -> &'static str {
    match percentage {
        p if p >= 90.0 => "A+",
        p if p >= 80.0 => "A",
        p if p >= 70.0 => "B",
        p if p >= 60.0 => "C",
        p if p >= 50.0 => "D",
        p if p >= 40.0 => "E",
        _ => "F",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PerformanceTier {
    Excellent,
    Good,
    Average,
    AtRisk,
}

pub fn performance_tier(average: f64) -> PerformanceTier {
    match average {
        a if a >= 90.0 => PerformanceTier::Excellent,
        a if a >= 80.0 => PerformanceTier::Good,
        a if a >= 60.0 => PerformanceTier::Average,
        _ => PerformanceTier::AtRisk,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

/// Compares only the first and last values; a move of more than 5 points
/// either way is a trend.
pub fn trend_direction(values: &[f64]) -> Trend {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return Trend::Stable;
    };
    if values.len() < 2 {
        return Trend::Stable;
    }

    let delta = last - first;
    if delta > 5.0 {
        Trend::Improving
    } else if delta < -5.0 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// `(new - old) / old * 100`, or 0 when `old` is 0.
pub fn percentage_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return 0.0;
    }
    (new - old) / old * 100.0
}
