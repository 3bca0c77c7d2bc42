use serde::Serialize;

use crate::models::StudentResult;
use crate::stats::{self, round2};

pub const LOW_AVERAGE_WEIGHT: f64 = 0.35;
pub const DECLINING_TREND_WEIGHT: f64 = 0.25;
pub const LOW_ATTENDANCE_WEIGHT: f64 = 0.20;
pub const WEAK_SUBJECTS_WEIGHT: f64 = 0.15;
pub const MISSING_ASSESSMENTS_WEIGHT: f64 = 0.05;

const TRIGGER_THRESHOLD: f64 = 20.0;
const RECOMMENDATION_THRESHOLD: f64 = 40.0;
const PASS_MARK: f64 = 60.0;

/// Normalization baseline for one class cohort in one term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetrics {
    pub average: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl ClassMetrics {
    pub fn from_results(results: &[StudentResult]) -> Self {
        let averages: Vec<f64> = results.iter().map(|r| r.overall_average).collect();
        Self {
            average: stats::mean(&averages),
            median: stats::median(&averages),
            std_dev: stats::std_deviation(&averages),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

pub fn risk_level(score: f64) -> RiskLevel {
    match score {
        s if s < 25.0 => RiskLevel::Low,
        s if s < 50.0 => RiskLevel::Medium,
        s if s < 75.0 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowAverageFactor {
    pub triggered: bool,
    pub weight: f64,
    pub score: f64,
    pub student_average: f64,
    pub class_average: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecliningTrendFactor {
    pub triggered: bool,
    pub weight: f64,
    pub score: f64,
    pub previous_average: Option<f64>,
    pub current_average: f64,
    pub drop: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowAttendanceFactor {
    pub triggered: bool,
    pub weight: f64,
    pub score: f64,
    pub attendance_percentage: f64,
    pub days_present: u32,
    pub days_school_open: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakSubjectsFactor {
    pub triggered: bool,
    pub weight: f64,
    pub score: f64,
    pub failing_subjects: Vec<String>,
    pub total_subjects: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingAssessmentsFactor {
    pub triggered: bool,
    pub weight: f64,
    pub score: f64,
    pub subjects_with_missing: Vec<String>,
    pub total_subjects: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub low_average_score: LowAverageFactor,
    pub declining_trend: DecliningTrendFactor,
    pub low_attendance: LowAttendanceFactor,
    pub weak_subjects: WeakSubjectsFactor,
    pub missing_assessments: MissingAssessmentsFactor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScore {
    pub student_id: String,
    pub student_name: String,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub current_average: f64,
    pub class_average: f64,
    pub factors: RiskFactors,
    pub recommendations: Vec<String>,
}

/// Scores one student against their class cohort.
///
/// `history` holds up to three earlier results ordered oldest to newest; the
/// last entry is the term immediately before `current`.
pub fn calculate_risk(
    current: &StudentResult,
    metrics: &ClassMetrics,
    history: &[StudentResult],
) -> RiskScore {
    let factors = RiskFactors {
        low_average_score: low_average_factor(current.overall_average, metrics),
        declining_trend: declining_trend_factor(current.overall_average, history),
        low_attendance: low_attendance_factor(current),
        weak_subjects: weak_subjects_factor(current),
        missing_assessments: missing_assessments_factor(current),
    };

    let composite = LOW_AVERAGE_WEIGHT * factors.low_average_score.score
        + DECLINING_TREND_WEIGHT * factors.declining_trend.score
        + LOW_ATTENDANCE_WEIGHT * factors.low_attendance.score
        + WEAK_SUBJECTS_WEIGHT * factors.weak_subjects.score
        + MISSING_ASSESSMENTS_WEIGHT * factors.missing_assessments.score;
    let risk_score = composite.round().clamp(0.0, 100.0) as u32;

    RiskScore {
        student_id: current.student_id.clone(),
        student_name: current.student_name.clone(),
        risk_score,
        risk_level: risk_level(f64::from(risk_score)),
        current_average: current.overall_average,
        class_average: round2(metrics.average),
        recommendations: recommendations(risk_score, &factors),
        factors,
    }
}

fn low_average_factor(student_average: f64, metrics: &ClassMetrics) -> LowAverageFactor {
    let gap = metrics.average - student_average;
    let threshold = 1.5 * metrics.std_dev;
    let score = if gap <= 0.0 {
        0.0
    } else if threshold <= 0.0 {
        100.0
    } else {
        (gap / threshold * 100.0).min(100.0)
    };

    LowAverageFactor {
        triggered: score > TRIGGER_THRESHOLD,
        weight: LOW_AVERAGE_WEIGHT,
        score,
        student_average,
        class_average: round2(metrics.average),
        gap: round2(gap.max(0.0)),
    }
}

fn declining_trend_factor(current_average: f64, history: &[StudentResult]) -> DecliningTrendFactor {
    let previous = history.last().map(|r| r.overall_average);
    let drop = previous.map(|p| p - current_average).unwrap_or(0.0);
    let score = if drop > 0.0 {
        (drop / 20.0 * 100.0).min(100.0)
    } else {
        0.0
    };

    DecliningTrendFactor {
        triggered: score > TRIGGER_THRESHOLD,
        weight: DECLINING_TREND_WEIGHT,
        score,
        previous_average: previous,
        current_average,
        drop: round2(drop.max(0.0)),
    }
}

/// Step function over attendance percentage.
pub fn attendance_risk(attendance_percentage: f64) -> f64 {
    match attendance_percentage {
        a if a >= 85.0 => 0.0,
        a if a >= 75.0 => 20.0,
        a if a >= 60.0 => 60.0,
        a if a >= 40.0 => 85.0,
        _ => 100.0,
    }
}

fn low_attendance_factor(current: &StudentResult) -> LowAttendanceFactor {
    let attendance_percentage = current.attendance_percentage();
    let score = attendance_risk(attendance_percentage);

    LowAttendanceFactor {
        triggered: score > TRIGGER_THRESHOLD,
        weight: LOW_ATTENDANCE_WEIGHT,
        score,
        attendance_percentage: round2(attendance_percentage),
        days_present: current.days_present,
        days_school_open: current.days_school_open,
    }
}

fn weak_subjects_factor(current: &StudentResult) -> WeakSubjectsFactor {
    let total_subjects = current.subject_results.len();
    let failing_subjects: Vec<String> = current
        .subject_results
        .iter()
        .filter(|(_, score)| score.total < PASS_MARK)
        .map(|(name, _)| name.clone())
        .collect();

    let score = if total_subjects == 0 {
        0.0
    } else {
        failing_subjects.len() as f64 / total_subjects as f64 * 100.0
    };

    WeakSubjectsFactor {
        triggered: score > TRIGGER_THRESHOLD,
        weight: WEAK_SUBJECTS_WEIGHT,
        score,
        failing_subjects,
        total_subjects,
    }
}

fn missing_assessments_factor(current: &StudentResult) -> MissingAssessmentsFactor {
    let total_subjects = current.subject_results.len();
    let subjects_with_missing: Vec<String> = current
        .subject_results
        .iter()
        .filter(|(_, score)| score.is_missing_assessment())
        .map(|(name, _)| name.clone())
        .collect();

    let score = if total_subjects == 0 {
        0.0
    } else {
        subjects_with_missing.len() as f64 / total_subjects as f64 * 100.0
    };

    MissingAssessmentsFactor {
        triggered: score > TRIGGER_THRESHOLD,
        weight: MISSING_ASSESSMENTS_WEIGHT,
        score,
        subjects_with_missing,
        total_subjects,
    }
}

fn recommendations(risk_score: u32, factors: &RiskFactors) -> Vec<String> {
    let mut out = Vec::new();

    if risk_score >= 75 {
        out.push("Urgent: schedule an intervention meeting with the parents and class teacher".to_string());
        out.push("Assign a peer tutor and a structured daily study plan".to_string());
    } else if risk_score >= 50 {
        out.push("Schedule a consultation with the parents to agree a support plan".to_string());
        out.push("Monitor progress weekly with short assessments".to_string());
    } else if risk_score >= 25 {
        out.push("Provide extra learning materials and practice exercises".to_string());
    }

    let low = &factors.low_average_score;
    if low.score > RECOMMENDATION_THRESHOLD {
        out.push(format!(
            "Overall average of {:.1}% is {:.1} points below the class average of {:.1}%",
            low.student_average, low.gap, low.class_average
        ));
    }

    let declining = &factors.declining_trend;
    if declining.score > RECOMMENDATION_THRESHOLD {
        out.push(format!(
            "Performance dropped by {:.1} points since last term; review what changed",
            declining.drop
        ));
    }

    let attendance = &factors.low_attendance;
    if attendance.score > RECOMMENDATION_THRESHOLD {
        out.push(format!(
            "Attendance is {:.1}%; follow up with the family on absences",
            attendance.attendance_percentage
        ));
    }

    let weak = &factors.weak_subjects;
    if weak.score > RECOMMENDATION_THRESHOLD {
        out.push(format!(
            "Needs targeted support in: {}",
            weak.failing_subjects.join(", ")
        ));
    }

    out
}

/// Scores a whole cohort and orders it from highest to lowest risk.
pub fn rank_by_risk(mut scores: Vec<RiskScore>) -> Vec<RiskScore> {
    scores.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    scores
}
