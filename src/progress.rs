//! Multi-term progress for a single student.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::classify::{percentage_change, performance_tier, trend_direction, PerformanceTier, Trend};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::StudentResult;
use crate::risk::{calculate_risk, ClassMetrics, RiskScore};
use crate::stats::{self, round2};

pub const TRACKED_TERMS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermProgress {
    pub term_id: String,
    pub session_id: String,
    pub class_id: String,
    pub average: f64,
    pub position: u32,
    pub tier: PerformanceTier,
    /// Percentage change of the average against the previous term.
    pub change: f64,
    /// Places gained since the previous term; negative means dropped.
    pub position_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject: String,
    pub scores: Vec<f64>,
    pub latest: f64,
    pub trend: Trend,
    pub class_percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTerm {
    pub term_id: String,
    pub days_present: u32,
    pub days_school_open: u32,
    pub percentage: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub student_id: String,
    pub student_name: String,
    pub overall_trend: Trend,
    pub terms: Vec<TermProgress>,
    pub subjects: Vec<SubjectProgress>,
    pub affective_domain: BTreeMap<String, i64>,
    pub psychomotor_domain: BTreeMap<String, i64>,
    pub attendance: Vec<AttendanceTerm>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub risk: RiskScore,
    pub recommendations: Vec<String>,
}

/// `history` is the student's results ordered oldest to newest (only the last
/// [`TRACKED_TERMS`] are used); `cohort` is the full class for the latest term.
pub fn track_progress(
    history: &[StudentResult],
    cohort: &[StudentResult],
) -> AnalyticsResult<StudentProgress> {
    let history = &history[history.len().saturating_sub(TRACKED_TERMS)..];
    let Some((latest, earlier)) = history.split_last() else {
        return Err(AnalyticsError::not_found("no results recorded for student"));
    };

    let terms = term_progress(history);
    let subjects = subject_progress(history, latest, cohort);
    let attendance = attendance_history(history);
    let (strengths, weaknesses) = strengths_and_weaknesses(latest);

    let metrics = ClassMetrics::from_results(cohort);
    let risk = calculate_risk(latest, &metrics, earlier);

    let averages: Vec<f64> = history.iter().map(|r| r.overall_average).collect();
    let recommendations = recommendations(&terms, latest, &risk);

    Ok(StudentProgress {
        student_id: latest.student_id.clone(),
        student_name: latest.student_name.clone(),
        overall_trend: trend_direction(&averages),
        terms,
        subjects,
        affective_domain: latest.affective_domain.clone(),
        psychomotor_domain: latest.psychomotor_domain.clone(),
        attendance,
        strengths,
        weaknesses,
        risk,
        recommendations,
    })
}

fn term_progress(history: &[StudentResult]) -> Vec<TermProgress> {
    history
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let previous = i.checked_sub(1).map(|p| &history[p]);
            TermProgress {
                term_id: result.term_id.clone(),
                session_id: result.session_id.clone(),
                class_id: result.class_id.clone(),
                average: result.overall_average,
                position: result.overall_position,
                tier: performance_tier(result.overall_average),
                change: previous
                    .map(|p| round2(percentage_change(p.overall_average, result.overall_average)))
                    .unwrap_or(0.0),
                position_change: previous
                    .map(|p| i64::from(p.overall_position) - i64::from(result.overall_position))
                    .unwrap_or(0),
            }
        })
        .collect()
}

fn subject_progress(
    history: &[StudentResult],
    latest: &StudentResult,
    cohort: &[StudentResult],
) -> Vec<SubjectProgress> {
    let names: BTreeSet<&str> = history
        .iter()
        .flat_map(|r| r.subject_results.keys().map(String::as_str))
        .collect();

    names
        .into_iter()
        .map(|subject| {
            let scores: Vec<f64> = history
                .iter()
                .map(|r| r.subject_total(subject).unwrap_or(0.0))
                .collect();
            let latest_score = latest.subject_total(subject).unwrap_or(0.0);
            let class_scores: Vec<f64> = cohort
                .iter()
                .filter_map(|r| r.subject_total(subject))
                .collect();

            SubjectProgress {
                subject: subject.to_string(),
                trend: trend_direction(&scores),
                latest: latest_score,
                class_percentile: round2(stats::percentile_rank(latest_score, &class_scores)),
                scores,
            }
        })
        .collect()
}

fn attendance_history(history: &[StudentResult]) -> Vec<AttendanceTerm> {
    let mut previous: Option<f64> = None;
    history
        .iter()
        .map(|result| {
            let percentage = result.attendance_percentage();
            let trend = previous
                .map(|p| trend_direction(&[p, percentage]))
                .unwrap_or(Trend::Stable);
            previous = Some(percentage);
            AttendanceTerm {
                term_id: result.term_id.clone(),
                days_present: result.days_present,
                days_school_open: result.days_school_open,
                percentage: round2(percentage),
                trend,
            }
        })
        .collect()
}

fn strengths_and_weaknesses(latest: &StudentResult) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    for (subject, score) in &latest.subject_results {
        if score.total >= 80.0 {
            strengths.push(format!("Strong performance in {subject} ({:.0}%)", score.total));
        } else if score.total < 60.0 {
            weaknesses.push(format!("Needs improvement in {subject} ({:.0}%)", score.total));
        }
    }

    for (trait_name, score) in &latest.affective_domain {
        if *score >= 4 {
            strengths.push(format!("Excellent {trait_name}"));
        } else if *score <= 2 {
            weaknesses.push(format!("Work on {trait_name}"));
        }
    }

    (strengths, weaknesses)
}

fn recommendations(terms: &[TermProgress], latest: &StudentResult, risk: &RiskScore) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(change) = terms.last().map(|t| t.change) {
        if change > 5.0 {
            out.push(format!(
                "Great progress: average improved by {change:.1}% since last term; keep it up"
            ));
        } else if change < -5.0 {
            out.push(format!(
                "Average fell by {:.1}% since last term; review study habits together",
                change.abs()
            ));
        }
    }

    let weak: Vec<&str> = latest
        .subject_results
        .iter()
        .filter(|(_, s)| s.total < 60.0)
        .map(|(name, _)| name.as_str())
        .collect();
    if !weak.is_empty() {
        out.push(format!("Focus extra practice on {}", weak.join(", ")));
    }

    let strong: Vec<&str> = latest
        .subject_results
        .iter()
        .filter(|(_, s)| s.total >= 85.0)
        .map(|(name, _)| name.as_str())
        .collect();
    if !strong.is_empty() {
        out.push(format!(
            "Encourage continued excellence in {}",
            strong.join(", ")
        ));
    }

    let attendance = latest.attendance_percentage();
    if attendance < 75.0 {
        out.push(format!(
            "Attendance of {attendance:.1}% is below the 75% target; regular attendance is essential"
        ));
    }

    if risk.factors.low_average_score.triggered {
        out.push("Overall average is below the class average; consider extra lessons".to_string());
    }

    out
}
