//! How attendance relates to scores within one class term.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::StudentResult;
use crate::stats::{self, round2, CorrelationStrength};

const AT_RISK_ATTENDANCE: f64 = 75.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePoint {
    pub student_id: String,
    pub student_name: String,
    pub attendance: f64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAttendanceImpact {
    pub subject: String,
    pub correlation: f64,
    pub strength: CorrelationStrength,
    /// Regression slope scaled to percentage points per day attended.
    pub impact_per_day: f64,
    pub student_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRiskStudent {
    pub student_id: String,
    pub student_name: String,
    pub attendance: f64,
    pub actual_average: f64,
    pub expected_average: f64,
    pub gap: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceImpact {
    pub student_count: usize,
    pub average_attendance: f64,
    pub class_average: f64,
    pub correlation: f64,
    pub strength: CorrelationStrength,
    pub scatter: Vec<AttendancePoint>,
    pub subjects: Vec<SubjectAttendanceImpact>,
    pub at_risk_students: Vec<AttendanceRiskStudent>,
}

pub fn analyze_attendance(results: &[StudentResult]) -> AttendanceImpact {
    let attendance: Vec<f64> = results.iter().map(|r| r.attendance_percentage()).collect();
    let averages: Vec<f64> = results.iter().map(|r| r.overall_average).collect();

    let correlation = stats::pearson_correlation(&attendance, &averages);
    let class_average = stats::mean(&averages);

    let scatter = results
        .iter()
        .zip(&attendance)
        .map(|(r, a)| AttendancePoint {
            student_id: r.student_id.clone(),
            student_name: r.student_name.clone(),
            attendance: round2(*a),
            average: r.overall_average,
        })
        .collect();

    let subjects = subject_impacts(results);

    let at_risk_students = results
        .iter()
        .zip(&attendance)
        .filter(|(_, a)| **a < AT_RISK_ATTENDANCE)
        .map(|(r, a)| at_risk_student(r, *a, class_average, correlation))
        .collect();

    AttendanceImpact {
        student_count: results.len(),
        average_attendance: round2(stats::mean(&attendance)),
        class_average: round2(class_average),
        correlation: round2(correlation),
        strength: stats::correlation_strength(correlation),
        scatter,
        subjects,
        at_risk_students,
    }
}

fn subject_impacts(results: &[StudentResult]) -> Vec<SubjectAttendanceImpact> {
    let names: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.subject_results.keys().map(String::as_str))
        .collect();

    names
        .into_iter()
        .map(|subject| {
            let (attendance, scores): (Vec<f64>, Vec<f64>) = results
                .iter()
                .filter_map(|r| r.subject_total(subject).map(|t| (r.attendance_percentage(), t)))
                .unzip();
            let correlation = stats::pearson_correlation(&attendance, &scores);
            let slope = stats::regression_slope(&attendance, &scores);

            SubjectAttendanceImpact {
                subject: subject.to_string(),
                correlation: round2(correlation),
                strength: stats::correlation_strength(correlation),
                impact_per_day: slope / 100.0,
                student_count: scores.len(),
            }
        })
        .collect()
}

/// Average a student with this attendance would be expected to reach.
pub fn expected_average(class_average: f64, attendance: f64, correlation: f64) -> f64 {
    if correlation.abs() < 0.1 {
        return class_average;
    }
    (class_average * (attendance / 100.0) * (1.0 + correlation.abs())).clamp(0.0, 100.0)
}

fn at_risk_student(
    result: &StudentResult,
    attendance: f64,
    class_average: f64,
    correlation: f64,
) -> AttendanceRiskStudent {
    let expected = expected_average(class_average, attendance, correlation);
    let gap = result.overall_average - expected;

    AttendanceRiskStudent {
        student_id: result.student_id.clone(),
        student_name: result.student_name.clone(),
        attendance: round2(attendance),
        actual_average: result.overall_average,
        expected_average: round2(expected),
        gap: round2(gap),
        recommendation: recommendation(attendance, gap),
    }
}

fn recommendation(attendance: f64, gap: f64) -> String {
    if attendance < 50.0 {
        format!(
            "Critical: attendance is only {:.1}%; arrange an urgent meeting with the parents",
            attendance
        )
    } else if attendance < 65.0 {
        format!(
            "Low attendance of {:.1}% means about {:.0}% of lessons were missed; agree an attendance plan",
            attendance,
            100.0 - attendance
        )
    } else if gap < -10.0 {
        format!(
            "Performing {:.1} points below what this attendance level predicts; check for learning difficulties",
            gap.abs()
        )
    } else {
        "Monitor attendance and encourage regular presence".to_string()
    }
}
