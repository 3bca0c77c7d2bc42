//! Per-subject statistics for one class in one term.

use serde::Serialize;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{StudentResult, SubjectScore};
use crate::stats::{self, round2};

const PASS_MARK: f64 = 60.0;

// Inclusive at both ends.
const DISTRIBUTION_BANDS: [(&str, f64, f64); 7] = [
    ("F", 0.0, 40.0),
    ("E", 40.0, 50.0),
    ("D", 50.0, 60.0),
    ("C", 60.0, 70.0),
    ("B", 70.0, 80.0),
    ("A", 80.0, 90.0),
    ("A+", 90.0, 100.0),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionBucket {
    pub grade: &'static str,
    pub range: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentBreakdown {
    pub component: &'static str,
    pub weight: f64,
    pub average: f64,
    pub variance: f64,
    pub recorded: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentTrends {
    /// CA2 average minus CA1 average.
    pub ca1_to_ca2: f64,
    /// Exam average minus the mean of the two CA averages.
    pub ca_vs_exam: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStudent {
    pub student_id: String,
    pub student_name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAnalytics {
    pub subject: String,
    pub student_count: usize,
    pub class_average: f64,
    pub median_score: f64,
    pub std_deviation: f64,
    pub pass_rate: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub distribution: Vec<DistributionBucket>,
    pub components: Vec<ComponentBreakdown>,
    pub difficulty_index: u8,
    pub trends: AssessmentTrends,
    pub top_students: Vec<TopStudent>,
}

pub fn analyze_subject(subject: &str, results: &[StudentResult]) -> AnalyticsResult<SubjectAnalytics> {
    let entries: Vec<(&StudentResult, &SubjectScore)> = results
        .iter()
        .filter_map(|r| r.subject_results.get(subject).map(|s| (r, s)))
        .collect();

    if entries.is_empty() {
        return Err(AnalyticsError::not_found(format!(
            "no results recorded for subject {subject}"
        )));
    }

    let totals: Vec<f64> = entries.iter().map(|(_, s)| s.total).collect();
    let scores: Vec<&SubjectScore> = entries.iter().map(|(_, s)| *s).collect();

    let ca1 = component("CA1", 0.2, &scores, |s| s.ca1);
    let ca2 = component("CA2", 0.2, &scores, |s| s.ca2);
    let project = component("Project", 0.1, &scores, |s| s.project);
    let exam = component("Exam", 0.5, &scores, |s| s.exam);

    let difficulty_index = difficulty_index(
        stats::variance(&recorded(&scores, |s| s.exam)),
        stats::variance(&recorded(&scores, |s| s.ca1)),
        stats::variance(&recorded(&scores, |s| s.ca2)),
    );
    let trends = AssessmentTrends {
        ca1_to_ca2: round2(ca2.average - ca1.average),
        ca_vs_exam: round2(exam.average - (ca1.average + ca2.average) / 2.0),
    };

    let mut ranked = entries.clone();
    ranked.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));
    let top_students = ranked
        .iter()
        .take(5)
        .map(|(result, score)| TopStudent {
            student_id: result.student_id.clone(),
            student_name: result.student_name.clone(),
            total: score.total,
        })
        .collect();

    Ok(SubjectAnalytics {
        subject: subject.to_string(),
        student_count: totals.len(),
        class_average: round2(stats::mean(&totals)),
        median_score: round2(stats::median(&totals)),
        std_deviation: round2(stats::std_deviation(&totals)),
        pass_rate: round2(pass_rate(&totals)),
        highest_score: totals.iter().copied().fold(f64::MIN, f64::max),
        lowest_score: totals.iter().copied().fold(f64::MAX, f64::min),
        distribution: distribution(&totals),
        components: vec![ca1, ca2, project, exam],
        difficulty_index,
        trends,
        top_students,
    })
}

pub fn pass_rate(totals: &[f64]) -> f64 {
    if totals.is_empty() {
        return 0.0;
    }
    let passed = totals.iter().filter(|t| **t >= PASS_MARK).count();
    passed as f64 / totals.len() as f64 * 100.0
}

pub fn distribution(totals: &[f64]) -> Vec<DistributionBucket> {
    DISTRIBUTION_BANDS
        .iter()
        .map(|&(grade, min, max)| {
            let count = totals.iter().filter(|t| **t >= min && **t <= max).count();
            let percentage = if totals.is_empty() {
                0.0
            } else {
                round2(count as f64 / totals.len() as f64 * 100.0)
            };
            DistributionBucket {
                grade,
                range: format!("{min}-{max}"),
                count,
                percentage,
            }
        })
        .collect()
}

/// Non-zero values of one component; zero means not recorded.
fn recorded(scores: &[&SubjectScore], pick: impl Fn(&SubjectScore) -> f64) -> Vec<f64> {
    scores.iter().map(|s| pick(s)).filter(|v| *v != 0.0).collect()
}

fn component(
    name: &'static str,
    weight: f64,
    scores: &[&SubjectScore],
    pick: impl Fn(&SubjectScore) -> f64,
) -> ComponentBreakdown {
    let recorded = recorded(scores, pick);
    ComponentBreakdown {
        component: name,
        weight,
        average: round2(stats::mean(&recorded)),
        variance: round2(stats::variance(&recorded)),
        recorded: recorded.len(),
    }
}

/// Coarse 2..=10 index of how much more the exam spread students than the
/// continuous assessments did.
pub fn difficulty_index(exam_variance: f64, ca1_variance: f64, ca2_variance: f64) -> u8 {
    let ratio = exam_variance / ((ca1_variance + ca2_variance) / 2.0 + 0.1);
    match ratio {
        r if r > 2.0 => 10,
        r if r > 1.5 => 8,
        r if r > 1.0 => 6,
        r if r > 0.5 => 4,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::tests::{sample_result, subject};

    fn cohort() -> Vec<StudentResult> {
        vec![
            sample_result("a", 60.0, 90, 100, vec![("Maths", subject(10.0, 12.0, 18.0, 40.0))]),
            sample_result("b", 70.0, 90, 100, vec![("Maths", subject(14.0, 16.0, 30.0, 60.0))]),
            sample_result("c", 80.0, 90, 100, vec![("Maths", subject(18.0, 0.0, 62.0, 80.0))]),
            sample_result("d", 75.0, 90, 100, vec![("English", subject(15.0, 15.0, 40.0, 70.0))]),
        ]
    }

    #[test]
    fn skips_students_without_the_subject() {
        let analytics = analyze_subject("Maths", &cohort()).unwrap();
        assert_eq!(analytics.student_count, 3);
        assert_eq!(analytics.class_average, 60.0);
        assert_eq!(analytics.median_score, 60.0);
        assert!((analytics.pass_rate - 66.67).abs() < 1e-9);
        assert_eq!(analytics.highest_score, 80.0);
        assert_eq!(analytics.lowest_score, 40.0);
        assert_eq!(analytics.top_students[0].student_id, "c");
    }

    #[test]
    fn unknown_subject_is_not_found() {
        let err = analyze_subject("Chemistry", &cohort()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn boundary_scores_land_in_both_bands() {
        let buckets = distribution(&[40.0, 60.0, 95.0]);
        let count = |grade: &str| buckets.iter().find(|b| b.grade == grade).unwrap().count;
        assert_eq!(count("F"), 1);
        assert_eq!(count("E"), 1);
        assert_eq!(count("D"), 1);
        assert_eq!(count("C"), 1);
        assert_eq!(count("A+"), 1);
        assert_eq!(buckets.len(), 7);
    }

    #[test]
    fn components_exclude_zero_scores() {
        let analytics = analyze_subject("Maths", &cohort()).unwrap();
        let ca2 = &analytics.components[1];
        assert_eq!(ca2.component, "CA2");
        assert_eq!(ca2.recorded, 2);
        assert_eq!(ca2.average, 14.0);
        let project = &analytics.components[2];
        assert_eq!(project.recorded, 0);
        assert_eq!(project.average, 0.0);
    }

    #[test]
    fn difficulty_steps() {
        assert_eq!(difficulty_index(30.0, 5.0, 5.0), 10);
        assert_eq!(difficulty_index(8.5, 5.0, 5.0), 8);
        assert_eq!(difficulty_index(6.0, 5.0, 5.0), 6);
        assert_eq!(difficulty_index(3.0, 5.0, 5.0), 4);
        assert_eq!(difficulty_index(1.0, 5.0, 5.0), 2);
        assert_eq!(difficulty_index(0.0, 0.0, 0.0), 2);
    }

    #[test]
    fn assessment_trends() {
        let analytics = analyze_subject("Maths", &cohort()).unwrap();
        // CA1 avg 14, CA2 avg 14, exam avg 36.67
        assert_eq!(analytics.trends.ca1_to_ca2, 0.0);
        assert!((analytics.trends.ca_vs_exam - 22.67).abs() < 1e-9);
    }
}
