//! Cross-class comparison for one session term.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::dashboard::TierDistribution;
use crate::models::StudentResult;
use crate::stats::{self, round2};
use crate::subject::pass_rate;

const SUBJECT_GAP_THRESHOLD: f64 = 15.0;
const PASS_RATE_SPREAD_THRESHOLD: f64 = 20.0;

/// Everything known about one class going into a comparison.
#[derive(Debug, Clone)]
pub struct ClassCohort {
    pub class_id: String,
    pub class_name: String,
    pub subjects: Vec<String>,
    pub results: Vec<StudentResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassMetricsSummary {
    pub class_id: String,
    pub class_name: String,
    pub student_count: usize,
    pub average: f64,
    pub median: f64,
    pub std_dev: f64,
    pub pass_rate: f64,
    pub at_risk_count: usize,
    pub excellent_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSubjectRank {
    pub class_id: String,
    pub class_name: String,
    pub average: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectComparison {
    pub subject: String,
    pub rankings: Vec<ClassSubjectRank>,
    pub gap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassComparison {
    pub classes: Vec<ClassMetricsSummary>,
    pub overall_ranking: Vec<ClassSubjectRank>,
    pub subjects: Vec<SubjectComparison>,
    pub insights: Vec<String>,
}

pub fn class_metrics(cohort: &ClassCohort) -> ClassMetricsSummary {
    let averages: Vec<f64> = cohort.results.iter().map(|r| r.overall_average).collect();
    let tiers = TierDistribution::from_averages(&averages);

    ClassMetricsSummary {
        class_id: cohort.class_id.clone(),
        class_name: cohort.class_name.clone(),
        student_count: averages.len(),
        average: round2(stats::mean(&averages)),
        median: round2(stats::median(&averages)),
        std_dev: round2(stats::std_deviation(&averages)),
        pass_rate: round2(pass_rate(&averages)),
        at_risk_count: tiers.at_risk,
        excellent_count: tiers.excellent,
    }
}

fn subject_average(cohort: &ClassCohort, subject: &str) -> f64 {
    let totals: Vec<f64> = cohort
        .results
        .iter()
        .filter_map(|r| r.subject_total(subject))
        .collect();
    round2(stats::mean(&totals))
}

/// Ranks `(class, average)` pairs, highest first. Ties keep input order.
fn rank(mut entries: Vec<(&ClassCohort, f64)>) -> Vec<ClassSubjectRank> {
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (cohort, average))| ClassSubjectRank {
            class_id: cohort.class_id.clone(),
            class_name: cohort.class_name.clone(),
            average,
            rank: i + 1,
        })
        .collect()
}

pub fn compare_classes(cohorts: &[ClassCohort]) -> ClassComparison {
    let classes: Vec<ClassMetricsSummary> = cohorts.iter().map(class_metrics).collect();

    let overall_ranking = rank(
        cohorts
            .iter()
            .zip(&classes)
            .map(|(cohort, metrics)| (cohort, metrics.average))
            .collect(),
    );

    let subject_names: BTreeSet<&str> = cohorts
        .iter()
        .flat_map(|c| c.subjects.iter().map(String::as_str))
        .collect();

    let subjects: Vec<SubjectComparison> = subject_names
        .into_iter()
        .map(|subject| {
            let rankings = rank(
                cohorts
                    .iter()
                    .map(|cohort| (cohort, subject_average(cohort, subject)))
                    .collect(),
            );
            let gap = match (rankings.first(), rankings.last()) {
                (Some(top), Some(bottom)) => round2(top.average - bottom.average),
                _ => 0.0,
            };
            SubjectComparison {
                subject: subject.to_string(),
                rankings,
                gap,
            }
        })
        .collect();

    let insights = insights(&classes, &overall_ranking, &subjects);

    ClassComparison {
        classes,
        overall_ranking,
        subjects,
        insights,
    }
}

fn insights(
    classes: &[ClassMetricsSummary],
    overall_ranking: &[ClassSubjectRank],
    subjects: &[SubjectComparison],
) -> Vec<String> {
    let mut out = Vec::new();

    if let (Some(top), Some(bottom)) = (overall_ranking.first(), overall_ranking.last()) {
        out.push(format!(
            "{} has the highest average at {:.1}%",
            top.class_name, top.average
        ));
        if overall_ranking.len() > 1 {
            out.push(format!(
                "{} has the lowest average at {:.1}%",
                bottom.class_name, bottom.average
            ));
        }
    }

    for subject in subjects {
        if subject.gap > SUBJECT_GAP_THRESHOLD {
            out.push(format!(
                "Large variance in {} across classes ({:.1} point gap)",
                subject.subject, subject.gap
            ));
        }
    }

    let pass_rates: Vec<f64> = classes.iter().map(|c| c.pass_rate).collect();
    if let (Some(max), Some(min)) = (
        pass_rates.iter().copied().reduce(f64::max),
        pass_rates.iter().copied().reduce(f64::min),
    ) {
        let spread = max - min;
        if spread > PASS_RATE_SPREAD_THRESHOLD {
            out.push(format!(
                "Pass rates differ by {:.1} points; classes at the bottom need intervention",
                spread
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::tests::{sample_result, subject};

    fn cohort(id: &str, averages: &[f64], maths: f64) -> ClassCohort {
        ClassCohort {
            class_id: id.to_string(),
            class_name: format!("Class {id}"),
            subjects: vec!["Maths".to_string()],
            results: averages
                .iter()
                .enumerate()
                .map(|(i, avg)| {
                    sample_result(
                        &format!("{id}-{i}"),
                        *avg,
                        90,
                        100,
                        vec![("Maths", subject(10.0, 10.0, 40.0, maths))],
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn ranks_classes_and_subjects() {
        let comparison = compare_classes(&[
            cohort("a", &[50.0, 55.0], 45.0),
            cohort("b", &[85.0, 95.0], 80.0),
        ]);

        assert_eq!(comparison.overall_ranking[0].class_id, "b");
        assert_eq!(comparison.overall_ranking[0].rank, 1);
        assert_eq!(comparison.overall_ranking[1].rank, 2);

        let maths = &comparison.subjects[0];
        assert_eq!(maths.rankings[0].class_id, "b");
        assert_eq!(maths.gap, 35.0);

        assert_eq!(comparison.classes[1].excellent_count, 1);
        assert_eq!(comparison.classes[0].at_risk_count, 2);

        assert!(comparison.insights[0].starts_with("Class b has the highest"));
        assert!(comparison.insights.iter().any(|i| i.contains("Large variance in Maths")));
        assert!(comparison.insights.iter().any(|i| i.contains("need intervention")));
    }

    #[test]
    fn ties_keep_request_order() {
        let comparison = compare_classes(&[
            cohort("a", &[70.0], 60.0),
            cohort("b", &[70.0], 60.0),
        ]);
        assert_eq!(comparison.overall_ranking[0].class_id, "a");
        assert_eq!(comparison.subjects[0].rankings[0].class_id, "a");
        assert!(!comparison.insights.iter().any(|i| i.contains("variance")));
    }

    #[test]
    fn empty_request_has_no_insights() {
        let comparison = compare_classes(&[]);
        assert!(comparison.classes.is_empty());
        assert!(comparison.insights.is_empty());
    }
}
