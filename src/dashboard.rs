//! Class- and school-level KPI rollups.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::classify::{performance_tier, PerformanceTier};
use crate::models::{StudentResult, Term};
use crate::stats::{self, round2};
use crate::subject::pass_rate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDistribution {
    pub excellent: usize,
    pub good: usize,
    pub average: usize,
    pub at_risk: usize,
}

impl TierDistribution {
    pub fn from_averages(averages: &[f64]) -> Self {
        let mut tiers = Self::default();
        for average in averages {
            match performance_tier(*average) {
                PerformanceTier::Excellent => tiers.excellent += 1,
                PerformanceTier::Good => tiers.good += 1,
                PerformanceTier::Average => tiers.average += 1,
                PerformanceTier::AtRisk => tiers.at_risk += 1,
            }
        }
        tiers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject: String,
    pub average: f64,
    pub pass_rate: f64,
    pub student_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermTrendPoint {
    pub term_id: String,
    pub term: String,
    pub average: f64,
    pub pass_rate: f64,
    pub timestamp: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDashboard {
    pub class_id: String,
    pub total_students: usize,
    pub class_average: f64,
    pub pass_rate: f64,
    pub at_risk_count: usize,
    pub excellence_count: usize,
    pub tier_distribution: TierDistribution,
    pub subject_performance: Vec<SubjectSummary>,
    pub top_subjects: Vec<SubjectSummary>,
    pub worst_subjects: Vec<SubjectSummary>,
    pub term_trend: Vec<TermTrendPoint>,
}

impl ClassDashboard {
    pub fn empty(class_id: &str) -> Self {
        Self {
            class_id: class_id.to_string(),
            total_students: 0,
            class_average: 0.0,
            pass_rate: 0.0,
            at_risk_count: 0,
            excellence_count: 0,
            tier_distribution: TierDistribution::default(),
            subject_performance: Vec::new(),
            top_subjects: Vec::new(),
            worst_subjects: Vec::new(),
            term_trend: Vec::new(),
        }
    }
}

/// Builds the dashboard for one class term. `term_trend` is attached as-is;
/// see [`term_trend`] for producing it from session-wide results.
pub fn class_dashboard(
    class_id: &str,
    results: &[StudentResult],
    term_trend: Vec<TermTrendPoint>,
) -> ClassDashboard {
    if results.is_empty() {
        return ClassDashboard::empty(class_id);
    }

    let averages: Vec<f64> = results.iter().map(|r| r.overall_average).collect();
    let tier_distribution = TierDistribution::from_averages(&averages);
    let subject_performance = subject_summaries(results);

    let top_subjects = subject_performance.iter().take(3).cloned().collect();
    let worst_subjects = subject_performance.iter().rev().take(3).cloned().collect();

    ClassDashboard {
        class_id: class_id.to_string(),
        total_students: results.len(),
        class_average: round2(stats::mean(&averages)),
        pass_rate: round2(pass_rate(&averages)),
        at_risk_count: tier_distribution.at_risk,
        excellence_count: tier_distribution.excellent,
        tier_distribution,
        subject_performance,
        top_subjects,
        worst_subjects,
        term_trend,
    }
}

pub fn subject_summaries(results: &[StudentResult]) -> Vec<SubjectSummary> {
    let mut totals: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for result in results {
        for (name, score) in &result.subject_results {
            totals.entry(name.as_str()).or_default().push(score.total);
        }
    }

    let mut summaries: Vec<SubjectSummary> = totals
        .into_iter()
        .map(|(subject, scores)| SubjectSummary {
            subject: subject.to_string(),
            average: round2(stats::mean(&scores)),
            pass_rate: round2(pass_rate(&scores)),
            student_count: scores.len(),
        })
        .collect();

    summaries.sort_by(|a, b| b.average.total_cmp(&a.average));
    summaries
}

/// One point per term of the session that has at least one result, in the
/// order of `terms`.
pub fn term_trend(terms: &[Term], session_results: &[StudentResult]) -> Vec<TermTrendPoint> {
    let mut by_term: HashMap<&str, Vec<f64>> = HashMap::new();
    for result in session_results {
        by_term
            .entry(result.term_id.as_str())
            .or_default()
            .push(result.overall_average);
    }

    terms
        .iter()
        .filter_map(|term| {
            let averages = by_term.get(term.id.as_str())?;
            Some(TermTrendPoint {
                term_id: term.id.clone(),
                term: term.name.clone(),
                average: round2(stats::mean(averages)),
                pass_rate: round2(pass_rate(averages)),
                timestamp: term.start_date,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassOverview {
    pub class_id: String,
    pub class_name: String,
    pub total_students: usize,
    pub class_average: f64,
    pub pass_rate: f64,
    pub at_risk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolDashboard {
    pub school_id: String,
    pub total_classes: usize,
    pub total_students: usize,
    pub school_average: f64,
    pub pass_rate: f64,
    pub at_risk_count: usize,
    pub excellence_count: usize,
    pub classes: Vec<ClassOverview>,
}

/// Averages the per-class averages and pass rates; counts are summed.
pub fn school_dashboard(school_id: &str, classes: &[(String, ClassDashboard)]) -> SchoolDashboard {
    let averages: Vec<f64> = classes.iter().map(|(_, d)| d.class_average).collect();
    let pass_rates: Vec<f64> = classes.iter().map(|(_, d)| d.pass_rate).collect();

    SchoolDashboard {
        school_id: school_id.to_string(),
        total_classes: classes.len(),
        total_students: classes.iter().map(|(_, d)| d.total_students).sum(),
        school_average: round2(stats::mean(&averages)),
        pass_rate: round2(stats::mean(&pass_rates)),
        at_risk_count: classes.iter().map(|(_, d)| d.at_risk_count).sum(),
        excellence_count: classes.iter().map(|(_, d)| d.excellence_count).sum(),
        classes: classes
            .iter()
            .map(|(name, d)| ClassOverview {
                class_id: d.class_id.clone(),
                class_name: name.clone(),
                total_students: d.total_students,
                class_average: d.class_average,
                pass_rate: d.pass_rate,
                at_risk_count: d.at_risk_count,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::tests::{sample_result, subject};

    fn term(id: &str, name: &str, month: u32) -> Term {
        Term {
            id: id.to_string(),
            session_id: "2025-2026".to_string(),
            name: name.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, month, 1).unwrap(),
        }
    }

    #[test]
    fn empty_class_is_all_zero() {
        let dashboard = class_dashboard("jss1", &[], Vec::new());
        assert_eq!(dashboard.class_average, 0.0);
        assert_eq!(dashboard.pass_rate, 0.0);
        assert_eq!(dashboard.at_risk_count, 0);
        assert_eq!(dashboard.excellence_count, 0);
        assert!(dashboard.top_subjects.is_empty());
        assert!(dashboard.worst_subjects.is_empty());
        assert!(dashboard.term_trend.is_empty());
    }

    #[test]
    fn tiers_partition_cleanly() {
        let tiers = TierDistribution::from_averages(&[95.0, 90.0, 89.9, 80.0, 79.9, 60.0, 59.9]);
        assert_eq!(tiers.excellent, 2);
        assert_eq!(tiers.good, 2);
        assert_eq!(tiers.average, 2);
        assert_eq!(tiers.at_risk, 1);
    }

    #[test]
    fn top_and_worst_subjects() {
        let subjects = |base: f64| {
            vec![
                ("Art", subject(10.0, 10.0, 40.0, base + 30.0)),
                ("Biology", subject(10.0, 10.0, 40.0, base + 20.0)),
                ("Chemistry", subject(10.0, 10.0, 40.0, base + 10.0)),
                ("Drama", subject(10.0, 10.0, 40.0, base)),
            ]
        };
        let results = vec![
            sample_result("a", 92.0, 90, 100, subjects(50.0)),
            sample_result("b", 55.0, 90, 100, subjects(40.0)),
        ];
        let dashboard = class_dashboard("jss1", &results, Vec::new());

        assert_eq!(dashboard.class_average, 73.5);
        assert_eq!(dashboard.pass_rate, 50.0);
        assert_eq!(dashboard.excellence_count, 1);
        assert_eq!(dashboard.at_risk_count, 1);
        let top: Vec<&str> = dashboard.top_subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(top, vec!["Art", "Biology", "Chemistry"]);
        let worst: Vec<&str> = dashboard.worst_subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(worst, vec!["Drama", "Chemistry", "Biology"]);
        assert_eq!(dashboard.top_subjects[0].average, 75.0);
    }

    #[test]
    fn term_trend_skips_terms_without_results() {
        let terms = vec![term("t1", "First", 9), term("t2", "Second", 11), term("t3", "Third", 12)];
        let mut first = sample_result("a", 70.0, 90, 100, vec![]);
        first.term_id = "t1".to_string();
        let mut third = sample_result("a", 50.0, 90, 100, vec![]);
        third.term_id = "t3".to_string();

        let trend = term_trend(&terms, &[first, third]);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].term, "First");
        assert_eq!(trend[0].pass_rate, 100.0);
        assert_eq!(trend[1].term, "Third");
        assert_eq!(trend[1].timestamp, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
    }

    #[test]
    fn school_rollup_averages_class_figures() {
        let a = class_dashboard("a", &[sample_result("x", 80.0, 90, 100, vec![])], Vec::new());
        let b = class_dashboard("b", &[sample_result("y", 40.0, 90, 100, vec![])], Vec::new());
        let school = school_dashboard("school", &[("JSS 1A".to_string(), a), ("JSS 1B".to_string(), b)]);
        assert_eq!(school.school_average, 60.0);
        assert_eq!(school.pass_rate, 50.0);
        assert_eq!(school.at_risk_count, 1);
        assert_eq!(school.total_students, 2);
        assert_eq!(school.classes[1].class_name, "JSS 1B");
    }
}
