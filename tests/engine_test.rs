use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use school_results_analytics::classify::Trend;
use school_results_analytics::models::{ClassInfo, ClassSubject, Student, SubjectScore, Term};
use school_results_analytics::risk::RiskLevel;
use school_results_analytics::{AnalyticsEngine, AnalyticsError, MemoryStore, StudentResult, TermScope};

const SESSION: &str = "2025-2026";
const TERMS: [&str; 3] = ["first", "second", "third"];

fn subject(total: f64) -> SubjectScore {
    SubjectScore {
        ca1: (total * 0.2).round(),
        ca2: (total * 0.2).round(),
        project: (total * 0.1).round(),
        exam: (total * 0.5).round(),
        total,
        ..SubjectScore::default()
    }
}

fn result(student: &str, class_id: &str, term_index: usize, average: f64, days_present: u32) -> StudentResult {
    let created_at = Utc.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap()
        + Duration::days(100 * term_index as i64);
    StudentResult {
        student_id: student.to_string(),
        student_name: format!("Student {student}"),
        class_id: class_id.to_string(),
        session_id: SESSION.to_string(),
        term_id: TERMS[term_index].to_string(),
        overall_average: average,
        overall_position: 1,
        days_present,
        days_school_open: 100,
        subject_results: BTreeMap::from([
            ("English".to_string(), subject(average + 5.0)),
            ("Mathematics".to_string(), subject(average - 5.0)),
        ]),
        affective_domain: BTreeMap::from([("Punctuality".to_string(), 4)]),
        psychomotor_domain: BTreeMap::from([("Sports".to_string(), 3)]),
        created_at,
    }
}

fn school() -> MemoryStore {
    let mut store = MemoryStore::new()
        .with_class(ClassInfo {
            id: "jss1a".to_string(),
            name: "JSS 1A".to_string(),
            school_id: "demo".to_string(),
        })
        .with_class(ClassInfo {
            id: "jss1b".to_string(),
            name: "JSS 1B".to_string(),
            school_id: "demo".to_string(),
        })
        .with_student(Student {
            id: "amy".to_string(),
            full_name: "Amy".to_string(),
            class_id: "jss1a".to_string(),
        })
        .with_student(Student {
            id: "ben".to_string(),
            full_name: "Ben".to_string(),
            class_id: "jss1a".to_string(),
        })
        .with_parent("parent-1", "amy");

    for (i, term) in TERMS.iter().enumerate() {
        store = store.with_term(Term {
            id: term.to_string(),
            session_id: SESSION.to_string(),
            name: format!("{term} term"),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap() + Duration::days(100 * i as i64),
        });
    }

    for class_id in ["jss1a", "jss1b"] {
        for subject_name in ["English", "Mathematics"] {
            store = store.with_class_subject(ClassSubject {
                class_id: class_id.to_string(),
                subject_id: subject_name.to_lowercase(),
                subject_name: subject_name.to_string(),
            });
        }
    }

    store
        .with_results([
            result("amy", "jss1a", 0, 85.0, 95),
            result("amy", "jss1a", 1, 80.0, 92),
            result("amy", "jss1a", 2, 91.0, 96),
            result("ben", "jss1a", 0, 70.0, 80),
            result("ben", "jss1a", 1, 62.0, 70),
            result("ben", "jss1a", 2, 48.0, 55),
            result("cal", "jss1b", 2, 65.0, 88),
        ])
}

fn third_term(class_id: &str) -> TermScope {
    TermScope::new(class_id, SESSION, "third")
}

#[tokio::test]
async fn class_dashboard_includes_term_trend() {
    let engine = AnalyticsEngine::new(school());
    let dashboard = engine.class_dashboard(&third_term("jss1a")).await.unwrap();

    assert_eq!(dashboard.total_students, 2);
    assert_eq!(dashboard.class_average, 69.5);
    assert_eq!(dashboard.pass_rate, 50.0);
    assert_eq!(dashboard.excellence_count, 1);
    assert_eq!(dashboard.at_risk_count, 1);
    assert_eq!(dashboard.term_trend.len(), 3);
    assert_eq!(dashboard.term_trend[0].term, "first term");
    assert_eq!(dashboard.term_trend[0].average, 77.5);
    assert_eq!(dashboard.top_subjects[0].subject, "English");
}

#[tokio::test]
async fn empty_scope_yields_empty_dashboard() {
    let engine = AnalyticsEngine::new(school());
    let dashboard = engine
        .class_dashboard(&TermScope::new("jss2", SESSION, "third"))
        .await
        .unwrap();

    assert_eq!(dashboard.class_average, 0.0);
    assert_eq!(dashboard.pass_rate, 0.0);
    assert_eq!(dashboard.at_risk_count, 0);
    assert_eq!(dashboard.excellence_count, 0);
    assert!(dashboard.top_subjects.is_empty());
    assert!(dashboard.worst_subjects.is_empty());
    assert!(dashboard.term_trend.is_empty());
}

#[tokio::test]
async fn school_dashboard_averages_classes() {
    let engine = AnalyticsEngine::new(school());
    let school = engine.school_dashboard("demo", SESSION, "third").await.unwrap();

    assert_eq!(school.total_classes, 2);
    assert_eq!(school.total_students, 3);
    assert_eq!(school.school_average, 67.25);
    assert_eq!(school.at_risk_count, 1);
}

#[tokio::test]
async fn student_risk_uses_history_and_cohort() {
    let engine = AnalyticsEngine::new(school());
    let risk = engine.student_risk("ben").await.unwrap();

    assert_eq!(risk.factors.declining_trend.previous_average, Some(62.0));
    assert!(risk.factors.declining_trend.triggered);
    assert!(risk.factors.low_average_score.triggered);
    assert!(risk.risk_level >= RiskLevel::High);

    let missing = engine.student_risk("nobody").await.unwrap_err();
    assert!(matches!(missing, AnalyticsError::NotFound(_)));
}

#[tokio::test]
async fn class_risk_ranks_highest_first() {
    let engine = AnalyticsEngine::new(school());
    let scores = engine.class_risk(&third_term("jss1a")).await.unwrap();

    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].student_id, "ben");
    assert_eq!(scores[0].factors.declining_trend.previous_average, Some(62.0));
    assert_eq!(scores[1].risk_level, RiskLevel::Low);
}

#[tokio::test]
async fn subject_analytics_resolves_subject_id() {
    let engine = AnalyticsEngine::new(school());
    let analytics = engine
        .subject_analytics(&third_term("jss1a"), "english")
        .await
        .unwrap();
    assert_eq!(analytics.subject, "English");
    assert_eq!(analytics.student_count, 2);
    assert_eq!(analytics.class_average, 74.5);

    let err = engine
        .subject_analytics(&third_term("jss1a"), "chemistry")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn compare_classes_ranks_by_average() {
    let engine = AnalyticsEngine::new(school());
    let comparison = engine
        .compare_classes(&["jss1b".to_string(), "jss1a".to_string()], SESSION, "third")
        .await
        .unwrap();

    assert_eq!(comparison.overall_ranking[0].class_id, "jss1a");
    assert_eq!(comparison.subjects.len(), 2);
    assert_eq!(comparison.classes[0].class_name, "JSS 1B");
}

#[tokio::test]
async fn attendance_impact_flags_low_attendance() {
    let engine = AnalyticsEngine::new(school());
    let impact = engine.attendance_impact(&third_term("jss1a")).await.unwrap();

    assert_eq!(impact.scatter.len(), 2);
    assert!((impact.correlation - 1.0).abs() < 1e-9);
    assert_eq!(impact.at_risk_students.len(), 1);
    assert_eq!(impact.at_risk_students[0].student_id, "ben");
}

#[tokio::test]
async fn student_progress_tracks_three_terms() {
    let engine = AnalyticsEngine::new(school());
    let progress = engine.student_progress("ben").await.unwrap();

    assert_eq!(progress.terms.len(), 3);
    assert_eq!(progress.terms[0].change, 0.0);
    assert_eq!(progress.overall_trend, Trend::Declining);
    assert_eq!(progress.attendance[0].trend, Trend::Stable);
    assert!(progress.recommendations.iter().any(|r| r.contains("Attendance of 55.0%")));

    let err = engine.student_progress("nobody").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn repeated_calls_serialize_identically() {
    let engine = AnalyticsEngine::new(school());
    let first = serde_json::to_string(&engine.student_progress("amy").await.unwrap()).unwrap();
    let second = serde_json::to_string(&engine.student_progress("amy").await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn class_risk_for_an_older_term_sees_the_drop_before_it() {
    let base = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
    let results = (0..6).map(|term| {
        let average = if term == 0 { 90.0 } else { 60.0 };
        let mut r = result("dee", "jss3", 0, average, 95);
        r.term_id = format!("t{term}");
        r.created_at = base + Duration::days(100 * term);
        r
    });
    let engine = AnalyticsEngine::new(MemoryStore::new().with_results(results));

    let scores = engine
        .class_risk(&TermScope::new("jss3", SESSION, "t1"))
        .await
        .unwrap();

    assert_eq!(scores.len(), 1);
    let declining = &scores[0].factors.declining_trend;
    assert_eq!(declining.previous_average, Some(90.0));
    assert_eq!(declining.score, 100.0);
    assert!(declining.triggered);
}
