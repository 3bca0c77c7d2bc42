use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use school_results_analytics::classify::PerformanceTier;
use school_results_analytics::models::{Student, SubjectScore};
use school_results_analytics::{AnalyticsEngine, AnalyticsError, MemoryStore, StudentResult};

fn result(student: &str, term: &str, offset_days: i64, average: f64, days_present: u32) -> StudentResult {
    StudentResult {
        student_id: student.to_string(),
        student_name: student.to_uppercase(),
        class_id: "jss2".to_string(),
        session_id: "2025-2026".to_string(),
        term_id: term.to_string(),
        overall_average: average,
        overall_position: 2,
        days_present,
        days_school_open: 60,
        subject_results: BTreeMap::from([(
            "Mathematics".to_string(),
            SubjectScore {
                ca1: 15.0,
                ca2: 14.0,
                project: 8.0,
                exam: average - 37.0,
                total: average,
                ..SubjectScore::default()
            },
        )]),
        affective_domain: BTreeMap::from([("Neatness".to_string(), 2)]),
        psychomotor_domain: BTreeMap::new(),
        created_at: Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap() + Duration::days(offset_days),
    }
}

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_student(Student {
            id: "dayo".to_string(),
            full_name: "Dayo".to_string(),
            class_id: "jss2".to_string(),
        })
        .with_student(Student {
            id: "efe".to_string(),
            full_name: "Efe".to_string(),
            class_id: "jss2".to_string(),
        })
        .with_student(Student {
            id: "gbemi".to_string(),
            full_name: "Gbemi".to_string(),
            class_id: "jss2".to_string(),
        })
        .with_parent("parent-a", "dayo")
        .with_parent("parent-a", "gbemi")
        .with_parent("parent-b", "efe")
        .with_results([
            result("dayo", "first", 0, 72.0, 54),
            result("dayo", "second", 90, 84.0, 57),
            result("efe", "second", 90, 58.0, 30),
        ])
}

#[tokio::test]
async fn lists_only_own_children() {
    let engine = AnalyticsEngine::new(store());
    let children = engine.for_parent("parent-a").children().await.unwrap();

    let ids: Vec<&str> = children.iter().map(|c| c.student_id.as_str()).collect();
    assert_eq!(ids, vec!["dayo", "gbemi"]);
    assert_eq!(children[0].latest_average, Some(84.0));
    assert_eq!(children[0].tier, Some(PerformanceTier::Good));
    assert_eq!(children[1].latest_average, None);
}

#[tokio::test]
async fn unknown_parent_has_no_children() {
    let engine = AnalyticsEngine::new(store());
    assert!(engine.for_parent("stranger").children().await.unwrap().is_empty());
}

#[tokio::test]
async fn child_summary_for_owner() {
    let engine = AnalyticsEngine::new(store());
    let summary = engine.for_parent("parent-a").child_summary("dayo").await.unwrap();

    assert_eq!(summary.student_name, "DAYO");
    assert_eq!(summary.term_id, "second");
    assert_eq!(summary.average, 84.0);
    assert_eq!(summary.attendance, 95.0);
    assert!(summary.weaknesses.iter().any(|w| w.contains("Neatness")));
}

#[tokio::test]
async fn non_owner_is_unauthorized_not_not_found() {
    let engine = AnalyticsEngine::new(store());
    let portal = engine.for_parent("parent-b");

    let err = portal.child_summary("dayo").await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Unauthorized));

    let err = portal.child_risk("dayo").await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Unauthorized));

    let err = portal.child_attendance("does-not-exist").await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Unauthorized));

    let err = portal.child_progress("dayo").await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Unauthorized));

    let err = portal.child_subjects("dayo").await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Unauthorized));
}

#[tokio::test]
async fn owned_child_without_results_is_not_found() {
    let engine = AnalyticsEngine::new(store());
    let err = engine.for_parent("parent-a").child_progress("gbemi").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn child_attendance_compares_with_class() {
    let engine = AnalyticsEngine::new(store());
    let attendance = engine.for_parent("parent-a").child_attendance("dayo").await.unwrap();

    assert_eq!(attendance.history.len(), 2);
    assert_eq!(attendance.history[0].percentage, 90.0);
    assert_eq!(attendance.class_average_attendance, 72.5);
}

#[tokio::test]
async fn child_subjects_and_risk() {
    let engine = AnalyticsEngine::new(store());
    let portal = engine.for_parent("parent-b");

    let subjects = portal.child_subjects("efe").await.unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].latest, 58.0);

    let risk = portal.child_risk("efe").await.unwrap();
    assert!(risk.factors.weak_subjects.triggered);
    assert!(risk.factors.low_attendance.triggered);
}
