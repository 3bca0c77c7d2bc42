//! Entry points called by request handlers: fetch the scoped records from a
//! [`ResultStore`], then hand them to the pure analytics modules.

use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::attendance::{analyze_attendance, AttendanceImpact};
use crate::compare::{compare_classes, ClassCohort, ClassComparison};
use crate::dashboard::{self, ClassDashboard, SchoolDashboard};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{StudentResult, TermScope};
use crate::progress::{track_progress, StudentProgress, TRACKED_TERMS};
use crate::risk::{calculate_risk, rank_by_risk, ClassMetrics, RiskScore};
use crate::store::ResultStore;
use crate::subject::{analyze_subject, SubjectAnalytics};

/// Stateless analytics over a shared store. Cheap to clone when `S` is.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine<S> {
    store: S,
}

impl<S: ResultStore> AnalyticsEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(skip(self))]
    pub async fn class_dashboard(&self, scope: &TermScope) -> AnalyticsResult<ClassDashboard> {
        let results = self.store.class_results(scope).await?;
        if results.is_empty() {
            debug!("no results in scope, returning empty dashboard");
            return Ok(ClassDashboard::empty(&scope.class_id));
        }

        let (terms, session_results) = futures::try_join!(
            self.store.session_terms(&scope.session_id),
            self.store
                .class_session_results(&scope.class_id, &scope.session_id),
        )?;
        let trend = dashboard::term_trend(&terms, &session_results);

        Ok(dashboard::class_dashboard(&scope.class_id, &results, trend))
    }

    /// Runs the class dashboard for every class of the school concurrently.
    #[instrument(skip(self))]
    pub async fn school_dashboard(
        &self,
        school_id: &str,
        session_id: &str,
        term_id: &str,
    ) -> AnalyticsResult<SchoolDashboard> {
        let classes = self.store.school_classes(school_id).await?;
        debug!(classes = classes.len(), "aggregating school");

        let dashboards = try_join_all(classes.iter().map(|class| async move {
            let scope = TermScope::new(class.id.as_str(), session_id, term_id);
            let dashboard = self.class_dashboard(&scope).await?;
            Ok::<_, AnalyticsError>((class.name.clone(), dashboard))
        }))
        .await?;

        Ok(dashboard::school_dashboard(school_id, &dashboards))
    }

    /// Risk for a student's most recent result, scored against that term's
    /// class cohort.
    #[instrument(skip(self))]
    pub async fn student_risk(&self, student_id: &str) -> AnalyticsResult<RiskScore> {
        let history = self
            .store
            .student_results(student_id, TRACKED_TERMS + 1)
            .await?;
        let Some((latest, earlier)) = history.split_last() else {
            return Err(AnalyticsError::not_found(format!(
                "no results recorded for student {student_id}"
            )));
        };

        let cohort = self.store.class_results(&scope_of(latest)).await?;
        let metrics = ClassMetrics::from_results(&cohort);
        Ok(calculate_risk(latest, &metrics, earlier))
    }

    /// Every student in the class scored, highest risk first. Each student's
    /// history is fetched concurrently.
    #[instrument(skip(self))]
    pub async fn class_risk(&self, scope: &TermScope) -> AnalyticsResult<Vec<RiskScore>> {
        let cohort = self.store.class_results(scope).await?;
        let metrics = ClassMetrics::from_results(&cohort);

        let histories = try_join_all(cohort.iter().map(|result| {
            self.store
                .student_results_before(&result.student_id, result.created_at, TRACKED_TERMS)
        }))
        .await?;

        let scores = cohort
            .iter()
            .zip(histories)
            .map(|(current, earlier)| calculate_risk(current, &metrics, &earlier))
            .collect();

        Ok(rank_by_risk(scores))
    }

    /// Resolves `subject_id` through the class's subject list, then analyzes
    /// that subject for the term.
    #[instrument(skip(self))]
    pub async fn subject_analytics(
        &self,
        scope: &TermScope,
        subject_id: &str,
    ) -> AnalyticsResult<SubjectAnalytics> {
        let subjects = self.store.class_subjects(&scope.class_id).await?;
        let subject = subjects
            .iter()
            .find(|s| s.subject_id == subject_id)
            .ok_or_else(|| {
                AnalyticsError::not_found(format!(
                    "subject {subject_id} is not taught in class {}",
                    scope.class_id
                ))
            })?;

        let results = self.store.class_results(scope).await?;
        analyze_subject(&subject.subject_name, &results)
    }

    #[instrument(skip(self))]
    pub async fn compare_classes(
        &self,
        class_ids: &[String],
        session_id: &str,
        term_id: &str,
    ) -> AnalyticsResult<ClassComparison> {
        let cohorts = try_join_all(class_ids.iter().map(|class_id| async move {
            let scope = TermScope::new(class_id.as_str(), session_id, term_id);
            let (class, subjects, results) = futures::try_join!(
                self.store.class(class_id),
                self.store.class_subjects(class_id),
                self.store.class_results(&scope),
            )?;
            let class = class
                .ok_or_else(|| AnalyticsError::not_found(format!("class {class_id}")))?;

            Ok::<_, AnalyticsError>(ClassCohort {
                class_id: class.id,
                class_name: class.name,
                subjects: subjects.into_iter().map(|s| s.subject_name).collect(),
                results,
            })
        }))
        .await?;

        Ok(compare_classes(&cohorts))
    }

    #[instrument(skip(self))]
    pub async fn attendance_impact(&self, scope: &TermScope) -> AnalyticsResult<AttendanceImpact> {
        let results = self.store.class_results(scope).await?;
        Ok(analyze_attendance(&results))
    }

    #[instrument(skip(self))]
    pub async fn student_progress(&self, student_id: &str) -> AnalyticsResult<StudentProgress> {
        let history = self.store.student_results(student_id, TRACKED_TERMS).await?;
        let Some(latest) = history.last() else {
            return Err(AnalyticsError::not_found(format!(
                "no results recorded for student {student_id}"
            )));
        };

        let cohort = self.store.class_results(&scope_of(latest)).await?;
        track_progress(&history, &cohort)
    }
}

fn scope_of(result: &StudentResult) -> TermScope {
    TermScope::new(
        result.class_id.as_str(),
        result.session_id.as_str(),
        result.term_id.as_str(),
    )
}
