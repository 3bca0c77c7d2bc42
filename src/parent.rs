//! Parent-scoped views. Every child-scoped call checks that the parent owns
//! the student before any analytics data is read.

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::classify::{performance_tier, PerformanceTier, Trend};
use crate::engine::AnalyticsEngine;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::TermScope;
use crate::progress::{AttendanceTerm, StudentProgress, SubjectProgress};
use crate::risk::{RiskLevel, RiskScore};
use crate::stats::{self, round2, CorrelationStrength};
use crate::store::ResultStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildOverview {
    pub student_id: String,
    pub full_name: String,
    pub class_id: String,
    pub latest_average: Option<f64>,
    pub tier: Option<PerformanceTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub term_id: String,
    pub average: f64,
    pub position: u32,
    pub tier: PerformanceTier,
    pub attendance: f64,
    pub overall_trend: Trend,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildAttendance {
    pub student_id: String,
    pub history: Vec<AttendanceTerm>,
    pub class_average_attendance: f64,
    pub class_correlation: f64,
    pub class_correlation_strength: CorrelationStrength,
}

/// Analytics as seen by one parent account.
#[derive(Debug)]
pub struct ParentAnalytics<'a, S> {
    engine: &'a AnalyticsEngine<S>,
    parent_id: String,
}

impl<S: ResultStore> AnalyticsEngine<S> {
    pub fn for_parent(&self, parent_id: impl Into<String>) -> ParentAnalytics<'_, S> {
        ParentAnalytics {
            engine: self,
            parent_id: parent_id.into(),
        }
    }
}

impl<S: ResultStore> ParentAnalytics<'_, S> {
    async fn authorize(&self, student_id: &str) -> AnalyticsResult<()> {
        let owns = self
            .engine
            .store()
            .parent_owns_student(&self.parent_id, student_id)
            .await?;
        if owns {
            Ok(())
        } else {
            warn!(parent_id = %self.parent_id, student_id, "parent requested a student they do not own");
            Err(AnalyticsError::Unauthorized)
        }
    }

    /// The parent's children with their latest average, if any.
    #[instrument(skip(self), fields(parent_id = %self.parent_id))]
    pub async fn children(&self) -> AnalyticsResult<Vec<ChildOverview>> {
        let store = self.engine.store();
        let children = store.parent_children(&self.parent_id).await?;
        let latest = try_join_all(children.iter().map(|c| store.student_results(&c.id, 1))).await?;

        Ok(children
            .into_iter()
            .zip(latest)
            .map(|(child, results)| {
                let latest_average = results.last().map(|r| r.overall_average);
                ChildOverview {
                    student_id: child.id,
                    full_name: child.full_name,
                    class_id: child.class_id,
                    tier: latest_average.map(performance_tier),
                    latest_average,
                }
            })
            .collect())
    }

    #[instrument(skip(self), fields(parent_id = %self.parent_id))]
    pub async fn child_progress(&self, student_id: &str) -> AnalyticsResult<StudentProgress> {
        self.authorize(student_id).await?;
        self.engine.student_progress(student_id).await
    }

    #[instrument(skip(self), fields(parent_id = %self.parent_id))]
    pub async fn child_risk(&self, student_id: &str) -> AnalyticsResult<RiskScore> {
        self.authorize(student_id).await?;
        self.engine.student_risk(student_id).await
    }

    #[instrument(skip(self), fields(parent_id = %self.parent_id))]
    pub async fn child_summary(&self, student_id: &str) -> AnalyticsResult<ChildSummary> {
        let progress = self.child_progress(student_id).await?;
        let latest = progress
            .terms
            .last()
            .ok_or_else(|| AnalyticsError::not_found(format!("results for student {student_id}")))?;

        Ok(ChildSummary {
            student_id: progress.student_id.clone(),
            student_name: progress.student_name.clone(),
            class_id: latest.class_id.clone(),
            term_id: latest.term_id.clone(),
            average: latest.average,
            position: latest.position,
            tier: latest.tier,
            attendance: progress.attendance.last().map(|a| a.percentage).unwrap_or(0.0),
            overall_trend: progress.overall_trend,
            risk_score: progress.risk.risk_score,
            risk_level: progress.risk.risk_level,
            strengths: progress.strengths,
            weaknesses: progress.weaknesses,
            recommendations: progress.recommendations,
        })
    }

    #[instrument(skip(self), fields(parent_id = %self.parent_id))]
    pub async fn child_subjects(&self, student_id: &str) -> AnalyticsResult<Vec<SubjectProgress>> {
        Ok(self.child_progress(student_id).await?.subjects)
    }

    /// The child's attendance history next to class-level attendance figures
    /// for the latest term. No other student's individual data is exposed.
    #[instrument(skip(self), fields(parent_id = %self.parent_id))]
    pub async fn child_attendance(&self, student_id: &str) -> AnalyticsResult<ChildAttendance> {
        let progress = self.child_progress(student_id).await?;
        let latest = progress
            .terms
            .last()
            .ok_or_else(|| AnalyticsError::not_found(format!("results for student {student_id}")))?;

        let scope = TermScope::new(
            latest.class_id.as_str(),
            latest.session_id.as_str(),
            latest.term_id.as_str(),
        );
        let cohort = self.engine.store().class_results(&scope).await?;
        let attendance: Vec<f64> = cohort.iter().map(|r| r.attendance_percentage()).collect();
        let averages: Vec<f64> = cohort.iter().map(|r| r.overall_average).collect();
        let correlation = stats::pearson_correlation(&attendance, &averages);

        Ok(ChildAttendance {
            student_id: progress.student_id,
            history: progress.attendance,
            class_average_attendance: round2(stats::mean(&attendance)),
            class_correlation: round2(correlation),
            class_correlation_strength: stats::correlation_strength(correlation),
        })
    }
}
