//! Read interface over persisted results.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AnalyticsResult;
use crate::models::{ClassInfo, ClassSubject, Student, StudentResult, Term, TermScope};

/// Scoped reads the analytics engine needs. Implementations hand back
/// normalized records; every method is a plain read.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// All results for one class term.
    async fn class_results(&self, scope: &TermScope) -> AnalyticsResult<Vec<StudentResult>>;

    /// All results for a class across every term of a session.
    async fn class_session_results(
        &self,
        class_id: &str,
        session_id: &str,
    ) -> AnalyticsResult<Vec<StudentResult>>;

    /// The student's `limit` most recent results, oldest first.
    async fn student_results(
        &self,
        student_id: &str,
        limit: usize,
    ) -> AnalyticsResult<Vec<StudentResult>>;

    /// The student's `limit` most recent results created strictly before
    /// `before`, oldest first.
    async fn student_results_before(
        &self,
        student_id: &str,
        before: DateTime<Utc>,
        limit: usize,
    ) -> AnalyticsResult<Vec<StudentResult>>;

    async fn class_subjects(&self, class_id: &str) -> AnalyticsResult<Vec<ClassSubject>>;

    async fn class(&self, class_id: &str) -> AnalyticsResult<Option<ClassInfo>>;

    async fn school_classes(&self, school_id: &str) -> AnalyticsResult<Vec<ClassInfo>>;

    /// Terms of a session ordered by start date.
    async fn session_terms(&self, session_id: &str) -> AnalyticsResult<Vec<Term>>;

    async fn parent_children(&self, parent_id: &str) -> AnalyticsResult<Vec<Student>>;

    async fn parent_owns_student(&self, parent_id: &str, student_id: &str) -> AnalyticsResult<bool>;
}

/// In-memory store, for tests and for callers that already hold the records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    results: Vec<StudentResult>,
    classes: Vec<ClassInfo>,
    class_subjects: Vec<ClassSubject>,
    terms: Vec<Term>,
    students: Vec<Student>,
    parents: HashMap<String, HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, results: impl IntoIterator<Item = StudentResult>) -> Self {
        self.results.extend(results);
        self
    }

    pub fn with_class(mut self, class: ClassInfo) -> Self {
        self.classes.push(class);
        self
    }

    pub fn with_class_subject(mut self, subject: ClassSubject) -> Self {
        self.class_subjects.push(subject);
        self
    }

    pub fn with_term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    pub fn with_student(mut self, student: Student) -> Self {
        self.students.push(student);
        self
    }

    pub fn with_parent(mut self, parent_id: &str, student_id: &str) -> Self {
        self.parents
            .entry(parent_id.to_string())
            .or_default()
            .insert(student_id.to_string());
        self
    }

    fn sorted(mut results: Vec<StudentResult>) -> Vec<StudentResult> {
        results.sort_by_key(|r| r.created_at);
        results
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn class_results(&self, scope: &TermScope) -> AnalyticsResult<Vec<StudentResult>> {
        Ok(Self::sorted(
            self.results
                .iter()
                .filter(|r| {
                    r.class_id == scope.class_id
                        && r.session_id == scope.session_id
                        && r.term_id == scope.term_id
                })
                .cloned()
                .collect(),
        ))
    }

    async fn class_session_results(
        &self,
        class_id: &str,
        session_id: &str,
    ) -> AnalyticsResult<Vec<StudentResult>> {
        Ok(Self::sorted(
            self.results
                .iter()
                .filter(|r| r.class_id == class_id && r.session_id == session_id)
                .cloned()
                .collect(),
        ))
    }

    async fn student_results(
        &self,
        student_id: &str,
        limit: usize,
    ) -> AnalyticsResult<Vec<StudentResult>> {
        let all = Self::sorted(
            self.results
                .iter()
                .filter(|r| r.student_id == student_id)
                .cloned()
                .collect(),
        );
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn student_results_before(
        &self,
        student_id: &str,
        before: DateTime<Utc>,
        limit: usize,
    ) -> AnalyticsResult<Vec<StudentResult>> {
        let earlier = Self::sorted(
            self.results
                .iter()
                .filter(|r| r.student_id == student_id && r.created_at < before)
                .cloned()
                .collect(),
        );
        let skip = earlier.len().saturating_sub(limit);
        Ok(earlier.into_iter().skip(skip).collect())
    }

    async fn class_subjects(&self, class_id: &str) -> AnalyticsResult<Vec<ClassSubject>> {
        Ok(self
            .class_subjects
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn class(&self, class_id: &str) -> AnalyticsResult<Option<ClassInfo>> {
        Ok(self.classes.iter().find(|c| c.id == class_id).cloned())
    }

    async fn school_classes(&self, school_id: &str) -> AnalyticsResult<Vec<ClassInfo>> {
        Ok(self
            .classes
            .iter()
            .filter(|c| c.school_id == school_id)
            .cloned()
            .collect())
    }

    async fn session_terms(&self, session_id: &str) -> AnalyticsResult<Vec<Term>> {
        let mut terms: Vec<Term> = self
            .terms
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        terms.sort_by_key(|t| t.start_date);
        Ok(terms)
    }

    async fn parent_children(&self, parent_id: &str) -> AnalyticsResult<Vec<Student>> {
        let Some(children) = self.parents.get(parent_id) else {
            return Ok(Vec::new());
        };
        Ok(self
            .students
            .iter()
            .filter(|s| children.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn parent_owns_student(&self, parent_id: &str, student_id: &str) -> AnalyticsResult<bool> {
        Ok(self
            .parents
            .get(parent_id)
            .is_some_and(|children| children.contains(student_id)))
    }
}
