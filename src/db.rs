use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{
    ClassInfo, ClassSubject, RawStudentResult, Student, StudentResult, Term, TermScope,
};
use crate::store::ResultStore;

const RESULT_COLUMNS: &str = "r.student_id, st.full_name, r.class_id, r.session_id, r.term_id, \
     r.overall_average, r.overall_position, r.days_present, r.days_school_open, \
     r.subject_results, r.affective_domain, r.psychomotor_domain, r.created_at \
     FROM school_results.student_results r \
     JOIN school_results.students st ON st.id = r.student_id";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("read model migrations applied");
    Ok(())
}

/// Postgres-backed [`ResultStore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn result_from_row(row: &PgRow) -> Result<StudentResult, sqlx::Error> {
    let raw = RawStudentResult {
        student_id: row.try_get("student_id")?,
        student_name: row.try_get("full_name")?,
        class_id: row.try_get("class_id")?,
        session_id: row.try_get("session_id")?,
        term_id: row.try_get("term_id")?,
        overall_average: row.try_get("overall_average")?,
        overall_position: row.try_get::<Option<i32>, _>("overall_position")?.map(i64::from),
        days_present: row.try_get::<Option<i32>, _>("days_present")?.map(i64::from),
        days_school_open: row.try_get::<Option<i32>, _>("days_school_open")?.map(i64::from),
        subject_results: row.try_get("subject_results")?,
        affective_domain: row.try_get("affective_domain")?,
        psychomotor_domain: row.try_get("psychomotor_domain")?,
        created_at: row.try_get("created_at")?,
    };
    Ok(raw.into())
}

fn results_from_rows(rows: &[PgRow]) -> AnalyticsResult<Vec<StudentResult>> {
    rows.iter()
        .map(|row| result_from_row(row).map_err(AnalyticsError::from))
        .collect()
}

fn class_from_row(row: &PgRow) -> Result<ClassInfo, sqlx::Error> {
    Ok(ClassInfo {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        school_id: row.try_get("school_id")?,
    })
}

#[async_trait]
impl ResultStore for PgStore {
    async fn class_results(&self, scope: &TermScope) -> AnalyticsResult<Vec<StudentResult>> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} \
             WHERE r.class_id = $1 AND r.session_id = $2 AND r.term_id = $3 \
             ORDER BY r.created_at"
        );
        let rows = sqlx::query(&query)
            .bind(&scope.class_id)
            .bind(&scope.session_id)
            .bind(&scope.term_id)
            .fetch_all(&self.pool)
            .await?;
        debug!(class_id = %scope.class_id, term_id = %scope.term_id, rows = rows.len(), "fetched class results");
        results_from_rows(&rows)
    }

    async fn class_session_results(
        &self,
        class_id: &str,
        session_id: &str,
    ) -> AnalyticsResult<Vec<StudentResult>> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} \
             WHERE r.class_id = $1 AND r.session_id = $2 \
             ORDER BY r.created_at"
        );
        let rows = sqlx::query(&query)
            .bind(class_id)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        debug!(class_id, session_id, rows = rows.len(), "fetched session results");
        results_from_rows(&rows)
    }

    async fn student_results(
        &self,
        student_id: &str,
        limit: usize,
    ) -> AnalyticsResult<Vec<StudentResult>> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} \
             WHERE r.student_id = $1 \
             ORDER BY r.created_at DESC \
             LIMIT $2"
        );
        let rows = sqlx::query(&query)
            .bind(student_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        debug!(student_id, rows = rows.len(), "fetched student results");

        let mut results = results_from_rows(&rows)?;
        results.reverse();
        Ok(results)
    }

    async fn student_results_before(
        &self,
        student_id: &str,
        before: DateTime<Utc>,
        limit: usize,
    ) -> AnalyticsResult<Vec<StudentResult>> {
        let query = format!(
            "SELECT {RESULT_COLUMNS} \
             WHERE r.student_id = $1 AND r.created_at < $2 \
             ORDER BY r.created_at DESC \
             LIMIT $3"
        );
        let rows = sqlx::query(&query)
            .bind(student_id)
            .bind(before)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        debug!(student_id, %before, rows = rows.len(), "fetched earlier student results");

        let mut results = results_from_rows(&rows)?;
        results.reverse();
        Ok(results)
    }

    async fn class_subjects(&self, class_id: &str) -> AnalyticsResult<Vec<ClassSubject>> {
        let rows = sqlx::query(
            r#"
            SELECT cs.class_id, s.id AS subject_id, s.name AS subject_name
            FROM school_results.class_subjects cs
            JOIN school_results.subjects s ON s.id = cs.subject_id
            WHERE cs.class_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            subjects.push(ClassSubject {
                class_id: row.try_get("class_id")?,
                subject_id: row.try_get("subject_id")?,
                subject_name: row.try_get("subject_name")?,
            });
        }
        Ok(subjects)
    }

    async fn class(&self, class_id: &str) -> AnalyticsResult<Option<ClassInfo>> {
        let row = sqlx::query("SELECT id, name, school_id FROM school_results.classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(class_from_row).transpose()?)
    }

    async fn school_classes(&self, school_id: &str) -> AnalyticsResult<Vec<ClassInfo>> {
        let rows = sqlx::query(
            "SELECT id, name, school_id FROM school_results.classes WHERE school_id = $1 ORDER BY name",
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;

        let classes = rows.iter().map(class_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(classes)
    }

    async fn session_terms(&self, session_id: &str) -> AnalyticsResult<Vec<Term>> {
        let rows = sqlx::query(
            "SELECT id, session_id, name, start_date FROM school_results.terms \
             WHERE session_id = $1 ORDER BY start_date",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        let mut terms = Vec::with_capacity(rows.len());
        for row in rows {
            terms.push(Term {
                id: row.try_get("id")?,
                session_id: row.try_get("session_id")?,
                name: row.try_get("name")?,
                start_date: row.try_get("start_date")?,
            });
        }
        Ok(terms)
    }

    async fn parent_children(&self, parent_id: &str) -> AnalyticsResult<Vec<Student>> {
        let rows = sqlx::query(
            r#"
            SELECT st.id, st.full_name, st.class_id
            FROM school_results.parent_students ps
            JOIN school_results.students st ON st.id = ps.student_id
            WHERE ps.parent_id = $1
            ORDER BY st.full_name
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            students.push(Student {
                id: row.try_get("id")?,
                full_name: row.try_get("full_name")?,
                class_id: row.try_get("class_id")?,
            });
        }
        Ok(students)
    }

    async fn parent_owns_student(&self, parent_id: &str, student_id: &str) -> AnalyticsResult<bool> {
        let owns: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM school_results.parent_students \
             WHERE parent_id = $1 AND student_id = $2) AS owns",
        )
        .bind(parent_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?
        .try_get("owns")?;
        Ok(owns)
    }
}

/// Inserts a small demo school: two classes, three terms, and a handful of
/// students with parents.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let session = ("2025-2026", "2025/2026 Session");
    let terms = [
        ("2025-first", "First Term", NaiveDate::from_ymd_opt(2025, 9, 8)),
        ("2025-second", "Second Term", NaiveDate::from_ymd_opt(2026, 1, 5)),
        ("2025-third", "Third Term", NaiveDate::from_ymd_opt(2026, 4, 20)),
    ];
    let classes = [("jss1a", "JSS 1A"), ("jss1b", "JSS 1B")];
    let subjects = [("maths", "Mathematics"), ("english", "English Language"), ("science", "Basic Science")];
    let students = [
        ("stu-001", "Chidera Okafor", "jss1a", "parent-okafor", [78.0, 82.0, 88.0], 60),
        ("stu-002", "Tunde Bakare", "jss1a", "parent-bakare", [71.0, 63.0, 52.0], 41),
        ("stu-003", "Amina Yusuf", "jss1a", "parent-yusuf", [91.0, 93.0, 95.0], 64),
        ("stu-004", "Kelechi Eze", "jss1b", "parent-okafor", [58.0, 61.0, 66.0], 55),
        ("stu-005", "Funmi Adeyemi", "jss1b", "parent-adeyemi", [64.0, 59.0, 47.0], 30),
    ];

    sqlx::query(
        "INSERT INTO school_results.academic_sessions (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
    )
    .bind(session.0)
    .bind(session.1)
    .execute(pool)
    .await?;

    for &(id, name, start_date) in terms.iter() {
        let start_date = start_date.context("invalid date")?;
        sqlx::query(
            r#"
            INSERT INTO school_results.terms (id, session_id, name, start_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, start_date = EXCLUDED.start_date
            "#,
        )
        .bind(id)
        .bind(session.0)
        .bind(name)
        .bind(start_date)
        .execute(pool)
        .await?;
    }

    for (id, name) in subjects {
        sqlx::query("INSERT INTO school_results.subjects (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    }

    for (class_id, class_name) in classes {
        sqlx::query(
            r#"
            INSERT INTO school_results.classes (id, school_id, name)
            VALUES ($1, 'demo-school', $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(class_id)
        .bind(class_name)
        .execute(pool)
        .await?;

        for (subject_id, _) in subjects {
            sqlx::query(
                "INSERT INTO school_results.class_subjects (class_id, subject_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(class_id)
            .bind(subject_id)
            .execute(pool)
            .await?;
        }
    }

    let mut inserted = 0u64;
    for (student_id, full_name, class_id, parent_id, averages, days_present) in students {
        sqlx::query(
            r#"
            INSERT INTO school_results.students (id, full_name, class_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, class_id = EXCLUDED.class_id
            "#,
        )
        .bind(student_id)
        .bind(full_name)
        .bind(class_id)
        .execute(pool)
        .await?;

        sqlx::query(
            "INSERT INTO school_results.parent_students (parent_id, student_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(parent_id)
        .bind(student_id)
        .execute(pool)
        .await?;

        for (&(term_id, _, start_date), average) in terms.iter().zip(averages) {
            let created_at = start_date
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .context("invalid date")?
                .and_utc()
                + chrono::Duration::days(80);
            let subject_results = json!({
                "Mathematics": seed_subject(average + 4.0),
                "English Language": seed_subject(average),
                "Basic Science": seed_subject(average - 6.0),
            });
            let affective = json!({ "Punctuality": 4, "Neatness": 3, "Attentiveness": 2 });
            let psychomotor = json!({ "Handwriting": 3, "Sports": 4 });

            let result = sqlx::query(
                r#"
                INSERT INTO school_results.student_results
                (id, student_id, class_id, session_id, term_id, overall_average, overall_position,
                 days_present, days_school_open, subject_results, affective_domain,
                 psychomotor_domain, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, 65, $8, $9, $10, $11)
                ON CONFLICT (student_id, class_id, session_id, term_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(class_id)
            .bind(session.0)
            .bind(term_id)
            .bind(average)
            .bind(days_present)
            .bind(subject_results.to_string())
            .bind(affective.to_string())
            .bind(psychomotor.to_string())
            .bind(created_at)
            .execute(pool)
            .await?;

            inserted += result.rows_affected();
        }
    }

    info!(inserted, "seed results inserted");
    Ok(())
}

fn seed_subject(total: f64) -> serde_json::Value {
    let total = total.clamp(0.0, 100.0);
    json!({
        "ca1": (total * 0.2).round(),
        "ca2": (total * 0.2).round(),
        "project": (total * 0.1).round(),
        "exam": (total * 0.5).round(),
        "total": total,
        "grade": crate::classify::letter_grade(total),
        "classAverage": 0,
        "positionInClass": 0,
        "remark": "",
    })
}
