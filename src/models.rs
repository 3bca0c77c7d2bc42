use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Scope of a single class sitting one term of one academic session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermScope {
    pub class_id: String,
    pub session_id: String,
    pub term_id: String,
}

impl TermScope {
    pub fn new(
        class_id: impl Into<String>,
        session_id: impl Into<String>,
        term_id: impl Into<String>,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            session_id: session_id.into(),
            term_id: term_id.into(),
        }
    }
}

/// One subject's breakdown inside a student's term result.
///
/// Every numeric field deserializes leniently: missing, null, non-numeric or
/// non-finite values become `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectScore {
    #[serde(deserialize_with = "lenient_f64")]
    pub ca1: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ca2: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub project: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub exam: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub grade: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub class_average: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub position_in_class: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub remark: String,
}

impl SubjectScore {
    /// CA1, CA2 or exam recorded as zero counts as a missing assessment.
    pub fn is_missing_assessment(&self) -> bool {
        self.ca1 == 0.0 || self.ca2 == 0.0 || self.exam == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub session_id: String,
    pub term_id: String,
    pub overall_average: f64,
    pub overall_position: u32,
    pub days_present: u32,
    pub days_school_open: u32,
    pub subject_results: BTreeMap<String, SubjectScore>,
    pub affective_domain: BTreeMap<String, i64>,
    pub psychomotor_domain: BTreeMap<String, i64>,
    pub created_at: DateTime<Utc>,
}

impl StudentResult {
    /// `daysPresent / daysSchoolOpen * 100`, or 0 when the school never opened.
    pub fn attendance_percentage(&self) -> f64 {
        if self.days_school_open == 0 {
            0.0
        } else {
            f64::from(self.days_present) / f64::from(self.days_school_open) * 100.0
        }
    }

    pub fn subject_total(&self, subject: &str) -> Option<f64> {
        self.subject_results.get(subject).map(|s| s.total)
    }
}

/// A result row as it comes out of storage, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawStudentResult {
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub session_id: String,
    pub term_id: String,
    pub overall_average: Option<f64>,
    pub overall_position: Option<i64>,
    pub days_present: Option<i64>,
    pub days_school_open: Option<i64>,
    pub subject_results: Option<String>,
    pub affective_domain: Option<String>,
    pub psychomotor_domain: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RawStudentResult> for StudentResult {
    fn from(raw: RawStudentResult) -> Self {
        Self {
            student_id: raw.student_id,
            student_name: raw.student_name,
            class_id: raw.class_id,
            session_id: raw.session_id,
            term_id: raw.term_id,
            overall_average: finite_or_zero(raw.overall_average),
            overall_position: count_or_zero(raw.overall_position),
            days_present: count_or_zero(raw.days_present),
            days_school_open: count_or_zero(raw.days_school_open),
            subject_results: parse_subject_results(raw.subject_results.as_deref()),
            affective_domain: parse_domain_scores(raw.affective_domain.as_deref()),
            psychomotor_domain: parse_domain_scores(raw.psychomotor_domain.as_deref()),
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: String,
    pub name: String,
    pub school_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSubject {
    pub class_id: String,
    pub subject_id: String,
    pub subject_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub full_name: String,
    pub class_id: String,
}

pub fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn count_or_zero(value: Option<i64>) -> u32 {
    value
        .map(|v| u32::try_from(v.max(0)).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Parses the stored subject blob. Unparseable text yields an empty map and
/// entries that are not objects are dropped.
pub fn parse_subject_results(text: Option<&str>) -> BTreeMap<String, SubjectScore> {
    let Some(object) = parse_object(text) else {
        return BTreeMap::new();
    };

    object
        .into_iter()
        .filter_map(|(name, value)| {
            if !value.is_object() {
                return None;
            }
            serde_json::from_value::<SubjectScore>(value)
                .ok()
                .map(|score| (name, score))
        })
        .collect()
}

/// Parses an affective/psychomotor blob into trait → rounded score.
pub fn parse_domain_scores(text: Option<&str>) -> BTreeMap<String, i64> {
    let Some(object) = parse_object(text) else {
        return BTreeMap::new();
    };

    object
        .into_iter()
        .map(|(name, value)| (name, coerce_number(&value).round() as i64))
        .collect()
}

fn parse_object(text: Option<&str>) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(text?.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    finite_or_zero(number)
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
