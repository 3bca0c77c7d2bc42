//! Error types for analytics operations

/// Result type for analytics operations
pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;

/// Errors surfaced to callers of the analytics entry points
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// The requested student, subject or class has no matching records
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requesting parent does not own the target student
    #[error("Unauthorized")]
    Unauthorized,

    /// The backing store failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AnalyticsError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
