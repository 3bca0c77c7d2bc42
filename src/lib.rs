//! Student performance analytics over stored term results: class and school
//! dashboards, risk scoring, subject and class comparison, attendance impact
//! and per-student progress, plus parent-scoped views of the same data.

pub mod attendance;
pub mod classify;
pub mod compare;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod parent;
pub mod progress;
pub mod report;
pub mod risk;
pub mod stats;
pub mod store;
pub mod subject;

pub use engine::AnalyticsEngine;
pub use error::{AnalyticsError, AnalyticsResult};
pub use models::{StudentResult, TermScope};
pub use store::{MemoryStore, ResultStore};
