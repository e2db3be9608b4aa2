//! Core domain models for satlog

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One persisted observation of the tracked object's position.
#[derive(Debug, Clone, Serialize)]
pub struct PositionSample {
    /// Store-assigned surrogate id, strictly increasing with insertion order
    pub id: i64,
    /// Degrees, [-90, 90]
    pub latitude: f64,
    /// Degrees, signed [-180, 180)
    pub longitude: f64,
    /// Kilometers; `None` when the source shape does not report it
    pub altitude: Option<f64>,
    /// km/h; `None` when the source shape does not report it
    pub velocity: Option<f64>,
    /// UTC, second precision, from the upstream payload when available
    pub observed_at: DateTime<Utc>,
    /// UTC calendar date of `observed_at`, fixed at write time
    pub day: String,
}

/// An observation before the store has assigned it an id and day bucket.
#[derive(Debug, Clone)]
pub struct Observation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub velocity: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

/// Calendar-date bucket key (`YYYY-MM-DD`) for a UTC timestamp.
pub fn day_of(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Per-day summary row for the day browser.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub day: String,
    pub record_count: i64,
    pub first_record: DateTime<Utc>,
    pub last_record: DateTime<Utc>,
}

/// One page of samples from the store, most-recent-first.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub records: Vec<PositionSample>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}
