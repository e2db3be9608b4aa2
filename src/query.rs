//! Read-side composition over the store: CSV rendering and aggregate stats.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::PositionSample;

/// Fixed CSV column order. Coordinates render to 6 decimals,
/// altitude/velocity to 2; unknown values render as empty fields, never 0.
pub const CSV_HEADER: &str = "id,timestamp,day,latitude,longitude,altitude,velocity";

pub fn render_csv(samples: &[PositionSample]) -> String {
    let mut out = String::with_capacity(64 * (samples.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for sample in samples {
        out.push_str(&csv_row(sample));
        out.push('\n');
    }
    out
}

fn csv_row(s: &PositionSample) -> String {
    format!(
        "{},{},{},{:.6},{:.6},{},{}",
        s.id,
        s.observed_at.format("%Y-%m-%d %H:%M:%S"),
        s.day,
        s.latitude,
        s.longitude,
        fixed2(s.altitude),
        fixed2(s.velocity),
    )
}

fn fixed2(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

pub fn csv_filename(day: Option<&str>) -> String {
    match day {
        Some(d) => format!("positions_{d}.csv"),
        None => "positions_all.csv".to_string(),
    }
}

/// Aggregate stats for the dashboard.
///
/// `total_hours`/`total_days` divide the record count by the expected
/// samples-per-hour at the configured interval; a display convenience that
/// assumes uniform sampling, not a measured duration.
#[derive(Debug, Serialize)]
pub struct Stats {
    pub total_records: i64,
    pub records_per_day: BTreeMap<String, i64>,
    pub collection_interval_seconds: u64,
    pub max_retention_days: i64,
    pub total_hours: f64,
    pub total_days: f64,
}

pub fn build_stats(
    total_records: i64,
    records_per_day: BTreeMap<String, i64>,
    interval_secs: u64,
    retention_days: i64,
) -> Stats {
    let samples_per_hour = 3600.0 / interval_secs.max(1) as f64;
    let total_hours = round2(total_records as f64 / samples_per_hour);

    Stats {
        total_records,
        records_per_day,
        collection_interval_seconds: interval_secs,
        max_retention_days: retention_days,
        total_hours,
        total_days: round2(total_hours / 24.0),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
