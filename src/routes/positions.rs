//! Position read endpoints: current sample, preview window, paginated browsing

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{DaySummary, PositionSample};
use crate::state::AppState;

/// GET /api/current
///
/// Latest stored sample, or 404 when nothing has been collected yet.
pub async fn current(State(state): State<AppState>) -> Result<Json<PositionSample>> {
    let sample = state
        .store
        .latest()
        .await?
        .ok_or_else(|| AppError::NotFound("No data available".into()))?;

    Ok(Json(sample))
}

/// GET /api/last3days (alias: /api/preview)
///
/// All samples within the retention window, ascending by time.
pub async fn preview(State(state): State<AppState>) -> Result<Json<Vec<PositionSample>>> {
    let now = Utc::now();
    let from = now - Duration::days(state.config.retention_days);

    let samples = state.store.range(from, now).await?;
    Ok(Json(samples))
}

#[derive(Debug, Deserialize)]
pub struct AllRecordsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Optional `YYYY-MM-DD` day filter
    pub day: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    1000
}

#[derive(Debug, Serialize)]
pub struct AllRecordsResponse {
    pub records: Vec<PositionSample>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub available_days: Vec<String>,
}

/// GET /api/all-records
///
/// Paginated browse over everything stored, most-recent-first. Out-of-range
/// `page`/`per_page` are clamped; a malformed `day` is rejected with 400.
pub async fn all_records(
    State(state): State<AppState>,
    Query(params): Query<AllRecordsQuery>,
) -> Result<Json<AllRecordsResponse>> {
    let day = validate_day(params.day.as_deref())?;

    let page = state.store.page(day, params.page, params.per_page).await?;
    let available_days = state.store.distinct_days().await?;

    Ok(Json(AllRecordsResponse {
        records: page.records,
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
        available_days,
    }))
}

#[derive(Debug, Serialize)]
pub struct DaysResponse {
    pub days: Vec<DaySummary>,
}

/// GET /api/days-with-data
pub async fn days_with_data(State(state): State<AppState>) -> Result<Json<DaysResponse>> {
    let days = state.store.day_summaries().await?;
    Ok(Json(DaysResponse { days }))
}

/// Reject day filters that are not a `YYYY-MM-DD` calendar date. Empty
/// strings count as "no filter".
pub(crate) fn validate_day(day: Option<&str>) -> Result<Option<&str>> {
    match day {
        None | Some("") => Ok(None),
        Some(d) => {
            NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|_| {
                AppError::InvalidRequest(format!("invalid day filter `{d}`, expected YYYY-MM-DD"))
            })?;
            Ok(Some(d))
        }
    }
}
