//! Aggregate stats endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::query::{self, Stats};
use crate::state::AppState;

/// GET /api/stats
///
/// Record totals plus approximate coverage hours/days (assumes uniform
/// sampling at the configured interval).
pub async fn stats(State(state): State<AppState>) -> Result<Json<Stats>> {
    let total = state.store.count().await?;
    let per_day = state.store.count_by_day().await?;

    Ok(Json(query::build_stats(
        total,
        per_day,
        state.config.fetch_interval_secs,
        state.config.retention_days,
    )))
}
