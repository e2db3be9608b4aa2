//! CSV export endpoint

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::Result;
use crate::query;
use crate::routes::positions::validate_day;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// `YYYY-MM-DD` day filter; absent or "all" exports everything
    pub day: Option<String>,
}

/// GET /api/download-csv
///
/// Selected samples as a CSV attachment, ascending by time.
pub async fn download_csv(
    State(state): State<AppState>,
    Query(params): Query<ExportQuery>,
) -> Result<Response> {
    let day = match params.day.as_deref() {
        None | Some("all") => None,
        other => validate_day(other)?,
    };

    let samples = state.store.export(day).await?;
    let body = query::render_csv(&samples);
    let filename = query::csv_filename(day);

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];

    Ok((headers, body).into_response())
}
