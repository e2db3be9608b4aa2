//! Upstream position API adapter
//!
//! The upstream is an untrusted, occasionally-failing data source with two
//! known response shapes:
//!
//! - flat: `{latitude, longitude, altitude, velocity, timestamp}` with
//!   numeric coordinates;
//! - nested: `{"iss_position": {"latitude": "10.5", "longitude": "20.5"},
//!   "timestamp": 1700000000}` with string coordinates and no
//!   altitude/velocity.
//!
//! Both normalize to one [`Observation`]; anything else is a fetch failure
//! and nothing gets stored.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::Observation;

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Why a fetch attempt produced no observation
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// HTTP client for the configured upstream endpoint.
pub struct PositionSource {
    client: reqwest::Client,
    url: String,
}

impl PositionSource {
    pub fn new(url: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Issue one bounded-timeout GET and normalize the response.
    pub async fn fetch(&self) -> Result<Observation, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedPayload(e.to_string()))?;

        parse_payload(&payload, Utc::now())
    }
}

/// Normalize either known payload shape into an [`Observation`].
///
/// `fallback_now` stands in for `observed_at` when the payload carries no
/// epoch timestamp; accuracy is then approximate. Timestamps are truncated
/// to whole seconds either way.
pub fn parse_payload(payload: &Value, fallback_now: DateTime<Utc>) -> Result<Observation, FetchError> {
    // Shape detection: the nested variant keeps coordinates under a
    // sub-object and reports them as strings.
    let (position, flat) = match payload.get("iss_position") {
        Some(nested) => (nested, false),
        None => (payload, true),
    };

    let latitude = number_field(position, "latitude")?;
    let longitude = normalize_longitude(number_field(position, "longitude")?);

    let (altitude, velocity) = if flat {
        (
            optional_number(payload, "altitude"),
            optional_number(payload, "velocity"),
        )
    } else {
        (None, None)
    };

    let epoch = payload
        .get("timestamp")
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));

    let observed_at = match epoch {
        Some(secs) => Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
            FetchError::MalformedPayload(format!("timestamp {secs} out of range"))
        })?,
        None => Utc
            .timestamp_opt(fallback_now.timestamp(), 0)
            .single()
            .unwrap_or(fallback_now),
    };

    Ok(Observation {
        latitude,
        longitude,
        altitude,
        velocity,
        observed_at,
    })
}

/// Map a [0, 360) longitude onto the signed [-180, 180) convention.
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon >= 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

fn number_field(obj: &Value, key: &str) -> Result<f64, FetchError> {
    parse_number(obj.get(key)).ok_or_else(|| {
        FetchError::MalformedPayload(format!("missing or non-numeric field `{key}`"))
    })
}

fn optional_number(obj: &Value, key: &str) -> Option<f64> {
    parse_number(obj.get(key))
}

// Coordinates arrive as JSON numbers in the flat shape and as numeric
// strings in the nested one.
fn parse_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
