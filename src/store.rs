//! SQLite-backed position store
//!
//! Sole owner of the connection pool; every operation is a self-contained
//! statement, safe to run concurrently with reads. Samples are insert-only
//! and the only delete path is the retention prune.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{day_of, DaySummary, Observation, Page, PositionSample};

/// Hard ceiling on page size, keeps result sets bounded.
pub const MAX_PER_PAGE: u32 = 5000;

const SAMPLE_COLUMNS: &str = "id, latitude, longitude, altitude, velocity, observed_at, day";

type SampleRow = (i64, f64, f64, Option<f64>, Option<f64>, DateTime<Utc>, String);

fn sample_from(row: SampleRow) -> PositionSample {
    let (id, latitude, longitude, altitude, velocity, observed_at, day) = row;
    PositionSample {
        id,
        latitude,
        longitude,
        altitude,
        velocity,
        observed_at,
        day,
    }
}

#[derive(Clone)]
pub struct PositionStore {
    pool: SqlitePool,
}

impl PositionStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::Storage(format!("create {}: {e}", parent.display())))?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(db = %path.display(), "position store ready");
        Ok(store)
    }

    /// In-memory store for tests. Schema is applied.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(sqlx::Error::from)?
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS positions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                altitude REAL,
                velocity REAL,
                observed_at TEXT NOT NULL,
                day TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_positions_day ON positions(day)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_positions_observed_at ON positions(observed_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Append one observation; derives the day bucket and returns the
    /// assigned id. Ids strictly increase with insertion order, even for
    /// late-arriving out-of-order samples.
    pub async fn insert(&self, obs: &Observation) -> Result<i64> {
        let day = day_of(obs.observed_at);

        let result = sqlx::query(
            "INSERT INTO positions (latitude, longitude, altitude, velocity, observed_at, day) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(obs.latitude)
        .bind(obs.longitude)
        .bind(obs.altitude)
        .bind(obs.velocity)
        .bind(obs.observed_at)
        .bind(&day)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recently inserted sample (highest id), if any.
    pub async fn latest(&self) -> Result<Option<PositionSample>> {
        let row: Option<SampleRow> = sqlx::query_as(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM positions ORDER BY id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(sample_from))
    }

    /// Samples with `from <= observed_at <= to`, ascending by time.
    pub async fn range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PositionSample>> {
        let rows: Vec<SampleRow> = sqlx::query_as(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM positions \
             WHERE observed_at >= ? AND observed_at <= ? \
             ORDER BY observed_at ASC, id ASC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(sample_from).collect())
    }

    /// One page of samples, most-recent-first, optionally restricted to a
    /// day bucket. `per_page` is clamped to [1, MAX_PER_PAGE] and `page`
    /// to [1, total_pages].
    pub async fn page(&self, day: Option<&str>, page: u32, per_page: u32) -> Result<Page> {
        let per_page = per_page.clamp(1, MAX_PER_PAGE);

        let total: i64 = match day {
            Some(d) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM positions WHERE day = ?")
                    .bind(d)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM positions")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        let total_pages = total_pages(total, per_page);
        let page = page.clamp(1, total_pages);
        let offset = (page as i64 - 1) * per_page as i64;

        let rows: Vec<SampleRow> = match day {
            Some(d) => {
                sqlx::query_as(&format!(
                    "SELECT {SAMPLE_COLUMNS} FROM positions WHERE day = ? \
                     ORDER BY observed_at DESC, id DESC LIMIT ? OFFSET ?"
                ))
                .bind(d)
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {SAMPLE_COLUMNS} FROM positions \
                     ORDER BY observed_at DESC, id DESC LIMIT ? OFFSET ?"
                ))
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(Page {
            records: rows.into_iter().map(sample_from).collect(),
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Full listing for CSV export, ascending by time, optionally
    /// restricted to one day bucket.
    pub async fn export(&self, day: Option<&str>) -> Result<Vec<PositionSample>> {
        let rows: Vec<SampleRow> = match day {
            Some(d) => {
                sqlx::query_as(&format!(
                    "SELECT {SAMPLE_COLUMNS} FROM positions WHERE day = ? \
                     ORDER BY observed_at ASC, id ASC"
                ))
                .bind(d)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT {SAMPLE_COLUMNS} FROM positions ORDER BY observed_at ASC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(sample_from).collect())
    }

    /// Distinct day buckets with data, ascending.
    pub async fn distinct_days(&self) -> Result<Vec<String>> {
        let days = sqlx::query_scalar("SELECT DISTINCT day FROM positions ORDER BY day ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(days)
    }

    /// Per-day record counts with first/last observation times, ascending
    /// by day.
    pub async fn day_summaries(&self) -> Result<Vec<DaySummary>> {
        let rows: Vec<(String, i64, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT day, COUNT(*), MIN(observed_at), MAX(observed_at) \
             FROM positions GROUP BY day ORDER BY day ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(day, record_count, first_record, last_record)| DaySummary {
                day,
                record_count,
                first_record,
                last_record,
            })
            .collect())
    }

    /// Record count per day bucket.
    pub async fn count_by_day(&self) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT day, COUNT(*) FROM positions GROUP BY day")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }

    /// Total number of stored samples.
    pub async fn count(&self) -> Result<i64> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM positions")
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    /// Delete samples with `observed_at < cutoff`; returns the number
    /// removed. Idempotent.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM positions WHERE observed_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

fn total_pages(total: i64, per_page: u32) -> u32 {
    let per_page = per_page as i64;
    std::cmp::max(1, (total + per_page - 1) / per_page) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn obs(observed_at: DateTime<Utc>) -> Observation {
        Observation {
            latitude: 10.0,
            longitude: 20.0,
            altitude: Some(408.0),
            velocity: Some(27500.0),
            observed_at,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn total_pages_rounds_up_with_floor_of_one() {
        assert_eq!(total_pages(0, 5), 1);
        assert_eq!(total_pages(5, 5), 1);
        assert_eq!(total_pages(13, 5), 3);
        assert_eq!(total_pages(15, 5), 3);
        assert_eq!(total_pages(16, 5), 4);
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids_and_day_bucket() {
        let store = PositionStore::in_memory().await.unwrap();

        let first = store.insert(&obs(at(2025, 8, 1, 10, 0, 0))).await.unwrap();
        let second = store.insert(&obs(at(2025, 8, 1, 10, 0, 10))).await.unwrap();
        assert!(second > first);

        // Out-of-order arrival still gets a fresh, higher id
        let third = store.insert(&obs(at(2025, 7, 31, 23, 59, 59))).await.unwrap();
        assert!(third > second);

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.id, third);
        assert_eq!(latest.day, "2025-07-31");
        assert_eq!(latest.observed_at, at(2025, 7, 31, 23, 59, 59));
    }

    #[tokio::test]
    async fn latest_is_none_on_empty_store() {
        let store = PositionStore::in_memory().await.unwrap();
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn range_is_ascending_and_bounded() {
        let store = PositionStore::in_memory().await.unwrap();
        for hour in [12, 10, 14, 8] {
            store.insert(&obs(at(2025, 8, 1, hour, 0, 0))).await.unwrap();
        }

        let samples = store
            .range(at(2025, 8, 1, 9, 0, 0), at(2025, 8, 1, 13, 0, 0))
            .await
            .unwrap();

        let hours: Vec<u32> = samples
            .iter()
            .map(|s| chrono::Timelike::hour(&s.observed_at))
            .collect();
        assert_eq!(hours, vec![10, 12]);
    }

    #[tokio::test]
    async fn page_clamps_page_and_per_page() {
        let store = PositionStore::in_memory().await.unwrap();
        for i in 0..13 {
            store.insert(&obs(at(2025, 8, 1, 0, i, 0))).await.unwrap();
        }

        let page = store.page(None, 1, 5).await.unwrap();
        assert_eq!(page.total, 13);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.records.len(), 5);

        // Out-of-range page clamps to the last page
        let page = store.page(None, 5, 5).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.records.len(), 3);

        // Zero per_page clamps to 1
        let page = store.page(None, 1, 0).await.unwrap();
        assert_eq!(page.per_page, 1);
        assert_eq!(page.records.len(), 1);

        // Oversized per_page clamps to the ceiling
        let page = store.page(None, 1, 1_000_000).await.unwrap();
        assert_eq!(page.per_page, MAX_PER_PAGE);
    }

    #[tokio::test]
    async fn page_is_descending_most_recent_first() {
        let store = PositionStore::in_memory().await.unwrap();
        for minute in 0..3 {
            store.insert(&obs(at(2025, 8, 1, 0, minute, 0))).await.unwrap();
        }

        let page = store.page(None, 1, 10).await.unwrap();
        let minutes: Vec<u32> = page
            .records
            .iter()
            .map(|s| chrono::Timelike::minute(&s.observed_at))
            .collect();
        assert_eq!(minutes, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn page_with_day_filter() {
        let store = PositionStore::in_memory().await.unwrap();
        for minute in 0..5 {
            store.insert(&obs(at(2025, 11, 1, 0, minute, 0))).await.unwrap();
        }
        for minute in 0..4 {
            store.insert(&obs(at(2025, 11, 2, 0, minute, 0))).await.unwrap();
        }

        let page = store.page(Some("2025-11-01"), 1, 2).await.unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.records.iter().all(|s| s.day == "2025-11-01"));
    }

    #[tokio::test]
    async fn export_is_ascending() {
        let store = PositionStore::in_memory().await.unwrap();
        for minute in [3, 1, 2] {
            store.insert(&obs(at(2025, 8, 1, 0, minute, 0))).await.unwrap();
        }
        store.insert(&obs(at(2025, 8, 2, 0, 0, 0))).await.unwrap();

        let all = store.export(None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].observed_at <= w[1].observed_at));

        let day = store.export(Some("2025-08-01")).await.unwrap();
        assert_eq!(day.len(), 3);
        let minutes: Vec<u32> = day
            .iter()
            .map(|s| chrono::Timelike::minute(&s.observed_at))
            .collect();
        assert_eq!(minutes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn day_buckets_and_counts() {
        let store = PositionStore::in_memory().await.unwrap();
        store.insert(&obs(at(2025, 8, 2, 8, 0, 0))).await.unwrap();
        store.insert(&obs(at(2025, 8, 1, 9, 0, 0))).await.unwrap();
        store.insert(&obs(at(2025, 8, 1, 11, 0, 0))).await.unwrap();

        assert_eq!(
            store.distinct_days().await.unwrap(),
            vec!["2025-08-01".to_string(), "2025-08-02".to_string()]
        );

        let counts = store.count_by_day().await.unwrap();
        assert_eq!(counts.get("2025-08-01"), Some(&2));
        assert_eq!(counts.get("2025-08-02"), Some(&1));

        let summaries = store.day_summaries().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].day, "2025-08-01");
        assert_eq!(summaries[0].record_count, 2);
        assert_eq!(summaries[0].first_record, at(2025, 8, 1, 9, 0, 0));
        assert_eq!(summaries[0].last_record, at(2025, 8, 1, 11, 0, 0));

        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn delete_older_than_is_idempotent() {
        let store = PositionStore::in_memory().await.unwrap();
        let now = at(2025, 8, 25, 12, 0, 0);

        store.insert(&obs(now - Duration::days(4))).await.unwrap();
        store.insert(&obs(now - Duration::hours(1))).await.unwrap();

        let cutoff = now - Duration::days(3);
        assert_eq!(store.delete_older_than(cutoff).await.unwrap(), 1);
        // Second consecutive run with no new data is a no-op
        assert_eq!(store.delete_older_than(cutoff).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pruned_samples_are_gone_from_reads() {
        let store = PositionStore::in_memory().await.unwrap();
        let now = at(2025, 8, 25, 12, 0, 0);
        let window = Duration::days(3);

        let expired = now - window - Duration::days(1);
        store.insert(&obs(expired)).await.unwrap();
        store.insert(&obs(now)).await.unwrap();

        store.delete_older_than(now - window).await.unwrap();

        let ranged = store.range(expired - Duration::days(1), now).await.unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].observed_at, now);

        let page = store.page(None, 1, 100).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.records.iter().all(|s| s.observed_at >= now - window));
    }

    #[tokio::test]
    async fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("satlog.db");

        {
            let store = PositionStore::open(&path).await.unwrap();
            store.insert(&obs(at(2025, 8, 1, 10, 0, 0))).await.unwrap();
        }

        let store = PositionStore::open(&path).await.unwrap();
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.observed_at, at(2025, 8, 1, 10, 0, 0));
    }
}
