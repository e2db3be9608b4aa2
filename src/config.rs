//! Environment-driven configuration with documented defaults

use anyhow::{ensure, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_UPSTREAM_URL: &str = "https://api.wheretheiss.at/v1/satellites/25544";

/// Runtime configuration, parsed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream position API endpoint
    pub upstream_url: String,
    /// Acquisition tick period in seconds. Anything under ~1s risks
    /// tripping upstream rate limits; not enforced here.
    pub fetch_interval_secs: u64,
    /// Rolling retention window in days
    pub retention_days: i64,
    /// HTTP bind address
    pub listen_addr: SocketAddr,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Directory holding the dashboard pages
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let upstream_url = env_or("SATLOG_UPSTREAM_URL", DEFAULT_UPSTREAM_URL);

        let fetch_interval_secs: u64 = env_or("SATLOG_FETCH_INTERVAL_SECS", "10")
            .parse()
            .context("invalid SATLOG_FETCH_INTERVAL_SECS")?;
        ensure!(
            fetch_interval_secs > 0,
            "SATLOG_FETCH_INTERVAL_SECS must be non-zero"
        );

        let retention_days = env_or("SATLOG_RETENTION_DAYS", "3")
            .parse()
            .context("invalid SATLOG_RETENTION_DAYS")?;

        let listen_addr = env_or("SATLOG_LISTEN_ADDR", "0.0.0.0:5000")
            .parse()
            .context("invalid SATLOG_LISTEN_ADDR")?;

        let db_path = PathBuf::from(env_or("SATLOG_DB_PATH", "satlog.db"));
        let static_dir = PathBuf::from(env_or("SATLOG_STATIC_DIR", "static"));

        Ok(Self {
            upstream_url,
            fetch_interval_secs,
            retention_days,
            listen_addr,
            db_path,
            static_dir,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
