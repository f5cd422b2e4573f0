//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::Duration;

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Object storage the flight uploads land in.
    pub storage: StorageConfig,
    /// Relational store the parsed readings are committed to.
    pub metadata: MetadataConfig,
    /// Table and column identifiers in the relational store.
    #[serde(default)]
    pub tables: TableConfig,
    /// Artifact naming under a flight prefix.
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    /// Completion polling behavior.
    #[serde(default)]
    pub poll: PollConfig,
    /// External parser invocation.
    pub parsers: ParserConfig,
    /// Consistency-check tolerances.
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

/// PostgreSQL SSL mode.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    Disable,
    Prefer,
    Require,
}

/// Object storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region (default: us-east-1).
        region: Option<String>,
        /// Explicit credentials; when absent the ambient AWS chain is used.
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        /// Use path-style URLs instead of virtual-hosted style. Required for
        /// MinIO and some S3-compatible services.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl StorageConfig {
    /// Validate the configuration before constructing a backend.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 config requires a bucket".to_string());
                }
                if access_key_id.is_some() ^ secret_access_key.is_some() {
                    return Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    );
                }
                Ok(())
            }
        }
    }
}

/// Relational store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite file store. Recommended for tests and single-host deployments.
    Sqlite { path: PathBuf },
    /// PostgreSQL store.
    Postgres {
        /// Full connection URL; takes precedence over individual parameters.
        url: Option<String>,
        host: Option<String>,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        database: Option<String>,
        ssl_mode: Option<PgSslMode>,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_max_connections() -> u32 {
    5
}

/// Table and column identifiers for the relational store.
///
/// The OO table's two domain columns and the lookup table's two locator
/// columns are deployment-specific, so they are configuration rather than
/// schema constants. Identifiers are validated before use.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_oo_table")]
    pub oo_table: String,
    #[serde(default = "default_oo_column_1")]
    pub oo_column_1: String,
    #[serde(default = "default_oo_column_2")]
    pub oo_column_2: String,
    #[serde(default = "default_locator_column_1")]
    pub locator_column_1: String,
    #[serde(default = "default_locator_column_2")]
    pub locator_column_2: String,
}

fn default_oo_table() -> String {
    "oo_readings".to_string()
}

fn default_oo_column_1() -> String {
    "channel_a".to_string()
}

fn default_oo_column_2() -> String {
    "channel_b".to_string()
}

fn default_locator_column_1() -> String {
    "raw_locator".to_string()
}

fn default_locator_column_2() -> String {
    "processed_locator".to_string()
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            oo_table: default_oo_table(),
            oo_column_1: default_oo_column_1(),
            oo_column_2: default_oo_column_2(),
            locator_column_1: default_locator_column_1(),
            locator_column_2: default_locator_column_2(),
        }
    }
}

/// Artifact naming conventions under a flight prefix.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Relative name prefix of the GPS track log.
    #[serde(default = "default_gps_prefix")]
    pub gps_prefix: String,
    /// Relative name of the OO instrument log.
    #[serde(default = "default_oo_file")]
    pub oo_file: String,
    /// Substring identifying still-camera frames.
    #[serde(default = "default_still_image_marker")]
    pub still_image_marker: String,
    /// Substring identifying burst-camera frames.
    #[serde(default = "default_burst_image_marker")]
    pub burst_image_marker: String,
    /// Base URI recorded as the raw-upload locator (e.g. `s3://raw-flights`).
    pub raw_locator_base: Option<String>,
    /// Base URI recorded as the processed-copy locator.
    pub processed_locator_base: Option<String>,
}

fn default_gps_prefix() -> String {
    "gps".to_string()
}

fn default_oo_file() -> String {
    "oo_data.raw".to_string()
}

fn default_still_image_marker() -> String {
    "still/".to_string()
}

fn default_burst_image_marker() -> String {
    "burst/".to_string()
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            gps_prefix: default_gps_prefix(),
            oo_file: default_oo_file(),
            still_image_marker: default_still_image_marker(),
            burst_image_marker: default_burst_image_marker(),
            raw_locator_base: None,
            processed_locator_base: None,
        }
    }
}

/// Which rule decides that an upload is complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollStrategyConfig {
    /// Done once no object has appeared within the staleness window.
    Quiescence,
    /// Done once the observed count equals the threaded-in expected count.
    ExpectedCount,
}

/// Completion polling configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_strategy")]
    pub strategy: PollStrategyConfig,
    /// Listing inactivity after which an upload is presumed complete.
    #[serde(default = "default_staleness_window_secs")]
    pub staleness_window_secs: u64,
}

fn default_poll_strategy() -> PollStrategyConfig {
    PollStrategyConfig::Quiescence
}

fn default_staleness_window_secs() -> u64 {
    60
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            strategy: default_poll_strategy(),
            staleness_window_secs: default_staleness_window_secs(),
        }
    }
}

impl PollConfig {
    /// Get the staleness window as a Duration.
    pub fn staleness_window(&self) -> Duration {
        // Saturate at i64::MAX to prevent overflow wrapping to negative.
        let secs = i64::try_from(self.staleness_window_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }
}

/// External parser invocation configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Executable converting an OO log into an index file plus per-sample
    /// artifacts. Invoked as `<oo_command> <input> <output-dir>`.
    pub oo_command: PathBuf,
    /// Executable converting a GPS log into tabular rows. Invoked as
    /// `<gps_command> <input>`; writes `<input>.csv`.
    pub gps_command: PathBuf,
    /// Scratch directory root for downloads and parser output. A fresh
    /// subdirectory is created per ingestion and removed with it.
    pub scratch_dir: Option<PathBuf>,
}

/// Absolute tolerances for the consistency checks.
///
/// Thresholds are data, not inline literals, so each check stays
/// independently testable and tunable per deployment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_count_tolerance")]
    pub gps_tolerance: f64,
    #[serde(default = "default_count_tolerance")]
    pub oo_tolerance: f64,
    #[serde(default = "default_count_tolerance")]
    pub still_image_tolerance: f64,
    #[serde(default = "default_burst_tolerance")]
    pub burst_image_tolerance: f64,
}

fn default_count_tolerance() -> f64 {
    1000.0
}

fn default_burst_tolerance() -> f64 {
    10_000.0
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            gps_tolerance: default_count_tolerance(),
            oo_tolerance: default_count_tolerance(),
            still_image_tolerance: default_count_tolerance(),
            burst_image_tolerance: default_burst_tolerance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_config_rejects_partial_credentials() {
        let config = StorageConfig::S3 {
            bucket: "flights".to_string(),
            endpoint: None,
            region: None,
            access_key_id: Some("access".to_string()),
            secret_access_key: None,
            force_path_style: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn poll_config_defaults() {
        let config = PollConfig::default();
        assert_eq!(config.strategy, PollStrategyConfig::Quiescence);
        assert_eq!(config.staleness_window(), Duration::seconds(60));
    }

    #[test]
    fn thresholds_have_sane_defaults() {
        let t = ThresholdsConfig::default();
        assert_eq!(t.gps_tolerance, 1000.0);
        assert_eq!(t.oo_tolerance, 1000.0);
        assert_eq!(t.still_image_tolerance, 1000.0);
        assert_eq!(t.burst_image_tolerance, 10_000.0);
    }
}
