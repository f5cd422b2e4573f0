//! The ingestion transaction: download, parse, stage, validate, commit.

use crate::error::{PipelineError, PipelineResult};
use crate::parsers::{GpsParser, OoParser, gps_csv_path, read_gps_output, read_oo_output};
use crate::validate::validate;
use hangar_core::config::{ArtifactConfig, ThresholdsConfig};
use hangar_core::reading::gps_span_seconds;
use hangar_core::{FileTypeCounts, FlightKey};
use hangar_metadata::FlightDb;
use hangar_storage::{ObjectStore, ObjectStoreExt, StorageError};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// What a successful ingestion committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IngestReport {
    pub gps_rows: u64,
    pub oo_rows: u64,
    pub elapsed_seconds: f64,
}

/// Runs one ingestion transaction per completed flight upload.
pub struct Ingestor {
    store: Arc<dyn ObjectStore>,
    db: Arc<dyn FlightDb>,
    oo_parser: Arc<dyn OoParser>,
    gps_parser: Arc<dyn GpsParser>,
    artifacts: ArtifactConfig,
    thresholds: ThresholdsConfig,
    scratch_root: Option<PathBuf>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        db: Arc<dyn FlightDb>,
        oo_parser: Arc<dyn OoParser>,
        gps_parser: Arc<dyn GpsParser>,
        artifacts: ArtifactConfig,
        thresholds: ThresholdsConfig,
        scratch_root: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            db,
            oo_parser,
            gps_parser,
            artifacts,
            thresholds,
            scratch_root,
        }
    }

    /// Ingest one flight, committing its readings and lookup row atomically.
    ///
    /// Invoked once after the poller reports the upload finished. The image
    /// counts come from the completion-phase listing; they are not re-derived
    /// here. Every row staged along the way becomes durable only if the
    /// single commit at the end succeeds; any failure before that point
    /// abandons the open transaction with the store untouched.
    pub async fn ingest(
        &self,
        flight: &FlightKey,
        still_images: u64,
        burst_images: u64,
    ) -> PipelineResult<IngestReport> {
        // The poller already confirmed presence, but the transaction defends
        // against missing artifacts independently, naming every absent one.
        // Each artifact is the lexicographically first match of its pattern.
        let gps_pattern = flight.object_key(&self.artifacts.gps_prefix);
        let oo_pattern = flight.object_key(&self.artifacts.oo_file);

        let gps_key = self.store.first_key_with_prefix(&gps_pattern).await?;
        let oo_key = self.store.first_key_with_prefix(&oo_pattern).await?;

        let mut missing = Vec::new();
        if gps_key.is_none() {
            missing.push(format!("{gps_pattern}*"));
        }
        if oo_key.is_none() {
            missing.push(oo_pattern);
        }
        let (Some(gps_key), Some(oo_key)) = (gps_key, oo_key) else {
            return Err(PipelineError::MissingFile { missing });
        };

        let scratch = self.scratch_dir()?;
        let gps_local = scratch.path().join("gps_track.log");
        let oo_local = scratch.path().join("oo_data.raw");
        self.store.download(&gps_key, &gps_local).await?;
        self.store.download(&oo_key, &oo_local).await?;

        let oo_out = scratch.path().join("oo");
        tokio::fs::create_dir_all(&oo_out)
            .await
            .map_err(|e| PipelineError::Infrastructure(StorageError::Io(e)))?;
        self.oo_parser.parse(&oo_local, &oo_out).await?;
        let oo_readings = read_oo_output(&oo_out).await?;

        self.gps_parser.parse(&gps_local).await?;
        let gps_readings = read_gps_output(&gps_csv_path(&gps_local)).await?;

        // One transaction covers every reading and the lookup row. The sink
        // rolls back on drop, so every failure exit below leaves the store
        // untouched.
        let mut sink = self.db.begin().await?;

        for reading in &oo_readings {
            sink.insert_oo(reading).await?;
        }
        for reading in &gps_readings {
            sink.insert_gps(reading).await?;
        }

        let elapsed = gps_span_seconds(&gps_readings);
        let counts = FileTypeCounts {
            gps: gps_readings.len() as u64,
            oo: oo_readings.len() as u64,
            still_images,
            burst_images,
            uncategorized: 0,
        };
        validate(&counts, elapsed, &self.thresholds)?;

        let record = flight.lookup_record(
            self.artifacts.raw_locator_base.as_deref(),
            self.artifacts.processed_locator_base.as_deref(),
        );
        sink.insert_lookup(&record).await?;

        sink.commit().await?;

        let report = IngestReport {
            gps_rows: gps_readings.len() as u64,
            oo_rows: oo_readings.len() as u64,
            elapsed_seconds: elapsed.expect("validated above"),
        };
        tracing::info!(
            flight = %flight,
            gps_rows = report.gps_rows,
            oo_rows = report.oo_rows,
            elapsed_seconds = report.elapsed_seconds,
            "Flight ingested"
        );
        Ok(report)
    }

    fn scratch_dir(&self) -> PipelineResult<TempDir> {
        let builder_result = match &self.scratch_root {
            Some(root) => tempfile::Builder::new().prefix("hangar-ingest-").tempdir_in(root),
            None => tempfile::Builder::new().prefix("hangar-ingest-").tempdir(),
        };
        builder_result.map_err(|e| PipelineError::Infrastructure(StorageError::Io(e)))
    }
}
