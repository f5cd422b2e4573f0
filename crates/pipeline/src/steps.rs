//! Orchestrator-facing step payloads.
//!
//! The external scheduler drives the pipeline by invoking these steps and
//! folding each response back into the next request. All suspension between
//! polls, retry ceilings, and cancellation live on the orchestrator's side
//! of this boundary.

use crate::error::PipelineResult;
use crate::ingest::{IngestReport, Ingestor};
use crate::poller::{CompletionStrategy, poll};
use hangar_core::config::{ArtifactConfig, PollConfig};
use hangar_core::{FlightKey, PollState};
use hangar_storage::ObjectStore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Poll step input: the flight key and, after the first invocation, the
/// previous step's state folded back in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollRequest {
    pub key: String,
    #[serde(default)]
    pub state: Option<PollState>,
}

/// Poll step output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollResponse {
    /// The prefix was polled; thread `state` into the next request.
    Polled {
        done: bool,
        state: PollState,
        still_images: u64,
        burst_images: u64,
    },
    /// The key does not denote a flight and was ignored.
    Skipped { key: String, reason: String },
}

/// Ingest step input: the flight key plus the image counts observed during
/// the completion phase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestRequest {
    pub key: String,
    pub still_images: u64,
    pub burst_images: u64,
}

/// Ingest step output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestResponse {
    Ingested {
        gps_rows: u64,
        oo_rows: u64,
        elapsed_seconds: f64,
    },
    /// The key does not denote a flight and was ignored.
    Skipped { key: String, reason: String },
}

fn parse_flight_key(key: &str) -> Result<FlightKey, String> {
    FlightKey::parse(key).map_err(|e| e.to_string())
}

/// Run one completion poll.
pub async fn poll_step(
    store: &dyn ObjectStore,
    artifacts: &ArtifactConfig,
    poll_config: &PollConfig,
    request: &PollRequest,
    now: OffsetDateTime,
) -> PipelineResult<PollResponse> {
    let flight = match parse_flight_key(&request.key) {
        Ok(flight) => flight,
        Err(reason) => {
            tracing::info!(key = %request.key, reason = %reason, "Ignoring non-flight key");
            return Ok(PollResponse::Skipped {
                key: request.key.clone(),
                reason,
            });
        }
    };

    let strategy = CompletionStrategy::from_config(poll_config);
    let outcome = poll(
        store,
        &flight,
        artifacts,
        request.state.as_ref(),
        strategy,
        now,
    )
    .await?;

    Ok(PollResponse::Polled {
        done: outcome.done,
        state: outcome.state,
        still_images: outcome.counts.still_images,
        burst_images: outcome.counts.burst_images,
    })
}

/// Run one ingestion transaction.
pub async fn ingest_step(
    ingestor: &Ingestor,
    request: &IngestRequest,
) -> PipelineResult<IngestResponse> {
    let flight = match parse_flight_key(&request.key) {
        Ok(flight) => flight,
        Err(reason) => {
            tracing::info!(key = %request.key, reason = %reason, "Ignoring non-flight key");
            return Ok(IngestResponse::Skipped {
                key: request.key.clone(),
                reason,
            });
        }
    };

    let IngestReport {
        gps_rows,
        oo_rows,
        elapsed_seconds,
    } = ingestor
        .ingest(&flight, request.still_images, request.burst_images)
        .await?;

    Ok(IngestResponse::Ingested {
        gps_rows,
        oo_rows,
        elapsed_seconds,
    })
}
