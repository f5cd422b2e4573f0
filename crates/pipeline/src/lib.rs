//! Upload-completion detection and ingestion pipeline for hangar.
//!
//! This crate is the pipeline's decision core:
//! - [`poller`]: decides when an in-progress, multi-file upload is finished,
//!   aggregating counts and timestamps over paginated listings
//! - [`validate`]: the cross-source consistency checks that gate commit
//! - [`ingest`]: the single-transaction ingestion of a completed flight
//! - [`parsers`]: external parser invocation and output readers
//! - [`steps`]: the payloads exchanged with the external orchestrator
//!
//! Each component executes as one synchronous call per invocation. Nothing
//! here sleeps, retries, or caches between invocations; continuity is the
//! orchestrator's job, threaded through [`hangar_core::PollState`].

pub mod error;
pub mod ingest;
pub mod parsers;
pub mod poller;
pub mod steps;
pub mod validate;

pub use error::{PipelineError, PipelineResult};
pub use ingest::{IngestReport, Ingestor};
pub use poller::{CompletionStrategy, PollOutcome, poll};
pub use steps::{IngestRequest, IngestResponse, PollRequest, PollResponse, ingest_step, poll_step};
pub use validate::{BURST_FRAME_RATE_HZ, ConsistencyCheck, ConsistencyFailure, validate};
