//! Orchestrator-facing CLI for the hangar pipeline.
//!
//! Each subcommand runs exactly one pipeline step and prints its JSON
//! response on stdout, so an external scheduler (or an operator) can drive
//! the poll/ingest protocol by feeding each response back into the next
//! invocation. Retry pacing, sleeping between polls, and retry ceilings all
//! live in that scheduler, not here.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use hangar_core::PollState;
use hangar_core::config::AppConfig;
use hangar_pipeline::parsers::{CommandGpsParser, CommandOoParser};
use hangar_pipeline::{IngestRequest, Ingestor, PollRequest, ingest_step, poll_step};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Hangar - flight-sensor upload ingestion pipeline
#[derive(Parser, Debug)]
#[command(name = "hangarctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "HANGAR_CONFIG",
        default_value = "config/hangar.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll a flight prefix once and report whether the upload is finished
    Poll {
        /// Flight key prefix (date/flight-code/)
        #[arg(long)]
        key: String,
        /// Previous poll response's `state` object as JSON; omit on the
        /// first poll
        #[arg(long)]
        state: Option<String>,
    },
    /// Ingest a completed flight upload into the relational store
    Ingest {
        /// Flight key prefix (date/flight-code/)
        #[arg(long)]
        key: String,
        /// Still-image count observed during the completion phase
        #[arg(long)]
        still_images: u64,
        /// Burst-image count observed during the completion phase
        #[arg(long)]
        burst_images: u64,
    },
}

fn load_config(config_path: &str) -> Result<AppConfig> {
    let path = std::path::Path::new(config_path);
    let mut figment = Figment::new();
    let has_config_file = path.exists();

    if has_config_file {
        tracing::info!(config_path = %config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", config_path);
    }

    // Check for HANGAR_ environment variables (excluding HANGAR_CONFIG which
    // is just the path)
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("HANGAR_") && key != "HANGAR_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: hangarctl --config /path/to/config.toml <command>\n  \
             2. Environment variables: HANGAR_STORAGE__TYPE=s3 \
             HANGAR_STORAGE__BUCKET=raw-flights hangarctl <command>\n\n\
             Set HANGAR_CONFIG to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    figment
        .merge(Env::prefixed("HANGAR_").split("__"))
        .extract()
        .context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing. Responses go to stdout, logs to stderr, so the
    // orchestrator can parse the one without the other.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Hangar v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Poll { key, state } => {
            let storage = hangar_storage::from_config(&config.storage)
                .await
                .context("failed to initialize storage")?;

            let state: Option<PollState> = state
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("failed to parse --state JSON")?;

            let request = PollRequest { key, state };
            let response = poll_step(
                storage.as_ref(),
                &config.artifacts,
                &config.poll,
                &request,
                OffsetDateTime::now_utc(),
            )
            .await
            .context("poll step failed")?;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Ingest {
            key,
            still_images,
            burst_images,
        } => {
            let storage = hangar_storage::from_config(&config.storage)
                .await
                .context("failed to initialize storage")?;
            let db = hangar_metadata::from_config(&config.metadata, &config.tables)
                .await
                .context("failed to initialize flight store")?;
            db.health_check()
                .await
                .context("flight store health check failed")?;

            let ingestor = Ingestor::new(
                storage,
                db,
                Arc::new(CommandOoParser::new(&config.parsers.oo_command)),
                Arc::new(CommandGpsParser::new(&config.parsers.gps_command)),
                config.artifacts.clone(),
                config.thresholds,
                config.parsers.scratch_dir.clone(),
            );

            let request = IngestRequest {
                key,
                still_images,
                burst_images,
            };
            let response = ingest_step(&ingestor, &request)
                .await
                .context("ingest step failed")?;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
