//! Upload-completion polling over paginated object listings.

use crate::error::PipelineResult;
use hangar_core::config::{ArtifactConfig, PollConfig, PollStrategyConfig};
use hangar_core::{FileTypeCounts, FlightKey, PollState};
use hangar_storage::ObjectStore;
use time::{Duration, OffsetDateTime};

/// Which rule decides that an upload is finished.
///
/// The two rules coexist in different deployment variants and are selected
/// per deployment, not unified: quiescence serves uploads of unknown size,
/// the expected-count rule serves pipelines where an earlier step computed a
/// target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionStrategy {
    /// Finished once no object has appeared within the staleness window.
    Quiescence { staleness_window: Duration },
    /// Finished once the observed count equals the count threaded in from
    /// the previous step's state.
    ExpectedCount,
}

impl CompletionStrategy {
    pub fn from_config(config: &PollConfig) -> Self {
        match config.strategy {
            PollStrategyConfig::Quiescence => CompletionStrategy::Quiescence {
                staleness_window: config.staleness_window(),
            },
            PollStrategyConfig::ExpectedCount => CompletionStrategy::ExpectedCount,
        }
    }
}

/// The result of one poll invocation.
#[derive(Clone, Debug)]
pub struct PollOutcome {
    /// Whether the upload is considered finished.
    pub done: bool,
    /// Replacement state for the orchestrator to thread into the next poll.
    pub state: PollState,
    /// Per-category counts over the full listing. The image counts feed the
    /// ingestion step once polling finishes.
    pub counts: FileTypeCounts,
}

/// Poll a flight prefix once.
///
/// Lists every page under the prefix, strictly in the order continuation
/// tokens are issued, and aggregates the total object count, the most recent
/// last-modified timestamp, and the per-category counts. No listing state is
/// cached between invocations; continuity lives entirely in the returned
/// [`PollState`].
///
/// An upload with zero observed objects is never reported done, under either
/// strategy: an empty prefix is a pending upload, not a finished one.
pub async fn poll(
    store: &dyn ObjectStore,
    flight: &FlightKey,
    artifacts: &ArtifactConfig,
    prior: Option<&PollState>,
    strategy: CompletionStrategy,
    now: OffsetDateTime,
) -> PipelineResult<PollOutcome> {
    let mut observed: u64 = 0;
    let mut latest_modified: Option<OffsetDateTime> = None;
    let mut counts = FileTypeCounts::default();
    let mut token: Option<String> = None;
    let mut pages: u32 = 0;

    loop {
        let page = store.list_page(flight.as_str(), token.as_deref()).await?;
        pages += 1;
        for entry in &page.entries {
            observed += 1;
            counts.record(flight, &entry.key, artifacts);
            if let Some(modified) = entry.last_modified
                && latest_modified.is_none_or(|latest| modified > latest)
            {
                latest_modified = Some(modified);
            }
        }
        if !page.truncated {
            break;
        }
        token = page.next_token;
    }

    let done = observed > 0
        && match strategy {
            CompletionStrategy::Quiescence { staleness_window } => latest_modified
                .is_some_and(|latest| now - latest > staleness_window),
            CompletionStrategy::ExpectedCount => prior
                .and_then(|state| state.expected_count)
                .is_some_and(|expected| expected == observed),
        };

    // Under the expected-count rule the current observation becomes the next
    // invocation's target, so the upload counts as finished once two
    // consecutive listings agree. Quiescence passes any threaded target
    // through untouched.
    let expected_count = match strategy {
        CompletionStrategy::ExpectedCount => Some(observed),
        CompletionStrategy::Quiescence { .. } => prior.and_then(|state| state.expected_count),
    };

    let state = PollState {
        expected_count,
        retries: PollState::next_retries(prior),
        observed_count: observed,
        latest_modified_at: latest_modified,
    };

    tracing::info!(
        flight = %flight,
        observed = observed,
        pages = pages,
        done = done,
        retries = state.retries,
        latest_modified = ?latest_modified,
        "Polled flight upload"
    );

    Ok(PollOutcome { done, state, counts })
}
