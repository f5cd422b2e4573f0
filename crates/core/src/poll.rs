//! Poll state threaded between orchestrator invocations.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// State produced by one completion-poll invocation and consumed verbatim by
/// the next.
///
/// The orchestrator owns the lifecycle: the state is absent on the first
/// poll, replaced wholesale on every subsequent poll, and discarded once the
/// polling phase ends. Nothing is retained inside the pipeline between
/// invocations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollState {
    /// Target object count, when an earlier step computed one. Only consulted
    /// by the expected-count completion strategy.
    #[serde(default)]
    pub expected_count: Option<u64>,
    /// Number of poll invocations so far, including the one that produced
    /// this state. The orchestrator bounds total retries with this; the
    /// poller itself never enforces a ceiling.
    pub retries: u32,
    /// Total objects observed under the prefix on the last listing.
    pub observed_count: u64,
    /// Most recent last-modified timestamp across all observed objects.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub latest_modified_at: Option<OffsetDateTime>,
}

impl PollState {
    /// The retry counter the next poll output must carry: one more than the
    /// prior state's, or 1 when there is no prior state.
    pub fn next_retries(prior: Option<&PollState>) -> u32 {
        match prior {
            Some(state) => state.retries.saturating_add(1),
            None => 1,
        }
    }
}
