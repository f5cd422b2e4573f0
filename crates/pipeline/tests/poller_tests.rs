//! Completion poller behavior over paginated listings.

mod common;

use common::{FailingStore, MemoryStore};
use hangar_core::config::{ArtifactConfig, PollConfig, PollStrategyConfig};
use hangar_core::{FlightKey, PollState};
use hangar_pipeline::poller::{CompletionStrategy, poll};
use hangar_pipeline::{PipelineError, PollRequest, PollResponse, poll_step};
use time::{Duration, OffsetDateTime};

fn flight() -> FlightKey {
    FlightKey::parse("2020-03-03/ABCD/").unwrap()
}

fn artifacts() -> ArtifactConfig {
    ArtifactConfig::default()
}

fn now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_583_229_600).unwrap()
}

fn quiescence(window_secs: i64) -> CompletionStrategy {
    CompletionStrategy::Quiescence {
        staleness_window: Duration::seconds(window_secs),
    }
}

/// Populate a store with n still-image frames, the newest `newest_age_secs`
/// before `now()` and the rest a second older each.
fn store_with_frames(page_size: usize, n: usize, newest_age_secs: i64) -> MemoryStore {
    let store = MemoryStore::new(page_size);
    for i in 0..n {
        let age = newest_age_secs + (n - 1 - i) as i64;
        store.put(
            &format!("2020-03-03/ABCD/still/frame_{i:04}.jpg"),
            b"jpeg",
            Some(now() - Duration::seconds(age)),
        );
    }
    store
}

#[tokio::test]
async fn aggregates_across_all_pages() {
    // 7 objects at page size 2: four pages, strictly token-ordered.
    let store = store_with_frames(2, 7, 30);
    let outcome = poll(&store, &flight(), &artifacts(), None, quiescence(60), now())
        .await
        .unwrap();

    assert_eq!(outcome.state.observed_count, 7);
    assert_eq!(outcome.counts.still_images, 7);
    // Latest-modified is the maximum across all pages, not the last page's.
    assert_eq!(
        outcome.state.latest_modified_at,
        Some(now() - Duration::seconds(30))
    );
}

#[tokio::test]
async fn quiescent_upload_is_done() {
    // Newest object is older than the staleness window.
    let store = store_with_frames(100, 3, 61);
    let outcome = poll(&store, &flight(), &artifacts(), None, quiescence(60), now())
        .await
        .unwrap();

    assert!(outcome.done);
    assert_eq!(outcome.state.retries, 1);
}

#[tokio::test]
async fn recently_modified_upload_is_not_done_and_increments_retries() {
    // Newest object arrived half a window ago.
    let store = store_with_frames(100, 3, 30);
    let prior = PollState {
        expected_count: None,
        retries: 4,
        observed_count: 2,
        latest_modified_at: None,
    };
    let outcome = poll(
        &store,
        &flight(),
        &artifacts(),
        Some(&prior),
        quiescence(60),
        now(),
    )
    .await
    .unwrap();

    assert!(!outcome.done);
    assert_eq!(outcome.state.retries, 5);
}

#[tokio::test]
async fn age_exactly_at_window_is_not_yet_quiescent() {
    // The rule is strict: done only when now - latest > window.
    let store = store_with_frames(100, 1, 60);
    let outcome = poll(&store, &flight(), &artifacts(), None, quiescence(60), now())
        .await
        .unwrap();
    assert!(!outcome.done);
}

#[tokio::test]
async fn zero_objects_is_never_done() {
    let store = MemoryStore::new(100);
    let outcome = poll(&store, &flight(), &artifacts(), None, quiescence(60), now())
        .await
        .unwrap();

    assert!(!outcome.done);
    assert_eq!(outcome.state.observed_count, 0);
    assert_eq!(outcome.state.latest_modified_at, None);
}

#[tokio::test]
async fn expected_count_matches_prior_observation() {
    let store = store_with_frames(2, 5, 1);

    // First poll: nothing threaded in yet, so not done; the observation
    // becomes the next target.
    let first = poll(
        &store,
        &flight(),
        &artifacts(),
        None,
        CompletionStrategy::ExpectedCount,
        now(),
    )
    .await
    .unwrap();
    assert!(!first.done);
    assert_eq!(first.state.expected_count, Some(5));

    // Second poll with an unchanged listing: counts agree, upload finished.
    let second = poll(
        &store,
        &flight(),
        &artifacts(),
        Some(&first.state),
        CompletionStrategy::ExpectedCount,
        now(),
    )
    .await
    .unwrap();
    assert!(second.done);
    assert_eq!(second.state.retries, 2);

    // A listing that grew in between does not finish.
    store.put(
        "2020-03-03/ABCD/still/frame_9999.jpg",
        b"jpeg",
        Some(now()),
    );
    let third = poll(
        &store,
        &flight(),
        &artifacts(),
        Some(&first.state),
        CompletionStrategy::ExpectedCount,
        now(),
    )
    .await
    .unwrap();
    assert!(!third.done);
}

#[tokio::test]
async fn expected_count_zero_never_finishes() {
    let store = MemoryStore::new(100);
    let prior = PollState {
        expected_count: Some(0),
        retries: 1,
        observed_count: 0,
        latest_modified_at: None,
    };
    let outcome = poll(
        &store,
        &flight(),
        &artifacts(),
        Some(&prior),
        CompletionStrategy::ExpectedCount,
        now(),
    )
    .await
    .unwrap();
    assert!(!outcome.done);
}

#[tokio::test]
async fn listing_failure_propagates_as_infrastructure() {
    let err = poll(
        &FailingStore,
        &flight(),
        &artifacts(),
        None,
        quiescence(60),
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PipelineError::Infrastructure(_)));
}

#[tokio::test]
async fn poll_step_skips_non_flight_keys() {
    let store = MemoryStore::new(100);
    let request = PollRequest {
        key: "2020-03-03/AB12/".to_string(),
        state: None,
    };
    let response = poll_step(&store, &artifacts(), &PollConfig::default(), &request, now())
        .await
        .unwrap();
    assert!(matches!(response, PollResponse::Skipped { .. }));
}

#[tokio::test]
async fn poll_step_reports_image_counts() {
    let store = store_with_frames(100, 4, 120);
    store.put("2020-03-03/ABCD/burst/frame_0000.jpg", b"jpeg", Some(now()));
    store.put("2020-03-03/ABCD/gps_0001.log", b"nmea", Some(now()));

    let request = PollRequest {
        key: "2020-03-03/ABCD/".to_string(),
        state: None,
    };
    let response = poll_step(&store, &artifacts(), &PollConfig::default(), &request, now())
        .await
        .unwrap();

    match response {
        PollResponse::Polled {
            done,
            state,
            still_images,
            burst_images,
        } => {
            // The burst frame just arrived, so the upload is still active.
            assert!(!done);
            assert_eq!(state.observed_count, 6);
            assert_eq!(still_images, 4);
            assert_eq!(burst_images, 1);
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn strategy_selection_follows_config() {
    let config = PollConfig {
        strategy: PollStrategyConfig::ExpectedCount,
        staleness_window_secs: 60,
    };
    assert_eq!(
        CompletionStrategy::from_config(&config),
        CompletionStrategy::ExpectedCount
    );
    assert_eq!(
        CompletionStrategy::from_config(&PollConfig::default()),
        CompletionStrategy::Quiescence {
            staleness_window: Duration::seconds(60)
        }
    );
}
