//! Named version loader tests against an in-memory iModels service

mod common;

use common::fixtures::{make_changesets, make_named_version, make_version_at};
use common::mock_services::{MockIModels, PageCall};
use std::sync::Arc;
use version_compare::api::IModelsApi;
use version_compare::types::{ComparisonJobStatus, NamedVersion};
use version_compare::versions::{LoaderEvent, LoaderKey, NamedVersionLoader, SessionStore};

fn loader_for(mock: &Arc<MockIModels>, current: &str, page_size: usize) -> NamedVersionLoader {
    let client: Arc<dyn IModelsApi> = mock.clone();
    NamedVersionLoader::new(client, LoaderKey::new("imodel-1", current), page_size)
}

fn version_names(loader: &NamedVersionLoader) -> Vec<String> {
    loader
        .entries()
        .iter()
        .map(|e| e.named_version.named_version.display_name.clone())
        .collect()
}

/// Versions at changesets 1..=count, newest served first
fn versions(count: u64) -> Vec<NamedVersion> {
    (1..=count).map(make_version_at).collect()
}

#[tokio::test]
async fn test_target_is_the_changeset_after_the_version() {
    // C0, C1, C2 with a named version at C1, C2 open
    let changesets = make_changesets(3);
    let version = make_named_version("release", &changesets[1]);
    let mock = Arc::new(MockIModels::new(changesets.clone(), vec![version]));
    let loader = loader_for(&mock, "cs2", 20);

    loader.load().await;
    loader.load_next_page().await;

    let entries = loader.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].named_version.target_changeset_id, changesets[2].id);
    assert!(entries[0].job.is_none());
    assert!(mock.get_changeset_calls().contains(&"2".to_string()));
}

#[tokio::test]
async fn test_synthetic_current_version_until_real_one_appears() {
    let changesets = make_changesets(6);
    let mock = Arc::new(MockIModels::new(changesets.clone(), versions(3)));
    let loader = loader_for(&mock, "cs5", 20);

    assert!(loader.current_named_version().is_none());
    loader.load().await;

    let current = loader.current_named_version().unwrap();
    assert!(current.is_synthetic);
    assert_eq!(current.named_version.changeset_id, "cs5");
    assert_eq!(current.named_version.display_name, "Changeset #5");

    loader.load_next_page().await;
    assert!(loader.current_named_version().unwrap().is_synthetic);
}

#[tokio::test]
async fn test_real_current_version_replaces_synthetic() {
    let changesets = make_changesets(6);
    let mock = Arc::new(MockIModels::new(changesets, versions(5)));
    let loader = loader_for(&mock, "cs5", 20);
    let mut events = loader.subscribe();

    loader.load().await;
    loader.load_next_page().await;

    let current = loader.current_named_version().unwrap();
    assert!(!current.is_synthetic);
    assert_eq!(current.named_version.id, "nv-v5");
    // The open version itself is not a comparison candidate
    assert_eq!(version_names(&loader), vec!["v4", "v3", "v2", "v1"]);

    assert_eq!(
        events.drain(),
        vec![
            LoaderEvent::BaselineLoaded,
            LoaderEvent::CurrentVersionResolved,
            LoaderEvent::PageLoaded { count: 4 },
        ]
    );
}

#[tokio::test]
async fn test_pages_grow_entries_until_short_page() {
    let changesets = make_changesets(7);
    let mock = Arc::new(MockIModels::new(changesets, versions(5)));
    let loader = loader_for(&mock, "cs6", 2);
    loader.load().await;

    let mut sizes = Vec::new();
    let mut has_next = Vec::new();
    while loader.has_next_page() {
        loader.load_next_page().await;
        sizes.push(loader.entries().len());
        has_next.push(loader.has_next_page());
    }

    assert_eq!(sizes, vec![2, 4, 5]);
    assert_eq!(has_next, vec![true, true, false]);
    assert_eq!(version_names(&loader), vec!["v5", "v4", "v3", "v2", "v1"]);
    assert_eq!(
        mock.get_page_calls(),
        vec![
            PageCall { top: 2, skip: 0 },
            PageCall { top: 2, skip: 2 },
            PageCall { top: 2, skip: 4 },
        ]
    );

    // Exhausted: further calls do nothing
    loader.load_next_page().await;
    assert_eq!(mock.get_page_calls().len(), 3);
}

#[tokio::test]
async fn test_empty_page_ends_pagination() {
    let changesets = make_changesets(6);
    let mock = Arc::new(MockIModels::new(changesets, versions(4)));
    let loader = loader_for(&mock, "cs5", 2);
    loader.load().await;

    loader.load_next_page().await;
    loader.load_next_page().await;
    assert!(loader.has_next_page());

    loader.load_next_page().await;
    assert!(!loader.has_next_page());
    assert_eq!(loader.entries().len(), 4);
}

#[tokio::test]
async fn test_load_next_page_while_loading_is_noop() {
    let changesets = make_changesets(4);
    let mock = Arc::new(MockIModels::new(changesets, versions(2)));
    let loader = Arc::new(loader_for(&mock, "cs3", 20));
    loader.load().await;

    let gate = mock.hold_pages();
    let first = tokio::spawn({
        let loader = Arc::clone(&loader);
        async move { loader.load_next_page().await }
    });
    while mock.get_page_calls().is_empty() {
        tokio::task::yield_now().await;
    }
    assert!(loader.snapshot().is_next_page_loading);

    // Second call returns at once without a request
    loader.load_next_page().await;
    assert_eq!(mock.get_page_calls().len(), 1);

    gate.notify_one();
    first.await.unwrap();

    assert_eq!(version_names(&loader), vec!["v2", "v1"]);
    assert!(!loader.snapshot().is_next_page_loading);
}

#[tokio::test]
async fn test_failed_target_lookup_drops_only_that_version() {
    let changesets = make_changesets(5);
    let mock = Arc::new(MockIModels::new(changesets, versions(3)));
    mock.fail_changeset("3");
    let loader = loader_for(&mock, "cs4", 20);

    loader.load().await;
    loader.load_next_page().await;

    assert_eq!(version_names(&loader), vec!["v3", "v1"]);
    assert!(!loader.is_error());
}

#[tokio::test]
async fn test_missing_target_changeset_drops_version() {
    // cs2 was never pushed, so v1 has nothing to compare from
    let mut changesets = make_changesets(4);
    changesets.remove(2);
    let mock = Arc::new(MockIModels::new(changesets, vec![make_version_at(1), make_version_at(2)]));
    let loader = loader_for(&mock, "cs3", 20);

    loader.load().await;
    loader.load_next_page().await;

    assert_eq!(version_names(&loader), vec!["v2"]);
}

#[tokio::test]
async fn test_missing_baseline_is_an_error() {
    let mock = Arc::new(MockIModels::new(make_changesets(3), versions(2)));
    let loader = loader_for(&mock, "cs-unknown", 20);
    let mut events = loader.subscribe();

    loader.load().await;

    let snapshot = loader.snapshot();
    assert!(snapshot.is_error);
    assert!(!snapshot.is_loading);
    assert!(snapshot.current_named_version.is_none());
    assert!(snapshot.last_error.unwrap().contains("cs-unknown"));
    assert!(matches!(events.drain().as_slice(), [LoaderEvent::Error(_)]));

    // No baseline, no paging
    loader.load_next_page().await;
    assert!(mock.get_page_calls().is_empty());
}

#[tokio::test]
async fn test_page_error_sets_error_state() {
    let mock = Arc::new(MockIModels::new(make_changesets(4), versions(2)));
    mock.fail_pages("boom");
    let loader = loader_for(&mock, "cs3", 20);

    loader.load().await;
    loader.load_next_page().await;

    let snapshot = loader.snapshot();
    assert!(snapshot.is_error);
    assert!(snapshot.last_error.unwrap().contains("boom"));
    assert!(snapshot.entries.is_empty());
    assert!(!snapshot.is_next_page_loading);
}

#[tokio::test]
async fn test_successful_page_clears_earlier_error() {
    let mock = Arc::new(MockIModels::new(make_changesets(4), versions(2)));
    mock.fail_pages("flaky");
    let loader = loader_for(&mock, "cs3", 20);
    loader.load().await;

    loader.load_next_page().await;
    assert!(loader.is_error());
    assert!(loader.has_next_page());

    mock.recover_pages();
    loader.load_next_page().await;

    let snapshot = loader.snapshot();
    assert!(!snapshot.is_error);
    assert!(snapshot.last_error.is_none());
    assert_eq!(version_names(&loader), vec!["v2", "v1"]);
    assert_eq!(mock.get_page_calls().len(), 2);
}

#[tokio::test]
async fn test_reset_discards_in_flight_page() {
    let mock = Arc::new(MockIModels::new(make_changesets(6), versions(5)));
    let loader = Arc::new(loader_for(&mock, "cs5", 20));
    loader.load().await;

    let gate = mock.hold_pages();
    let in_flight = tokio::spawn({
        let loader = Arc::clone(&loader);
        async move { loader.load_next_page().await }
    });
    while mock.get_page_calls().is_empty() {
        tokio::task::yield_now().await;
    }

    loader.reset(LoaderKey::new("imodel-1", "cs3"));
    gate.notify_one();
    in_flight.await.unwrap();

    let snapshot = loader.snapshot();
    assert!(snapshot.entries.is_empty());
    assert!(snapshot.current_named_version.is_none());
    assert!(!snapshot.is_error);
    assert_eq!(snapshot.current_page, 0);
    assert_eq!(loader.key().current_changeset_id, "cs3");
}

#[tokio::test]
async fn test_dispose_ignores_later_calls() {
    let mock = Arc::new(MockIModels::new(make_changesets(4), versions(2)));
    let loader = loader_for(&mock, "cs3", 20);

    loader.dispose();
    loader.load().await;
    loader.load_next_page().await;

    assert!(mock.get_changeset_calls().is_empty());
    assert!(loader.current_named_version().is_none());
}

#[tokio::test]
async fn test_job_status_updates_by_version_id() {
    let mock = Arc::new(MockIModels::new(make_changesets(4), versions(2)));
    let loader = loader_for(&mock, "cs3", 20);
    loader.load().await;
    loader.load_next_page().await;

    let queued = ComparisonJobStatus::Queued {
        job_id: "cs2-cs3".to_string(),
    };
    loader.update_job_status("nv-v1", queued.clone());
    loader.mark_failed("nv-v2");

    let entries = loader.entries();
    assert_eq!(
        entries[0].job,
        Some(ComparisonJobStatus::Failed {
            job_id: String::new(),
            error_details: None,
        })
    );
    assert_eq!(entries[1].job, Some(queued));
}

#[tokio::test]
async fn test_session_store_resumes_pagination() {
    let mock = Arc::new(MockIModels::new(make_changesets(6), versions(4)));
    let store = SessionStore::new();
    let key = LoaderKey::new("imodel-1", "cs5");

    let loader = loader_for(&mock, "cs5", 2);
    loader.load().await;
    loader.load_next_page().await;
    loader.save(&store);
    drop(loader);

    let client: Arc<dyn IModelsApi> = mock.clone();
    let resumed = NamedVersionLoader::restore(client, key, 2, &store);
    assert_eq!(version_names(&resumed), vec!["v4", "v3"]);

    // Baseline already known: no second lookup
    let baseline_calls = mock.get_changeset_calls().len();
    resumed.load().await;
    assert_eq!(mock.get_changeset_calls().len(), baseline_calls);

    resumed.load_next_page().await;
    assert_eq!(version_names(&resumed), vec!["v4", "v3", "v2", "v1"]);
    assert_eq!(mock.get_page_calls().last(), Some(&PageCall { top: 2, skip: 2 }));
}
