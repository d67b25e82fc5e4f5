//! Directory cache freshness, conditional fetch and pagination.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{ctx, Behaviour, FakeCalendarSource, Harness};
use whenis_core::RefreshOutcome;
use whenis_domain::{CalendarRef, EventFilter};

fn directory_of(count: usize) -> FakeCalendarSource {
    (0..count).fold(FakeCalendarSource::new(), |source, i| {
        source.with_calendar(&format!("cal-{i}"), &format!("Calendar {i}"), Behaviour::Hang)
    })
}

#[tokio::test]
async fn refreshes_within_the_interval_fetch_once() {
    let harness = Harness::new(directory_of(1));

    harness.directory.ids().await.unwrap();
    harness.clock.advance(Duration::from_secs(120));
    harness.directory.ids().await.unwrap();
    assert_eq!(harness.directory.refresh().await.unwrap(), RefreshOutcome::Fresh);

    assert_eq!(harness.source.directory_calls(), 1);
}

#[tokio::test]
async fn not_modified_keeps_the_same_snapshot() {
    let harness = Harness::new(directory_of(3));
    harness.directory.ids().await.unwrap();
    let before = harness.directory.snapshot().await;

    harness.clock.advance(Duration::from_secs(301));
    assert_eq!(harness.directory.refresh().await.unwrap(), RefreshOutcome::NotModified);

    assert!(Arc::ptr_eq(&before, &harness.directory.snapshot().await));
}

#[tokio::test]
async fn every_page_is_read() {
    // Harness pages the directory two entries at a time.
    let harness = Harness::new(directory_of(5));

    let ids = harness.directory.ids().await.unwrap();

    assert_eq!(ids, vec!["cal-0", "cal-1", "cal-2", "cal-3", "cal-4"]);
    assert_eq!(harness.source.directory_calls(), 3);
}

#[tokio::test]
async fn changed_directory_is_swapped_after_the_interval() {
    let harness = Harness::new(directory_of(2));
    harness.directory.ids().await.unwrap();

    harness.source.set_calendars(vec![CalendarRef::new("new@group", "New")], "etag-2");
    assert_eq!(harness.directory.ids().await.unwrap(), vec!["cal-0", "cal-1"]);

    harness.clock.advance(Duration::from_secs(300));
    assert_eq!(harness.directory.ids().await.unwrap(), vec!["new@group"]);
    assert_eq!(
        harness.directory.snapshot().await.change_token.as_deref(),
        Some("etag-2")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_share_one_refresh() {
    let harness = Arc::new(Harness::new(directory_of(4)));

    let readers: Vec<_> = (0..16)
        .map(|_| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move { harness.directory.ids().await.unwrap() })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.await.unwrap().len(), 4);
    }
    // One refresh of two pages.
    assert_eq!(harness.source.directory_calls(), 2);
}

/// Let the spawned refresh reach the source before the caller goes on.
async fn wait_for_directory_calls(harness: &Harness, calls: usize) {
    while harness.source.directory_calls() < calls {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn slow_refresh_does_not_delay_readers_of_a_fresh_cache() {
    let harness = Arc::new(Harness::new(directory_of(2)));
    harness.directory.ids().await.unwrap();
    let calls = harness.source.directory_calls();

    harness.source.set_calendars(vec![CalendarRef::new("new@group", "New")], "etag-2");
    harness.source.set_directory_delay(Duration::from_secs(60));
    let background = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.directory.force_refresh().await })
    };
    wait_for_directory_calls(&harness, calls + 1).await;

    let ids = tokio::time::timeout(Duration::from_millis(50), harness.directory.ids())
        .await
        .expect("reader waited on the refresh")
        .unwrap();
    assert_eq!(ids, vec!["cal-0", "cal-1"]);

    // A query under a short deadline reaches its calendars instead of
    // timing out on the directory.
    harness.source.set_behaviour("cal-0", Behaviour::Events(Vec::new()));
    let result = harness
        .engine
        .query_all(&EventFilter::new(5), None, &ctx(Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].calendar_id, "cal-1");

    assert_eq!(background.await.unwrap().unwrap(), RefreshOutcome::Replaced(1));
    assert_eq!(harness.directory.ids().await.unwrap(), vec!["new@group"]);
}

#[tokio::test(start_paused = true)]
async fn due_reader_serves_current_snapshot_while_another_refresh_runs() {
    let harness = Arc::new(Harness::new(directory_of(2)));
    harness.directory.ids().await.unwrap();
    let calls = harness.source.directory_calls();

    harness.clock.advance(Duration::from_secs(301));
    harness.source.set_calendars(vec![CalendarRef::new("new@group", "New")], "etag-2");
    harness.source.set_directory_delay(Duration::from_secs(60));
    let background = {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move { harness.directory.refresh().await })
    };
    wait_for_directory_calls(&harness, calls + 1).await;

    let ids = tokio::time::timeout(Duration::from_millis(50), harness.directory.ids())
        .await
        .expect("reader waited on the refresh")
        .unwrap();
    assert_eq!(ids, vec!["cal-0", "cal-1"]);
    // The reader did not start a refresh of its own.
    assert_eq!(harness.source.directory_calls(), calls + 1);

    assert_eq!(background.await.unwrap().unwrap(), RefreshOutcome::Replaced(1));
}
