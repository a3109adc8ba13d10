// ABOUTME: End-to-end poller runs against scripted fakes: reconcile, drain, promote, abort paths
// ABOUTME: Verifies durable checkpointing per range and the exact page accounting of auth-resume
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use common::{range, ts, window_key, CountingExchange, MemoryStore, Reply, ScriptedTransport};
use pingpoll::{CredentialProvider, Ledger, Poller, RecordSink, RunError};
use std::sync::Arc;

struct Rig {
    transport: Arc<ScriptedTransport>,
    exchange: Arc<CountingExchange>,
    store: Arc<MemoryStore>,
    poller: Poller,
}

fn rig(exchange: CountingExchange) -> Rig {
    let transport = Arc::new(ScriptedTransport::default());
    let exchange = Arc::new(exchange);
    let store = Arc::new(MemoryStore::default());
    let poller = Poller::new(
        transport.clone(),
        CredentialProvider::new(exchange.clone()),
        store.clone(),
        5,
        500,
    );
    Rig {
        transport,
        exchange,
        store,
        poller,
    }
}

async fn seed_requested(store: &MemoryStore, ranges: &[pingpoll::TimeRange]) {
    let mut ledger = Ledger::default();
    for r in ranges {
        ledger.add_requested(*r);
    }
    ledger.persist(store).await.unwrap();
}

async fn stored_ledger(store: &MemoryStore) -> Ledger {
    Ledger::load(store).await.unwrap()
}

#[tokio::test]
async fn run_reconciles_and_drains_from_empty_ledger() {
    let mut rig = rig(CountingExchange::new());
    // Empty ledger + clock 00:07 → the 5-minute window [00:02, 00:07].
    let expected = range("2024-01-01T00:02:00.000Z", "2024-01-01T00:07:00.000Z");
    rig.transport.script(
        &window_key(&expected),
        Reply::Page {
            records: vec![r#"{"id":1}"#],
            next: None,
        },
    );

    let mut sink = RecordSink::new(Vec::new());
    rig.poller
        .run(&mut sink, ts("2024-01-01T00:07:00.000Z"))
        .await
        .unwrap();

    let ledger = stored_ledger(&rig.store).await;
    assert!(ledger.requested().is_empty());
    assert_eq!(ledger.finished(), &[expected]);
    assert_eq!(rig.exchange.calls(), 1);
    assert_eq!(
        String::from_utf8(sink.into_inner()).unwrap(),
        "[{\"id\":1}]\n"
    );
}

#[tokio::test]
async fn auth_resume_refetches_no_pages() {
    let mut rig = rig(CountingExchange::new());
    let r = range("2024-01-01T00:00:00.000Z", "2024-01-01T00:05:00.000Z");
    seed_requested(&rig.store, &[r]).await;

    // Three pages; the page-2 request is rejected once with 401.
    rig.transport.script(
        &window_key(&r),
        Reply::Page {
            records: vec![r#"{"id":1}"#],
            next: Some("https://api.example/page2"),
        },
    );
    rig.transport
        .script("https://api.example/page2", Reply::AuthExpired);
    rig.transport.script(
        "https://api.example/page2",
        Reply::Page {
            records: vec![r#"{"id":2}"#],
            next: Some("https://api.example/page3"),
        },
    );
    rig.transport.script(
        "https://api.example/page3",
        Reply::Page {
            records: vec![r#"{"id":3}"#],
            next: None,
        },
    );

    let mut sink = RecordSink::new(Vec::new());
    // Clock inside the minute the seeded range ends on: nothing new queued.
    rig.poller
        .run(&mut sink, ts("2024-01-01T00:05:20.000Z"))
        .await
        .unwrap();

    // Resumed from the preserved cursor: the range's first page was fetched
    // exactly once and three distinct pages were served.
    assert_eq!(
        rig.transport.requests(),
        vec![
            window_key(&r),
            "https://api.example/page2".to_string(),
            "https://api.example/page2".to_string(),
            "https://api.example/page3".to_string(),
        ]
    );
    assert_eq!(rig.transport.request_count(&window_key(&r)), 1);
    assert_eq!(rig.exchange.calls(), 2);

    let ledger = stored_ledger(&rig.store).await;
    assert_eq!(ledger.finished(), &[r]);
    assert_eq!(
        String::from_utf8(sink.into_inner()).unwrap(),
        "[{\"id\":1},{\"id\":2},{\"id\":3}]\n"
    );
}

#[tokio::test]
async fn fatal_fetch_halts_the_whole_run() {
    let mut rig = rig(CountingExchange::new());
    let first = range("2024-01-01T00:00:00.000Z", "2024-01-01T00:05:00.000Z");
    let second = range("2024-01-01T00:05:00.000Z", "2024-01-01T00:10:00.000Z");
    seed_requested(&rig.store, &[first, second]).await;

    rig.transport.script(&window_key(&first), Reply::Fail);

    let mut sink = RecordSink::new(Vec::new());
    let err = rig
        .poller
        .run(&mut sink, ts("2024-01-01T00:10:40.000Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Fetch { .. }));

    // Nothing promoted, and the second range was never attempted.
    let ledger = stored_ledger(&rig.store).await;
    assert!(ledger.finished().is_empty());
    assert_eq!(ledger.requested(), &[first, second]);
    assert_eq!(rig.transport.request_count(&window_key(&second)), 0);
}

#[tokio::test]
async fn token_failure_aborts_before_any_fetch() {
    let mut rig = rig(CountingExchange::failing());
    let r = range("2024-01-01T00:00:00.000Z", "2024-01-01T00:05:00.000Z");
    seed_requested(&rig.store, &[r]).await;

    let mut sink = RecordSink::new(Vec::new());
    let err = rig
        .poller
        .run(&mut sink, ts("2024-01-01T00:05:15.000Z"))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Auth(_)));
    assert!(rig.transport.requests().is_empty());
    assert!(stored_ledger(&rig.store).await.finished().is_empty());
}

#[tokio::test]
async fn completed_ranges_survive_a_later_abort() {
    let mut rig = rig(CountingExchange::new());
    let first = range("2024-01-01T00:00:00.000Z", "2024-01-01T00:05:00.000Z");
    let second = range("2024-01-01T00:05:00.000Z", "2024-01-01T00:10:00.000Z");
    seed_requested(&rig.store, &[first, second]).await;

    rig.transport.script(
        &window_key(&first),
        Reply::Page {
            records: vec![r#"{"id":1}"#],
            next: None,
        },
    );
    rig.transport.script(&window_key(&second), Reply::Fail);

    let mut sink = RecordSink::new(Vec::new());
    let err = rig
        .poller
        .run(&mut sink, ts("2024-01-01T00:10:05.000Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Fetch { .. }));

    // The first range was durably committed before the abort.
    let ledger = stored_ledger(&rig.store).await;
    assert_eq!(ledger.finished(), &[first]);
    assert_eq!(ledger.requested(), &[second]);
}

#[tokio::test]
async fn rerun_after_success_requests_nothing_new() {
    let mut rig = rig(CountingExchange::new());
    let r = range("2024-01-01T00:02:00.000Z", "2024-01-01T00:07:00.000Z");
    rig.transport.script(
        &window_key(&r),
        Reply::Page {
            records: vec![],
            next: None,
        },
    );

    let now = ts("2024-01-01T00:07:00.000Z");
    let mut sink = RecordSink::new(Vec::new());
    rig.poller.run(&mut sink, now).await.unwrap();
    let after_first = rig.transport.requests().len();

    // Same minute, same ledger: reconcile queues nothing, drain is empty.
    let mut sink = RecordSink::new(Vec::new());
    rig.poller.run(&mut sink, now).await.unwrap();
    assert_eq!(rig.transport.requests().len(), after_first);
    assert!(String::from_utf8(sink.into_inner()).unwrap().is_empty());

    let ledger = stored_ledger(&rig.store).await;
    assert_eq!(ledger.finished(), &[r]);
    assert!(ledger.requested().is_empty());
}
