//! # Engine Tests
//!
//! End-to-end poll cycles against a mock kitchen server.
//!
//! Each test wires a real [`Engine`] to an `httpmock` server, an in-memory
//! printer connection, a recording notifier and an in-memory print surface,
//! then checks what reached the printer and what was acknowledged.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;

use kds_relay::client::{build_http_client, ACK_PATH, POLL_PATH};
use kds_relay::decode::Shape;
use kds_relay::dispatch::Printer;
use kds_relay::notify::{NotifyCall, RecordingNotifier};
use kds_relay::poller::CycleStatus;
use kds_relay::protocol::encode_text;
use kds_relay::settings::{KEY_BASE_URL, KEY_SEEN_ACKED, KEY_SEEN_PRINTED, KEY_VENDOR_PRINTER};
use kds_relay::surface::MemorySurface;
use kds_relay::transport::MemoryConnector;
use kds_relay::{Engine, JobId, PaperWidth, Preferences};

const DISPATCH_BODY: &str = r#"{"Dispatch1": {"SalesOrderSerial":"SO1","InternalDispatchSerial":"D1","BranchName":"Main","Item1":{"ProductName":"Burger","Quantity":2}}}"#;
const MINIMAL_BODY: &str = r#"[{"internaldispatchserial":"X9","content":"Table 4 order"}]"#;

struct Relay {
    engine: Arc<Engine>,
    prefs: Arc<Preferences>,
    connector: MemoryConnector,
    notifier: RecordingNotifier,
    surface: MemorySurface,
}

fn relay(server: &MockServer) -> Relay {
    let prefs = Arc::new(Preferences::in_memory());
    prefs.put(KEY_BASE_URL, server.base_url()).unwrap();
    prefs.put(KEY_VENDOR_PRINTER, false).unwrap();

    let connector = MemoryConnector::new();
    let notifier = RecordingNotifier::new();
    let surface = MemorySurface::new();
    let engine = Engine::new(
        Arc::clone(&prefs),
        build_http_client(false).unwrap(),
        Arc::new(notifier.clone()),
        Printer::new(Arc::new(connector.clone())),
        Arc::new(surface.clone()),
    );

    Relay {
        engine: Arc::new(engine),
        prefs,
        connector,
        notifier,
        surface,
    }
}

fn id(serial: &str) -> JobId {
    JobId::new(serial).unwrap()
}

fn receipt_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ============================================================================
// DISPATCH-KEYED SHAPE
// ============================================================================

#[tokio::test]
async fn test_dispatch_scenario_prints_and_acknowledges() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body(DISPATCH_BODY);
        })
        .await;
    let ack = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(ACK_PATH)
                .body("action=update&internalDispatchSerial=D1");
            then.status(200);
        })
        .await;
    let relay = relay(&server);

    let outcome = relay.engine.run_cycle().await;

    assert_eq!(outcome.status, CycleStatus::Success);
    assert_eq!(outcome.shape, Some(Shape::DispatchKeyed));
    assert_eq!(outcome.received, 1);
    assert_eq!(outcome.discovered, 1);
    assert_eq!(outcome.dispatched, 1);
    assert_eq!(outcome.acknowledged, 1);
    assert_eq!(ack.hits_async().await, 1);

    let receipts = relay.connector.receipts();
    assert_eq!(receipts.len(), 1);
    let text = receipt_text(&receipts[0]);
    assert!(text.contains("Main"));
    assert!(text.contains("Order: SO1   Seq:    Disp: D1"));
    assert!(text.contains("Burger x2"));

    let alerts = relay.notifier.job_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, id("D1"));
    assert_eq!(alerts[0].title, "Main");
    assert_eq!(
        alerts[0].body,
        "Main | Order: SO1   Seq:    Disp: D1 | Burger x2"
    );

    assert!(relay.engine.seen().is_printed(&id("D1")));
    assert!(relay.engine.seen().is_acknowledged(&id("D1")));
}

#[tokio::test]
async fn test_polling_same_job_twice_is_idempotent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body(DISPATCH_BODY);
        })
        .await;
    let ack = server
        .mock_async(|when, then| {
            when.method(POST).path(ACK_PATH);
            then.status(200);
        })
        .await;
    let relay = relay(&server);

    relay.engine.run_cycle().await;
    let second = relay.engine.run_cycle().await;

    assert_eq!(second.received, 1);
    assert_eq!(second.discovered, 0);
    assert_eq!(second.dispatched, 0);
    assert_eq!(second.acknowledged, 0);
    assert_eq!(relay.connector.receipts().len(), 1);
    assert_eq!(relay.notifier.job_alerts().len(), 1);
    assert_eq!(ack.hits_async().await, 1);

    let summaries = relay
        .notifier
        .calls()
        .into_iter()
        .filter(|call| matches!(call, NotifyCall::Summary { .. }))
        .count();
    assert_eq!(summaries, 1);
}

// ============================================================================
// MINIMAL SHAPE
// ============================================================================

#[tokio::test]
async fn test_minimal_scenario_prints_verbatim() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body(MINIMAL_BODY);
        })
        .await;
    let ack = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(ACK_PATH)
                .body("action=update&internalDispatchSerial=X9");
            then.status(200);
        })
        .await;
    let relay = relay(&server);

    let outcome = relay.engine.run_cycle().await;

    assert_eq!(outcome.shape, Some(Shape::MinimalArray));
    assert_eq!(
        relay.connector.receipts(),
        vec![encode_text("Table 4 order", PaperWidth::NARROW)]
    );
    assert_eq!(ack.hits_async().await, 1);
    assert_eq!(relay.prefs.get_string(KEY_SEEN_PRINTED).as_deref(), Some("X9"));
    assert_eq!(relay.prefs.get_string(KEY_SEEN_ACKED).as_deref(), Some("X9"));
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_malformed_body_dispatches_nothing() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body("not valid json");
        })
        .await;
    let ack = server
        .mock_async(|when, then| {
            when.method(POST).path(ACK_PATH);
            then.status(200);
        })
        .await;
    let relay = relay(&server);

    let outcome = relay.engine.run_cycle().await;

    // the fetch itself succeeded, so this is not a transport failure
    assert_eq!(outcome.status, CycleStatus::Success);
    assert_eq!(outcome.received, 0);
    assert!(relay.connector.receipts().is_empty());
    assert!(relay.notifier.calls().is_empty());
    assert_eq!(ack.hits_async().await, 0);
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(500).body(DISPATCH_BODY);
        })
        .await;
    let relay = relay(&server);

    let outcome = relay.engine.run_cycle().await;

    assert_eq!(outcome.status, CycleStatus::Failure);
    assert_eq!(outcome.dispatched, 0);
    assert!(relay.connector.receipts().is_empty());
}

#[tokio::test]
async fn test_failed_ack_retried_when_job_reappears() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body(DISPATCH_BODY);
        })
        .await;
    let mut failing = server
        .mock_async(|when, then| {
            when.method(POST).path(ACK_PATH);
            then.status(503);
        })
        .await;
    let relay = relay(&server);

    let first = relay.engine.run_cycle().await;
    assert_eq!(first.dispatched, 1);
    assert_eq!(first.acknowledged, 0);
    assert_eq!(failing.hits_async().await, 1);
    failing.delete_async().await;

    let healthy = server
        .mock_async(|when, then| {
            when.method(POST).path(ACK_PATH);
            then.status(200);
        })
        .await;

    let second = relay.engine.run_cycle().await;
    assert_eq!(second.dispatched, 0);
    assert_eq!(second.acknowledged, 1);
    assert_eq!(healthy.hits_async().await, 1);
    assert_eq!(relay.connector.receipts().len(), 1);
}

#[tokio::test]
async fn test_unreachable_printer_retried_next_cycle() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body(MINIMAL_BODY);
        })
        .await;
    let ack = server
        .mock_async(|when, then| {
            when.method(POST).path(ACK_PATH);
            then.status(200);
        })
        .await;
    let relay = relay(&server);

    relay.connector.fail_connect(true);
    let first = relay.engine.run_cycle().await;
    assert_eq!(first.discovered, 1);
    assert_eq!(first.dispatched, 0);
    assert_eq!(ack.hits_async().await, 0);

    relay.connector.fail_connect(false);
    let second = relay.engine.run_cycle().await;
    assert_eq!(second.discovered, 0);
    assert_eq!(second.dispatched, 1);
    assert_eq!(ack.hits_async().await, 1);
    assert_eq!(relay.notifier.job_alerts().len(), 1);
}

// ============================================================================
// NOTIFICATION ACTION AND SCHEDULING
// ============================================================================

#[tokio::test]
async fn test_print_from_notification_uses_surface() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body(DISPATCH_BODY);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(ACK_PATH);
            then.status(200);
        })
        .await;
    let relay = relay(&server);

    relay.engine.run_cycle().await;
    let printed = relay
        .engine
        .print_from_notification(&id("D1"))
        .await
        .unwrap();

    assert!(printed);
    assert_eq!(
        relay.surface.pages(),
        vec![(
            "Main".to_string(),
            "Main\nOrder: SO1   Seq:    Disp: D1\n\nBurger x2".to_string()
        )]
    );
}

#[tokio::test]
async fn test_spawned_engine_polls_immediately() {
    let server = MockServer::start_async().await;
    let poll = server
        .mock_async(|when, then| {
            when.method(GET).path(POLL_PATH);
            then.status(200).body(MINIMAL_BODY);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(ACK_PATH);
            then.status(200);
        })
        .await;
    let relay = relay(&server);

    let handle = Arc::clone(&relay.engine).spawn(None);
    for _ in 0..100 {
        if relay.engine.last_outcome().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let stats = handle.stop().await;

    assert_eq!(stats.cycles, 1);
    assert_eq!(poll.hits_async().await, 1);
    assert_eq!(relay.connector.receipts().len(), 1);
}
