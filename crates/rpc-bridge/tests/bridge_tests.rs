//! Integration tests for the RPC bridge against a scripted host

use mathboard_rpc::{
    BridgeConfig, BridgeError, HostEvent, HostFactory, HostHandle, HostRequest, RpcBridge,
};
use mathboard_shared::{RequestKind, WorkerPhase};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// The test's end of one spawned host
struct ScriptedHost {
    requests: mpsc::UnboundedReceiver<HostRequest>,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl ScriptedHost {
    async fn next_request(&mut self) -> HostRequest {
        self.requests.recv().await.expect("bridge closed the request channel")
    }

    fn reply(&self, request: &HostRequest, payload: Value) {
        let _ = self.events.send(HostEvent::Frame(json!({
            "type": "result",
            "id": request.id,
            "payload": payload,
        })));
    }

    fn fail(&self, request: &HostRequest, error: &str) {
        let _ = self.events.send(HostEvent::Frame(json!({
            "type": "error",
            "id": request.id,
            "error": error,
        })));
    }

    fn frame(&self, frame: Value) {
        let _ = self.events.send(HostEvent::Frame(frame));
    }
}

struct ScriptedFactory {
    spawned: mpsc::UnboundedSender<ScriptedHost>,
}

impl HostFactory for ScriptedFactory {
    fn spawn(&self) -> mathboard_rpc::Result<HostHandle> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = self.spawned.send(ScriptedHost {
            requests: request_rx,
            events: event_tx,
        });
        Ok(HostHandle::new(request_tx, event_rx))
    }
}

fn scripted_bridge(config: BridgeConfig) -> (Arc<RpcBridge>, mpsc::UnboundedReceiver<ScriptedHost>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (spawned_tx, spawned_rx) = mpsc::unbounded_channel();
    let bridge = RpcBridge::new(ScriptedFactory { spawned: spawned_tx }, config);
    (Arc::new(bridge), spawned_rx)
}

/// Run `init` and answer the handshake from the freshly spawned host.
async fn start(
    bridge: &Arc<RpcBridge>,
    hosts: &mut mpsc::UnboundedReceiver<ScriptedHost>,
) -> ScriptedHost {
    let init = tokio::spawn({
        let bridge = Arc::clone(bridge);
        async move { bridge.init().await }
    });

    let mut host = hosts.recv().await.expect("no host was spawned");
    let handshake = host.next_request().await;
    assert_eq!(handshake.kind, RequestKind::Init);
    host.reply(&handshake, json!({ "ready": true }));

    init.await.unwrap().unwrap();
    host
}

fn spawn_send(
    bridge: &Arc<RpcBridge>,
    kind: RequestKind,
    payload: Value,
) -> tokio::task::JoinHandle<mathboard_rpc::Result<Value>> {
    let bridge = Arc::clone(bridge);
    tokio::spawn(async move { bridge.send(kind, payload).await })
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_init_reaches_ready() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    assert_eq!(bridge.status().phase, WorkerPhase::Idle);

    let _host = start(&bridge, &mut hosts).await;

    assert_eq!(bridge.status().phase, WorkerPhase::Ready);
    assert_eq!(bridge.generation(), 1);
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_init_is_idempotent() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let _host = start(&bridge, &mut hosts).await;

    bridge.init().await.unwrap();
    bridge.init().await.unwrap();

    assert!(hosts.try_recv().is_err(), "a second host was spawned");
    assert_eq!(bridge.generation(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_init_failure_reports_error_until_restart() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());

    let init = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.init().await }
    });
    let mut host = hosts.recv().await.unwrap();
    let handshake = host.next_request().await;
    host.fail(&handshake, "failed to load math engine");

    let err = init.await.unwrap().unwrap_err();
    assert!(matches!(err, BridgeError::HostInit(_)));
    assert_eq!(bridge.status().phase, WorkerPhase::Error);

    // Still broken until an explicit restart
    assert!(matches!(bridge.init().await, Err(BridgeError::HostInit(_))));
}

#[tokio::test(start_paused = true)]
async fn test_send_before_init_is_unavailable() {
    let (bridge, _hosts) = scripted_bridge(BridgeConfig::default());
    let err = bridge.send(RequestKind::Calculate, json!({})).await.unwrap_err();
    assert!(matches!(err, BridgeError::HostUnavailable(_)));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_resolve_by_correlation_id() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;

    let derivative = spawn_send(&bridge, RequestKind::Differentiate, json!({ "expr": "A" }));
    let integral = spawn_send(&bridge, RequestKind::Integrate, json!({ "expr": "B" }));

    let first = host.next_request().await;
    let second = host.next_request().await;
    assert_ne!(first.id, second.id);
    assert_eq!(bridge.pending_count(), 2);

    // Answer in reverse order
    host.reply(&second, json!({ "answer": second.payload["expr"] }));
    host.reply(&first, json!({ "answer": first.payload["expr"] }));

    assert_eq!(derivative.await.unwrap().unwrap()["answer"], "A");
    assert_eq!(integral.await.unwrap().unwrap()["answer"], "B");
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_host_error_rejects_only_that_request() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;

    let bad = spawn_send(&bridge, RequestKind::Convert, json!({ "expr": "sin(" }));
    let good = spawn_send(&bridge, RequestKind::Convert, json!({ "expr": "x" }));

    let mut received = vec![host.next_request().await, host.next_request().await];
    received.sort_by_key(|r| r.payload["expr"] != "sin(");
    let good_request = received.pop().unwrap();
    let bad_request = received.pop().unwrap();
    host.fail(&bad_request, "SympifyError");
    host.reply(&good_request, json!({ "latex": "x" }));

    match bad.await.unwrap() {
        Err(BridgeError::HostRejected { id, message }) => {
            assert_eq!(id, bad_request.id);
            assert_eq!(message, "SympifyError");
        }
        other => panic!("expected a host rejection, got {other:?}"),
    }
    assert_eq!(good.await.unwrap().unwrap()["latex"], "x");
    assert_eq!(bridge.status().phase, WorkerPhase::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_removes_pending_and_late_response_is_ignored() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;

    let started = tokio::time::Instant::now();
    let slow = spawn_send(&bridge, RequestKind::Integrate, json!({ "expr": "exp(x**2)" }));
    let request = host.next_request().await;

    match slow.await.unwrap() {
        Err(BridgeError::Timeout { id, after_ms }) => {
            assert_eq!(id, request.id);
            assert_eq!(after_ms, 30_000);
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(bridge.pending_count(), 0);

    host.reply(&request, json!({ "too": "late" }));
    settle().await;
    assert_eq!(bridge.pending_count(), 0);
    assert_eq!(bridge.status().phase, WorkerPhase::Ready);

    // The bridge keeps working afterwards
    let next = spawn_send(&bridge, RequestKind::Calculate, json!({ "expr": "1+1" }));
    let request = host.next_request().await;
    host.reply(&request, json!({ "value": 2 }));
    assert_eq!(next.await.unwrap().unwrap()["value"], 2);
}

#[tokio::test(start_paused = true)]
async fn test_configured_timeout_is_honoured() {
    let config = BridgeConfig {
        request_timeout: Duration::from_millis(250),
        ..BridgeConfig::default()
    };
    let (bridge, mut hosts) = scripted_bridge(config);
    let mut host = start(&bridge, &mut hosts).await;

    let slow = spawn_send(&bridge, RequestKind::Process, json!({}));
    let _request = host.next_request().await;

    assert!(matches!(
        slow.await.unwrap(),
        Err(BridgeError::Timeout { after_ms: 250, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_send_clears_pending_entry() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;

    let waited = tokio::time::timeout(
        Duration::from_secs(1),
        bridge.send(RequestKind::Process, json!({})),
    )
    .await;
    assert!(waited.is_err());
    assert_eq!(bridge.pending_count(), 0);

    let request = host.next_request().await;
    host.reply(&request, json!({}));
    settle().await;
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_dropped() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;

    let pending = spawn_send(&bridge, RequestKind::Calculate, json!({ "expr": "2*3" }));
    let request = host.next_request().await;

    host.frame(json!("not an object"));
    host.frame(json!({ "type": "progress", "id": request.id }));
    host.frame(json!({ "type": "result" }));
    host.frame(json!({ "type": "result", "id": "nobody-asked", "payload": {} }));
    settle().await;

    assert_eq!(bridge.pending_count(), 1);
    assert_eq!(bridge.status().phase, WorkerPhase::Ready);

    host.reply(&request, json!({ "value": 6 }));
    assert_eq!(pending.await.unwrap().unwrap()["value"], 6);
}

#[tokio::test(start_paused = true)]
async fn test_status_frames_reach_every_subscriber() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let host = start(&bridge, &mut hosts).await;

    let mut banner = bridge.subscribe_status();
    let mut toolbar = bridge.subscribe_status();

    host.frame(json!({ "type": "status", "status": "loading", "message": "Installing packages" }));

    for rx in [&mut banner, &mut toolbar] {
        let status = rx
            .wait_for(|s| s.phase == WorkerPhase::Loading)
            .await
            .unwrap()
            .clone();
        assert_eq!(status.message, "Installing packages");
    }
}

#[tokio::test(start_paused = true)]
async fn test_crash_sets_error_and_pending_requests_time_out() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;
    let mut status = bridge.subscribe_status();

    let pending = spawn_send(&bridge, RequestKind::Process, json!({}));
    let _request = host.next_request().await;

    let _ = host.events.send(HostEvent::Crashed("out of memory".to_string()));
    status
        .wait_for(|s| s.phase == WorkerPhase::Error)
        .await
        .unwrap();

    // Crash does not flush pending requests
    assert_eq!(bridge.pending_count(), 1);
    assert!(matches!(
        pending.await.unwrap(),
        Err(BridgeError::Timeout { .. })
    ));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_rejects_outstanding_requests() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut old_host = start(&bridge, &mut hosts).await;

    let orphan = spawn_send(&bridge, RequestKind::Integrate, json!({ "expr": "x" }));
    let orphan_request = old_host.next_request().await;

    let restart = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.restart().await }
    });

    match orphan.await.unwrap() {
        Err(BridgeError::HostRestarted { id }) => assert_eq!(id, orphan_request.id),
        other => panic!("expected HostRestarted, got {other:?}"),
    }

    let mut new_host = hosts.recv().await.unwrap();
    assert_eq!(bridge.status().phase, WorkerPhase::Loading);
    let handshake = new_host.next_request().await;
    assert_eq!(handshake.kind, RequestKind::Init);
    new_host.reply(&handshake, json!({ "ready": true }));
    restart.await.unwrap().unwrap();

    assert_eq!(bridge.status().phase, WorkerPhase::Ready);
    assert_eq!(bridge.generation(), 2);

    // The old host's answer has nowhere to go
    old_host.reply(&orphan_request, json!({ "stale": true }));
    settle().await;
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_without_rejection_leaves_requests_to_their_deadline() {
    let config = BridgeConfig {
        reject_on_restart: false,
        ..BridgeConfig::default()
    };
    let (bridge, mut hosts) = scripted_bridge(config);
    let mut old_host = start(&bridge, &mut hosts).await;

    let orphan = spawn_send(&bridge, RequestKind::Process, json!({}));
    let orphan_request = old_host.next_request().await;

    let restart = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.restart().await }
    });
    let mut new_host = hosts.recv().await.unwrap();
    let handshake = new_host.next_request().await;
    new_host.reply(&handshake, json!({ "ready": true }));
    restart.await.unwrap().unwrap();

    // A same-id answer from the new generation is still not accepted for
    // a request issued to the old one.
    new_host.reply(&orphan_request, json!({ "wrong": "generation" }));
    settle().await;
    assert_eq!(bridge.pending_count(), 1);

    assert!(matches!(
        orphan.await.unwrap(),
        Err(BridgeError::Timeout { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_and_goes_idle() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;

    let pending = spawn_send(&bridge, RequestKind::Process, json!({}));
    let _request = host.next_request().await;

    bridge.shutdown();

    assert!(matches!(pending.await.unwrap(), Err(BridgeError::Cancelled(_))));
    assert_eq!(bridge.status().phase, WorkerPhase::Idle);
    assert!(host.requests.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_init_of_replaced_host_leaves_status_alone() {
    let config = BridgeConfig {
        reject_on_restart: false,
        ..BridgeConfig::default()
    };
    let (bridge, mut hosts) = scripted_bridge(config);
    let mut status = bridge.subscribe_status();

    let first_init = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.init().await }
    });
    let mut first_host = hosts.recv().await.unwrap();
    let first_handshake = first_host.next_request().await;

    // Dies before answering the handshake
    let _ = first_host
        .events
        .send(HostEvent::Crashed("engine thread died".to_string()));
    status
        .wait_for(|s| s.phase == WorkerPhase::Error)
        .await
        .unwrap();

    let restart = tokio::spawn({
        let bridge = Arc::clone(&bridge);
        async move { bridge.restart().await }
    });
    let mut second_host = hosts.recv().await.unwrap();
    let handshake = second_host.next_request().await;
    second_host.reply(&handshake, json!({ "ready": true }));
    restart.await.unwrap().unwrap();
    assert_eq!(bridge.status().phase, WorkerPhase::Ready);

    // The first handshake runs into its deadline after the restart
    match first_init.await.unwrap() {
        Err(BridgeError::HostRestarted { id }) => assert_eq!(id, first_handshake.id),
        other => panic!("expected HostRestarted, got {other:?}"),
    }

    assert_eq!(bridge.status().phase, WorkerPhase::Ready);
    bridge.init().await.unwrap();
    assert_eq!(bridge.generation(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_init_after_runtime_crash_reports_crash() {
    let (bridge, mut hosts) = scripted_bridge(BridgeConfig::default());
    let mut host = start(&bridge, &mut hosts).await;
    let mut status = bridge.subscribe_status();

    let _pending = spawn_send(&bridge, RequestKind::Differentiate, json!({ "expr": "x^2" }));
    let _request = host.next_request().await;

    let _ = host.events.send(HostEvent::Crashed("out of memory".to_string()));
    status
        .wait_for(|s| s.phase == WorkerPhase::Error)
        .await
        .unwrap();

    assert!(matches!(bridge.oldest_pending(), Some((RequestKind::Differentiate, _))));
    match bridge.init().await {
        Err(BridgeError::HostCrashed(message)) => assert_eq!(message, "out of memory"),
        other => panic!("expected HostCrashed, got {other:?}"),
    }
}
