//! Session-scoped RPC bridge to the computation host

use crate::correlation::CorrelationIds;
use crate::host::{HostEvent, HostFactory, HostHandle};
use crate::lifecycle::StatusBoard;
use crate::protocol::{HostMessage, HostRequest, RequestId};
use crate::{BridgeError, Result};
use mathboard_shared::{RequestKind, WorkerPhase, WorkerStatus};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Deadline applied to every request
    pub request_timeout: Duration,
    /// Reject outstanding requests with `HostRestarted` on restart instead
    /// of leaving them to their individual deadlines
    pub reject_on_restart: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            reject_on_restart: true,
        }
    }
}

struct PendingRequest {
    kind: RequestKind,
    generation: u64,
    issued_at: Instant,
    reply: oneshot::Sender<Result<Value>>,
}

type PendingTable = Arc<Mutex<HashMap<RequestId, PendingRequest>>>;

/// One live host plus the task routing its events
struct HostConnection {
    handle: HostHandle,
    dispatcher: JoinHandle<()>,
    generation: u64,
}

impl HostConnection {
    fn shutdown(mut self) {
        self.dispatcher.abort();
        self.handle.terminate();
    }
}

/// Removes the pending entry if the caller stops waiting early.
struct PendingSlot<'a> {
    table: &'a PendingTable,
    id: RequestId,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.table.lock().remove(&self.id);
    }
}

/// Owns the computation host handle and the pending-request table.
///
/// Create one per session; must be used inside a tokio runtime. Dropping
/// the bridge terminates its host.
pub struct RpcBridge {
    factory: Arc<dyn HostFactory>,
    config: BridgeConfig,
    connection: Mutex<Option<HostConnection>>,
    pending: PendingTable,
    status: StatusBoard,
    ids: CorrelationIds,
    generation: AtomicU64,
    /// Last generation whose init handshake succeeded
    ready_generation: AtomicU64,
}

impl RpcBridge {
    pub fn new(factory: impl HostFactory + 'static, config: BridgeConfig) -> Self {
        Self {
            factory: Arc::new(factory),
            config,
            connection: Mutex::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            status: StatusBoard::new(),
            ids: CorrelationIds::new(),
            generation: AtomicU64::new(0),
            ready_generation: AtomicU64::new(0),
        }
    }

    /// Start the host and wait for its init handshake.
    ///
    /// Idempotent: a no-op while loading or ready. After a failed start or a
    /// crash the bridge stays in `error` until [`restart`](Self::restart).
    pub async fn init(&self) -> Result<()> {
        if !self.status.begin_loading("Starting computation host") {
            let current = self.status.current();
            return match current.phase {
                WorkerPhase::Error if self.reached_ready() => {
                    Err(BridgeError::HostCrashed(current.message))
                }
                WorkerPhase::Error => Err(BridgeError::HostInit(current.message)),
                _ => Ok(()),
            };
        }
        self.start_host().await
    }

    /// Hard-terminate the current host and start a fresh one.
    pub async fn restart(&self) -> Result<()> {
        let previous = self.connection.lock().take();
        if let Some(connection) = previous {
            log::info!("Terminating computation host (generation {})", connection.generation);
            connection.shutdown();
        }

        if self.config.reject_on_restart {
            let abandoned: Vec<_> = self.pending.lock().drain().collect();
            if !abandoned.is_empty() {
                log::warn!("Rejecting {} outstanding request(s) on restart", abandoned.len());
            }
            for (id, request) in abandoned {
                let _ = request.reply.send(Err(BridgeError::HostRestarted { id }));
            }
        }

        self.status.publish(WorkerPhase::Loading, "Restarting computation host");
        self.start_host().await
    }

    /// Terminate the host without starting another one.
    pub fn shutdown(&self) {
        if let Some(connection) = self.connection.lock().take() {
            connection.shutdown();
        }
        let abandoned: Vec<_> = self.pending.lock().drain().collect();
        for (id, request) in abandoned {
            let _ = request.reply.send(Err(BridgeError::Cancelled(id)));
        }
        self.status.publish(WorkerPhase::Idle, "Computation host stopped");
    }

    /// Send one command and wait for its response.
    ///
    /// Never blocks the calling thread; many sends may be outstanding at once
    /// and each resolves independently by correlation id.
    pub async fn send(&self, kind: RequestKind, payload: Value) -> Result<Value> {
        self.send_as(self.ids.next(), kind, payload).await
    }

    async fn send_as(&self, id: RequestId, kind: RequestKind, payload: Value) -> Result<Value> {
        let (reply, mut response) = oneshot::channel();

        {
            let connection = self.connection.lock();
            let connection = connection.as_ref().ok_or_else(|| {
                BridgeError::HostUnavailable("computation host has not been started".to_string())
            })?;

            self.pending.lock().insert(
                id.clone(),
                PendingRequest {
                    kind,
                    generation: connection.generation,
                    issued_at: Instant::now(),
                    reply,
                },
            );

            let request = HostRequest {
                kind,
                id: id.clone(),
                payload,
            };
            if let Err(e) = connection.handle.post(request) {
                self.pending.lock().remove(&id);
                return Err(e);
            }
        }
        log::debug!("Dispatched {} request {}", kind, id);

        let slot = PendingSlot {
            table: &self.pending,
            id: id.clone(),
        };

        let outcome = match tokio::time::timeout(self.config.request_timeout, &mut response).await
        {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::Cancelled(id)),
            Err(_) => {
                if self.pending.lock().remove(&id).is_some() {
                    log::warn!(
                        "{} request {} timed out after {:?}",
                        kind,
                        id,
                        self.config.request_timeout
                    );
                    Err(BridgeError::Timeout {
                        id,
                        after_ms: self.config.request_timeout.as_millis() as u64,
                    })
                } else {
                    // Resolved in the same instant the deadline fired
                    response
                        .try_recv()
                        .unwrap_or_else(|_| Err(BridgeError::Cancelled(id)))
                }
            }
        };
        drop(slot);
        outcome
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.current()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<WorkerStatus> {
        self.status.subscribe()
    }

    pub fn status_board(&self) -> &StatusBoard {
        &self.status
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Age of the oldest outstanding request, if any.
    pub fn oldest_pending(&self) -> Option<(RequestKind, Duration)> {
        oldest_pending(&self.pending)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    async fn start_host(&self) -> Result<()> {
        let connection = match self.connect() {
            Ok(connection) => connection,
            Err(e) => {
                self.status.publish(WorkerPhase::Error, e.to_string());
                return Err(e);
            }
        };
        let generation = connection.generation;
        if let Some(stale) = self.connection.lock().replace(connection) {
            stale.shutdown();
        }

        let handshake = self.ids.next();
        let outcome = self
            .send_as(handshake.clone(), RequestKind::Init, Value::Null)
            .await;

        // A restart while waiting owns the status from here on
        if self.generation() != generation {
            log::info!(
                "Discarding init handshake {} of replaced host generation {}",
                handshake,
                generation
            );
            return Err(BridgeError::HostRestarted { id: handshake });
        }

        match outcome {
            Ok(_) => {
                self.ready_generation.store(generation, Ordering::Release);
                self.status.publish(WorkerPhase::Ready, "Math engine ready");
                Ok(())
            }
            Err(e) => {
                self.status.publish(WorkerPhase::Error, e.to_string());
                Err(BridgeError::HostInit(e.to_string()))
            }
        }
    }

    fn reached_ready(&self) -> bool {
        self.ready_generation.load(Ordering::Acquire) == self.generation()
    }

    fn connect(&self) -> Result<HostConnection> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let mut handle = self.factory.spawn()?;
        let events = handle.take_events().ok_or_else(|| {
            BridgeError::HostInit("host handle has no event stream".to_string())
        })?;

        let dispatcher = tokio::spawn(dispatch(
            events,
            Arc::clone(&self.pending),
            self.status.clone(),
            generation,
        ));
        log::debug!("Computation host started (generation {})", generation);

        Ok(HostConnection {
            handle,
            dispatcher,
            generation,
        })
    }
}

impl Drop for RpcBridge {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.get_mut().take() {
            connection.shutdown();
        }
    }
}

/// Route host events until the host goes away.
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<HostEvent>,
    pending: PendingTable,
    status: StatusBoard,
    generation: u64,
) {
    while let Some(event) = events.recv().await {
        match event {
            HostEvent::Frame(frame) => route_frame(frame, &pending, &status, generation),
            HostEvent::Crashed(reason) => {
                // Pending requests stay registered until their own deadlines.
                match oldest_pending(&pending) {
                    Some((kind, age)) => log::error!(
                        "Computation host crashed: {} (oldest outstanding: {} request, {:?} old)",
                        reason,
                        kind,
                        age
                    ),
                    None => log::error!("Computation host crashed: {}", reason),
                }
                status.publish(WorkerPhase::Error, reason);
                return;
            }
        }
    }
    log::error!("Computation host event stream closed");
    status.publish(WorkerPhase::Error, "Computation host exited");
}

fn oldest_pending(pending: &PendingTable) -> Option<(RequestKind, Duration)> {
    pending
        .lock()
        .values()
        .min_by_key(|p| p.issued_at)
        .map(|p| (p.kind, p.issued_at.elapsed()))
}

fn route_frame(frame: Value, pending: &PendingTable, status: &StatusBoard, generation: u64) {
    let message: HostMessage = match serde_json::from_value(frame) {
        Ok(message) => message,
        Err(e) => {
            log::warn!("Dropping malformed host frame: {}", e);
            return;
        }
    };

    match message {
        HostMessage::Status {
            status: phase,
            message,
        } => status.publish(phase, message),
        HostMessage::Result { id, payload } => resolve(pending, generation, id, Ok(payload)),
        HostMessage::Error { id, error } => {
            let outcome = Err(BridgeError::HostRejected {
                id: id.clone(),
                message: error,
            });
            resolve(pending, generation, id, outcome)
        }
    }
}

fn resolve(pending: &PendingTable, generation: u64, id: RequestId, outcome: Result<Value>) {
    let entry = {
        let mut table = pending.lock();
        match table.get(&id) {
            Some(request) if request.generation == generation => table.remove(&id),
            _ => None,
        }
    };

    match entry {
        Some(request) => {
            log::debug!(
                "{} request {} answered in {:?}",
                request.kind,
                id,
                request.issued_at.elapsed()
            );
            if request.reply.send(outcome).is_err() {
                log::debug!("Caller for request {} stopped waiting", id);
            }
        }
        None => log::debug!("Discarding response for unknown or expired request {}", id),
    }
}
