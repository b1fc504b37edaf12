//! Single-threaded computation host backed by an external math engine
//!
//! Each spawned host owns one dedicated OS thread. Requests are processed
//! strictly one after another, so responses leave the host in the order the
//! requests arrived and no two commands ever execute at the same time. The
//! engine itself is loaded lazily on the first request.

use crate::host::{HostEvent, HostFactory, HostHandle};
use crate::protocol::{HostMessage, HostRequest};
use crate::{BridgeError, Result};
use mathboard_shared::{RequestKind, WorkerPhase};
use serde_json::{json, Value};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The external symbolic/numeric engine.
///
/// `Ok` carries the result payload delivered to the caller (which may itself
/// describe a computation failure with `success: false`); `Err` is reported
/// to the caller as a host-side `error` message.
pub trait MathEngine: Send {
    fn execute(&mut self, kind: RequestKind, payload: &Value) -> std::result::Result<Value, String>;
}

type EngineLoader =
    dyn Fn() -> std::result::Result<Box<dyn MathEngine>, String> + Send + Sync;

/// [`HostFactory`] that runs a [`MathEngine`] on its own thread
pub struct EngineHost {
    loader: Arc<EngineLoader>,
    thread_name: String,
}

impl EngineHost {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> std::result::Result<Box<dyn MathEngine>, String> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            thread_name: "mathboard-host".to_string(),
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl HostFactory for EngineHost {
    fn spawn(&self) -> Result<HostHandle> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let terminated = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            loader: Arc::clone(&self.loader),
            engine: None,
            events: event_tx,
            terminated: Arc::clone(&terminated),
        };

        std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run(request_rx))
            .map_err(|e| BridgeError::HostInit(format!("failed to spawn host thread: {e}")))?;

        Ok(HostHandle::new(request_tx, event_rx)
            .on_terminate(move || terminated.store(true, Ordering::Release)))
    }
}

struct Worker {
    loader: Arc<EngineLoader>,
    engine: Option<Box<dyn MathEngine>>,
    events: mpsc::UnboundedSender<HostEvent>,
    terminated: Arc<AtomicBool>,
}

impl Worker {
    fn run(mut self, mut requests: mpsc::UnboundedReceiver<HostRequest>) {
        while let Some(request) = requests.blocking_recv() {
            if self.is_terminated() {
                break;
            }
            if let Err(reason) = self.handle(request) {
                log::error!("Computation host crashed: {}", reason);
                let _ = self.events.send(HostEvent::Crashed(reason));
                return;
            }
        }
        log::debug!("Computation host thread exiting");
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// `Err` means the host itself died (engine panic).
    fn handle(&mut self, request: HostRequest) -> std::result::Result<(), String> {
        if self.engine.is_none() {
            self.emit(HostMessage::Status {
                status: WorkerPhase::Loading,
                message: "Loading math engine".to_string(),
            });

            let loader = Arc::clone(&self.loader);
            match panic::catch_unwind(AssertUnwindSafe(|| loader())) {
                Ok(Ok(engine)) => {
                    self.engine = Some(engine);
                    self.emit(HostMessage::Status {
                        status: WorkerPhase::Ready,
                        message: "Math engine ready".to_string(),
                    });
                }
                Ok(Err(message)) => {
                    self.emit(HostMessage::Status {
                        status: WorkerPhase::Error,
                        message: message.clone(),
                    });
                    self.emit(HostMessage::Error {
                        id: request.id,
                        error: message,
                    });
                    return Ok(());
                }
                Err(panic) => return Err(panic_message(panic)),
            }
        }

        if request.kind == RequestKind::Init {
            self.emit(HostMessage::Result {
                id: request.id,
                payload: json!({ "ready": true }),
            });
            return Ok(());
        }

        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };

        let kind = request.kind;
        let payload = &request.payload;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.execute(kind, payload)));

        match outcome {
            Ok(Ok(payload)) => self.emit(HostMessage::Result {
                id: request.id,
                payload,
            }),
            Ok(Err(error)) => self.emit(HostMessage::Error {
                id: request.id,
                error,
            }),
            Err(panic) => return Err(panic_message(panic)),
        }
        Ok(())
    }

    fn emit(&self, message: HostMessage) {
        if self.is_terminated() {
            return;
        }
        match serde_json::to_value(&message) {
            Ok(frame) => {
                // Receiver gone means the bridge discarded this host.
                let _ = self.events.send(HostEvent::Frame(frame));
            }
            Err(e) => log::error!("Failed to encode host message: {}", e),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("engine panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("engine panicked: {s}")
    } else {
        "engine panicked".to_string()
    }
}
