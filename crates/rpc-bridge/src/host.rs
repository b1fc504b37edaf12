//! Handle to a running computation host

use crate::protocol::HostRequest;
use crate::{BridgeError, Result};
use serde_json::Value;
use tokio::sync::mpsc;

/// Something the host reports back to the bridge
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A raw message frame. Frames that do not parse as a host message are
    /// dropped by the bridge.
    Frame(Value),
    /// Out-of-band failure signal: the host is gone.
    Crashed(String),
}

/// Channel pair connecting the bridge to one host instance
pub struct HostHandle {
    requests: mpsc::UnboundedSender<HostRequest>,
    events: Option<mpsc::UnboundedReceiver<HostEvent>>,
    terminator: Option<Box<dyn FnOnce() + Send>>,
}

impl HostHandle {
    pub fn new(
        requests: mpsc::UnboundedSender<HostRequest>,
        events: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Self {
        Self {
            requests,
            events: Some(events),
            terminator: None,
        }
    }

    /// Hook run exactly once when the host is hard-terminated.
    pub fn on_terminate(mut self, terminator: impl FnOnce() + Send + 'static) -> Self {
        self.terminator = Some(Box::new(terminator));
        self
    }

    /// Post a request without waiting for anything.
    pub fn post(&self, request: HostRequest) -> Result<()> {
        self.requests.send(request).map_err(|e| {
            BridgeError::HostUnavailable(format!("host stopped accepting request {}", e.0.id))
        })
    }

    pub(crate) fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<HostEvent>> {
        self.events.take()
    }

    /// Hard-terminate the host. In-flight work is discarded.
    pub fn terminate(&mut self) {
        if let Some(terminator) = self.terminator.take() {
            terminator();
        }
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Creates computation hosts. Called once per `init` and once per restart.
pub trait HostFactory: Send + Sync {
    fn spawn(&self) -> Result<HostHandle>;
}
