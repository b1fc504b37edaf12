//! Worker status broadcast

use mathboard_shared::{WorkerPhase, WorkerStatus};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Shared, subscribable worker status.
///
/// Host `status` frames and bridge-driven changes alike go through
/// [`publish`](StatusBoard::publish); only the `Idle -> Loading` start is
/// guarded, so concurrent `init` calls spawn a single host.
#[derive(Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<WorkerStatus>>,
    stats: Arc<RwLock<LifecycleStats>>,
}

/// Lifecycle statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LifecycleStats {
    pub transitions: u64,
    pub errors_reported: u64,
    #[serde(skip)]
    pub last_change: Option<Instant>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(WorkerStatus::default());
        Self {
            tx: Arc::new(tx),
            stats: Arc::new(RwLock::new(LifecycleStats::default())),
        }
    }

    pub fn current(&self) -> WorkerStatus {
        self.tx.borrow().clone()
    }

    pub fn phase(&self) -> WorkerPhase {
        self.tx.borrow().phase
    }

    /// Subscribe to status changes. Any number of observers may subscribe.
    pub fn subscribe(&self) -> watch::Receiver<WorkerStatus> {
        self.tx.subscribe()
    }

    /// Apply a status unconditionally.
    pub fn publish(&self, phase: WorkerPhase, message: impl Into<String>) {
        let next = WorkerStatus::new(phase, message);
        let mut previous = None;
        let changed = self.tx.send_if_modified(|status| {
            if *status == next {
                return false;
            }
            previous = Some(status.phase);
            *status = next.clone();
            true
        });

        if changed {
            log::info!(
                "Worker status {:?} -> {:?} ({})",
                previous.unwrap_or_default(),
                next.phase,
                next.message
            );
            let mut stats = self.stats.write();
            stats.transitions += 1;
            stats.last_change = Some(Instant::now());
            if phase == WorkerPhase::Error {
                stats.errors_reported += 1;
            }
        }
    }

    /// Atomically move `Idle -> Loading`. Returns false if the host was not idle.
    pub fn begin_loading(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        let started = self.tx.send_if_modified(|status| {
            if status.phase != WorkerPhase::Idle {
                return false;
            }
            *status = WorkerStatus::new(WorkerPhase::Loading, message.clone());
            true
        });
        if started {
            log::info!("Worker status Idle -> Loading ({})", message);
            self.stats.write().transitions += 1;
        }
        started
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats.read().clone()
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_notifies_all_subscribers() {
        let board = StatusBoard::new();
        let mut a = board.subscribe();
        let mut b = board.subscribe();

        board.publish(WorkerPhase::Loading, "Loading engine");

        assert!(a.has_changed().unwrap());
        assert!(b.has_changed().unwrap());
        assert_eq!(a.borrow_and_update().phase, WorkerPhase::Loading);
        assert_eq!(b.borrow_and_update().message, "Loading engine");
    }

    #[test]
    fn test_identical_publish_is_not_a_transition() {
        let board = StatusBoard::new();
        board.publish(WorkerPhase::Ready, "ok");
        board.publish(WorkerPhase::Ready, "ok");
        assert_eq!(board.stats().transitions, 1);
    }

    #[test]
    fn test_errors_are_counted() {
        let board = StatusBoard::new();
        board.publish(WorkerPhase::Loading, "");
        board.publish(WorkerPhase::Error, "boom");
        board.publish(WorkerPhase::Loading, "again");
        board.publish(WorkerPhase::Error, "boom");
        assert_eq!(board.stats().errors_reported, 2);
        assert_eq!(board.stats().transitions, 4);
    }

    #[test]
    fn test_begin_loading_only_from_idle() {
        let board = StatusBoard::new();
        assert!(board.begin_loading("first"));
        assert!(!board.begin_loading("second"));
        assert_eq!(board.current().message, "first");
    }
}
