//! Correlation id generation

use crate::protocol::RequestId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generates ids of the form `<session>-<counter>-<millis>`.
///
/// The session prefix is random per bridge, the counter is monotonic, and
/// the timestamp keeps ids distinct across bridges created in one process.
pub struct CorrelationIds {
    session: String,
    counter: AtomicU64,
}

impl CorrelationIds {
    pub fn new() -> Self {
        let session = uuid::Uuid::new_v4().simple().to_string();
        Self {
            session: session[..8].to_string(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let millis = chrono::Utc::now().timestamp_millis();
        RequestId::new(format!("{}-{}-{}", self.session, n, millis))
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for CorrelationIds {
    fn default() -> Self {
        Self::new()
    }
}
