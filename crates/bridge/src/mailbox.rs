//! Parking area for replies that reached the wrong poller
//!
//! Response queues are shared by every in-flight request of a family. When a
//! poller receives a reply tagged with somebody else's correlation id it
//! parks the reply here; the owner finds it on its next tick without going
//! back to the broker.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::broker::InboundMessage;

struct Parked {
    message: InboundMessage,
    parked_at: Instant,
}

/// Bounded, time-limited map of correlation id to parked reply
pub struct ResultMailbox {
    entries: Mutex<HashMap<String, Parked>>,
    capacity: usize,
    ttl: Duration,
}

impl ResultMailbox {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    /// Park a reply under its correlation id, evicting expired or oldest entries when full
    pub fn park(&self, correlation_id: impl Into<String>, message: InboundMessage) {
        let correlation_id = correlation_id.into();
        let mut entries = self.entries.lock();

        let now = Instant::now();
        entries.retain(|_, p| now.duration_since(p.parked_at) < self.ttl);

        if entries.len() >= self.capacity && !entries.contains_key(&correlation_id) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, p)| p.parked_at)
                .map(|(id, _)| id.clone());
            if let Some(id) = oldest {
                warn!(correlation_id = %id, "Mailbox full, dropping oldest parked reply");
                entries.remove(&id);
            }
        }

        debug!(%correlation_id, "Parked reply for another request");
        entries.insert(
            correlation_id,
            Parked {
                message,
                parked_at: now,
            },
        );
    }

    /// Take the reply parked for `correlation_id`, if any and not expired
    pub fn take(&self, correlation_id: &str) -> Option<InboundMessage> {
        let parked = self.entries.lock().remove(correlation_id)?;
        if parked.parked_at.elapsed() < self.ttl {
            Some(parked.message)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultMailbox {
    fn default() -> Self {
        Self::new(1024, Duration::from_secs(300))
    }
}
