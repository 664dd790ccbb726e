//! Client-supplied idempotency keys
//!
//! A retry that carries the same `Idempotency-Key` as an earlier request must
//! not publish a second job. The registry remembers which keys were published
//! recently; a repeated key resumes polling for the existing job instead.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// HTTP header carrying a client-chosen job identifier
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Result of registering a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// First time this key is seen; the job must be published
    Fresh,
    /// The key was already published within the retention window
    Duplicate,
}

/// Remembers recently published job keys
pub struct SubmissionRegistry {
    seen: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
}

impl SubmissionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Record `key` and report whether it was already submitted
    pub fn begin(&self, key: &str) -> Submission {
        let now = Instant::now();
        let mut seen = self.seen.lock();
        seen.retain(|_, at| now.duration_since(*at) < self.ttl);

        if seen.contains_key(key) {
            Submission::Duplicate
        } else {
            seen.insert(key.to_string(), now);
            Submission::Fresh
        }
    }

    /// Drop `key` so a later retry publishes again (used when publishing failed)
    pub fn forget(&self, key: &str) {
        self.seen.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validate a client-supplied key: non-empty, at most 128 visible ASCII characters
pub fn validate_key(key: &str) -> Result<&str, String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("Idempotency-Key must not be empty".to_string());
    }
    if key.len() > 128 || !key.chars().all(|c| c.is_ascii_graphic()) {
        return Err("Idempotency-Key must be at most 128 visible ASCII characters".to_string());
    }
    Ok(key)
}
