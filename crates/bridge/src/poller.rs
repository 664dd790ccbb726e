//! Result poller - bounded, cancellable polling of a response queue
//!
//! The poller attempts one non-blocking receive per cadence tick. The first
//! tick fires immediately. A polling pass ends after `max_attempts` receives;
//! further passes continue on the same cadence until the overall deadline.
//! The deadline is checked at every tick, so no receive starts after it has
//! passed. A receive already in flight runs to completion because the broker
//! may have dequeued the reply; only cancellation interrupts it.

use observability::BridgeMetrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::broker::{Broker, InboundMessage};
use crate::error::{BridgeError, BridgeResult};
use crate::mailbox::ResultMailbox;
use crate::outcome::Outcome;

/// Default delay between receive attempts
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
/// Default number of receive attempts per polling pass
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Default overall polling budget
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Timing parameters for a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    pub deadline: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl PollSettings {
    pub fn validate(&self) -> BridgeResult<()> {
        if self.interval.is_zero() {
            return Err(BridgeError::Config("poll interval must be positive".into()));
        }
        if self.max_attempts == 0 {
            return Err(BridgeError::Config("max_attempts must be positive".into()));
        }
        if self.deadline < self.interval {
            return Err(BridgeError::Config(
                "poll deadline must be at least one interval".into(),
            ));
        }
        Ok(())
    }

    /// Receive attempts made when no result ever arrives
    pub fn expected_attempts(&self) -> u64 {
        let interval = self.interval.as_nanos();
        self.deadline.as_nanos().div_ceil(interval) as u64
    }
}

/// Which replies a poll is willing to accept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultMatcher {
    /// First reply on the queue, whoever it belongs to
    Any,
    /// Only the reply carrying this correlation id (or an untagged legacy reply)
    Correlated(String),
}

impl ResultMatcher {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            ResultMatcher::Any => None,
            ResultMatcher::Correlated(id) => Some(id),
        }
    }
}

/// How replies on a shared response queue are matched to requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorrelationMode {
    /// Each request only takes the reply carrying its own job id
    #[default]
    Correlated,
    /// Each request takes whatever reply is next on the queue
    Shared,
}

impl CorrelationMode {
    pub fn matcher_for(&self, job_id: &str) -> ResultMatcher {
        match self {
            CorrelationMode::Correlated => ResultMatcher::Correlated(job_id.to_string()),
            CorrelationMode::Shared => ResultMatcher::Any,
        }
    }
}

/// One receive attempt within a poll cycle
#[derive(Debug)]
pub struct PollAttempt {
    pub attempt_index: u32,
    pub received: Option<InboundMessage>,
}

/// Outcome of a poll plus how it got there
#[derive(Debug)]
pub struct PollReport {
    pub outcome: Outcome,
    pub attempts: u32,
    pub passes: u32,
    pub elapsed: Duration,
}

/// Polls a response queue for worker results
#[derive(Clone)]
pub struct ResultPoller {
    broker: Arc<dyn Broker>,
    mailbox: Arc<ResultMailbox>,
    settings: PollSettings,
    metrics: BridgeMetrics,
}

impl ResultPoller {
    pub fn new(
        broker: Arc<dyn Broker>,
        mailbox: Arc<ResultMailbox>,
        settings: PollSettings,
        metrics: BridgeMetrics,
    ) -> Self {
        Self {
            broker,
            mailbox,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Poll `queue` until a matching result arrives, the deadline passes,
    /// or `cancel` fires.
    pub async fn poll(
        &self,
        queue: &str,
        matcher: &ResultMatcher,
        cancel: &CancellationToken,
    ) -> PollReport {
        let started = Instant::now();
        let deadline = started + self.settings.deadline;

        let mut ticker = tokio::time::interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts = 0u32;
        let mut passes = 1u32;
        let mut attempts_in_pass = 0u32;

        debug!(queue, job_id = ?matcher.job_id(), deadline_ms = self.settings.deadline.as_millis() as u64, "Polling for result");

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break Outcome::Cancelled,
                _ = tokio::time::sleep_until(deadline) => break Outcome::TimedOut,
                _ = ticker.tick() => {}
            }

            if attempts_in_pass == self.settings.max_attempts {
                passes += 1;
                attempts_in_pass = 0;
                debug!(queue, attempts, pass = passes, "Polling pass exhausted, starting a fresh pass");
            }

            attempts += 1;
            attempts_in_pass += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Outcome::Cancelled,
                result = self.attempt(queue, matcher, attempts) => result,
            };

            match result {
                Ok(Some(value)) => break Outcome::Completed(value),
                Ok(None) => continue,
                Err(e) => break Outcome::Failed(e.to_string()),
            }
        };

        let elapsed = started.elapsed();
        self.metrics.record_poll(elapsed);
        info!(
            queue,
            outcome = outcome.label(),
            attempts,
            passes,
            elapsed_ms = elapsed.as_millis() as u64,
            "Polling finished"
        );

        PollReport {
            outcome,
            attempts,
            passes,
            elapsed,
        }
    }

    /// Single non-blocking check for a result: `Completed`, `Pending` or `Failed`
    pub async fn check_once(&self, queue: &str, matcher: &ResultMatcher) -> Outcome {
        match self.attempt(queue, matcher, 1).await {
            Ok(Some(value)) => Outcome::Completed(value),
            Ok(None) => Outcome::Pending,
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    /// One tick: look in the mailbox, then ask the broker once
    async fn attempt(
        &self,
        queue: &str,
        matcher: &ResultMatcher,
        attempt_index: u32,
    ) -> BridgeResult<Option<Value>> {
        if let ResultMatcher::Correlated(id) = matcher {
            if let Some(parked) = self.mailbox.take(id) {
                debug!(job_id = %id, "Result found in mailbox");
                return decode_result(&parked).map(|(_, value)| Some(value));
            }
        }

        self.metrics.broker_receive();
        let attempt = PollAttempt {
            attempt_index,
            received: self.broker.receive_no_wait(queue).await?,
        };
        trace!(queue, attempt = attempt.attempt_index, received = attempt.received.is_some(), "Receive attempt");

        let Some(message) = attempt.received else {
            return Ok(None);
        };

        let (correlation_id, value) = decode_result(&message)?;

        match (matcher, correlation_id) {
            (ResultMatcher::Any, _) => Ok(Some(value)),
            (ResultMatcher::Correlated(wanted), Some(found)) if *wanted == found => Ok(Some(value)),
            (ResultMatcher::Correlated(_), Some(other)) => {
                self.mailbox.park(other, message);
                Ok(None)
            }
            (ResultMatcher::Correlated(wanted), None) => {
                warn!(job_id = %wanted, queue, "Accepting reply without correlation id");
                Ok(Some(value))
            }
        }
    }
}

/// Decode a worker reply into its correlation id and result value.
///
/// The correlation id comes from the message properties, or failing that
/// from a top-level `correlationId` field, which is removed from the result.
pub fn decode_result(message: &InboundMessage) -> BridgeResult<(Option<String>, Value)> {
    let mut value: Value = serde_json::from_slice(&message.body)
        .map_err(|e| BridgeError::decode(format!("Malformed result message: {e}")))?;

    let embedded = value
        .as_object_mut()
        .and_then(|map| map.remove("correlationId"))
        .and_then(|id| id.as_str().map(str::to_string));

    Ok((message.correlation_id.clone().or(embedded), value))
}
