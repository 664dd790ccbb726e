//! In-memory broker implementation

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::broker::traits::{Broker, InboundMessage, OutboundMessage};
use crate::error::{BridgeError, BridgeResult};
use crate::family::QueueDescriptor;

/// A message accepted by [`InMemoryBroker::publish`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub message: OutboundMessage,
}

#[derive(Debug)]
struct DelayedDelivery {
    visible_after: u64,
    message: InboundMessage,
}

#[derive(Default)]
struct State {
    bindings: HashMap<(String, String), String>,
    queues: HashMap<String, VecDeque<InboundMessage>>,
    delayed: HashMap<String, Vec<DelayedDelivery>>,
    receives: HashMap<String, u64>,
    published: Vec<PublishedMessage>,
    publish_failure: Option<String>,
    receive_failure: Option<String>,
}

/// In-memory broker for testing and local development.
///
/// Published messages are routed through exchange/routing-key bindings into
/// FIFO queues. Every `receive_no_wait` call is counted per queue, which lets
/// tests assert exactly how often a poller touched the broker.
#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<State>,
}

impl InMemoryBroker {
    /// Create an empty broker with no bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `exchange`/`routing_key` to `queue`
    pub fn bind(&self, exchange: &str, routing_key: &str, queue: &str) {
        let mut state = self.state.lock();
        state
            .bindings
            .insert((exchange.to_string(), routing_key.to_string()), queue.to_string());
        state.queues.entry(queue.to_string()).or_default();
    }

    /// Put a message straight onto a queue, as a worker reply would
    pub fn deposit(&self, queue: &str, message: InboundMessage) {
        self.state
            .lock()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
    }

    /// Put a message onto a queue once it has been received from `receives` times
    pub fn deposit_after(&self, queue: &str, receives: u64, message: InboundMessage) {
        self.state
            .lock()
            .delayed
            .entry(queue.to_string())
            .or_default()
            .push(DelayedDelivery {
                visible_after: receives,
                message,
            });
    }

    /// Make every subsequent publish fail with `reason`
    pub fn fail_publishes(&self, reason: impl Into<String>) {
        self.state.lock().publish_failure = Some(reason.into());
    }

    /// Make every subsequent receive fail with `reason`
    pub fn fail_receives(&self, reason: impl Into<String>) {
        self.state.lock().receive_failure = Some(reason.into());
    }

    /// Number of `receive_no_wait` calls made against `queue`
    pub fn receive_count(&self, queue: &str) -> u64 {
        self.state.lock().receives.get(queue).copied().unwrap_or(0)
    }

    /// Every message accepted so far, in publish order
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().published.clone()
    }

    /// Number of messages waiting on `queue`
    pub fn queue_len(&self, queue: &str) -> usize {
        self.state.lock().queues.get(queue).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutboundMessage,
    ) -> BridgeResult<()> {
        let mut state = self.state.lock();

        if let Some(reason) = &state.publish_failure {
            return Err(BridgeError::broker(reason.clone()));
        }

        let key = (exchange.to_string(), routing_key.to_string());
        if let Some(queue) = state.bindings.get(&key).cloned() {
            let inbound = InboundMessage {
                body: message.body.clone(),
                correlation_id: message.correlation_id.clone(),
            };
            state.queues.entry(queue).or_default().push_back(inbound);
        }

        state.published.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            message,
        });
        Ok(())
    }

    async fn receive_no_wait(&self, queue: &str) -> BridgeResult<Option<InboundMessage>> {
        let mut state = self.state.lock();

        let count = {
            let counter = state.receives.entry(queue.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        if let Some(reason) = &state.receive_failure {
            return Err(BridgeError::broker(reason.clone()));
        }

        // Release delayed deliveries whose threshold has been reached
        let ready: Vec<InboundMessage> = match state.delayed.get_mut(queue) {
            Some(pending) => {
                let (ready, waiting): (Vec<_>, Vec<_>) =
                    pending.drain(..).partition(|d| d.visible_after < count);
                *pending = waiting;
                ready.into_iter().map(|d| d.message).collect()
            }
            None => Vec::new(),
        };

        let messages = state.queues.entry(queue.to_string()).or_default();
        messages.extend(ready);
        Ok(messages.pop_front())
    }

    async fn declare_topology(&self, descriptors: &[QueueDescriptor]) -> BridgeResult<()> {
        for d in descriptors {
            self.bind(&d.exchange, &d.routing_key, &d.request_queue);
            self.bind(&d.exchange, &d.response_routing_key, &d.response_queue);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }
}
