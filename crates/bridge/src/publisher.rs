//! Job publisher - hands envelopes to the broker

use observability::BridgeMetrics;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::broker::{Broker, OutboundMessage};
use crate::envelope::{self, JobEnvelope, ENVELOPE_CONTENT_TYPE};
use crate::error::{BridgeError, BridgeResult};
use crate::family::QueueDescriptor;

/// Publishes job envelopes to a family's request exchange.
///
/// Fire-and-forget: a successful return means the broker accepted the
/// message, nothing more. Failures are surfaced as [`BridgeError::Broker`]
/// and never retried here.
#[derive(Clone)]
pub struct JobPublisher {
    broker: Arc<dyn Broker>,
    metrics: BridgeMetrics,
}

impl JobPublisher {
    pub fn new(broker: Arc<dyn Broker>, metrics: BridgeMetrics) -> Self {
        Self { broker, metrics }
    }

    #[instrument(skip(self, envelope, descriptor), fields(job_id = %envelope.correlation_id(), exchange = %descriptor.exchange))]
    pub async fn submit(
        &self,
        envelope: &JobEnvelope,
        descriptor: &QueueDescriptor,
    ) -> BridgeResult<()> {
        let body = envelope::encode(envelope)
            .map_err(|e| BridgeError::broker(format!("Failed to serialize job: {e}")))?;

        let message = OutboundMessage {
            body,
            content_type: ENVELOPE_CONTENT_TYPE.to_string(),
            correlation_id: Some(envelope.correlation_id().to_string()),
            message_id: Some(envelope.correlation_id().to_string()),
        };

        match self
            .broker
            .publish(&descriptor.exchange, &descriptor.routing_key, message)
            .await
        {
            Ok(()) => {
                self.metrics.job_published();
                info!(kind = ?envelope.kind(), routing_key = %descriptor.routing_key, "Job published");
                Ok(())
            }
            Err(e) => {
                self.metrics.publish_failed();
                error!(%e, "Failed to publish job");
                Err(match e {
                    BridgeError::Broker(_) => e,
                    other => BridgeError::broker(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::family::JobFamily;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_submit_publishes_once_with_correlation() {
        let broker = Arc::new(InMemoryBroker::new());
        let publisher = JobPublisher::new(broker.clone(), BridgeMetrics::new("composition"));
        let descriptor = QueueDescriptor::default_for(JobFamily::Composition);

        tokio_test::assert_ok!(
            publisher
                .submit(&JobEnvelope::text("job-7", "curly, 3a"), &descriptor)
                .await
        );

        let published = broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].exchange, "consistence.exchange");
        assert_eq!(published[0].routing_key, "consistence.request.bind");
        assert_eq!(published[0].message.correlation_id.as_deref(), Some("job-7"));
        assert_eq!(published[0].message.content_type, "application/json");

        let decoded = tokio_test::assert_ok!(envelope::decode(&published[0].message.body));
        assert_eq!(decoded, JobEnvelope::text("job-7", "curly, 3a"));
    }

    #[tokio::test]
    async fn test_submit_surfaces_broker_error() {
        let broker = Arc::new(InMemoryBroker::new());
        broker.fail_publishes("connection refused");
        let publisher = JobPublisher::new(broker.clone(), BridgeMetrics::new("porosity"));

        let result = publisher
            .submit(
                &JobEnvelope::image("job-8", vec![1, 2, 3]),
                &QueueDescriptor::default_for(JobFamily::Porosity),
            )
            .await;

        assert_matches!(result, Err(BridgeError::Broker(msg)) if msg.contains("connection refused"));
    }
}
