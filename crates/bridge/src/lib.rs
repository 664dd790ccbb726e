//! Asynchronous job bridge for labgate
//!
//! Turns a long-running analysis request into a broker job and resolves the
//! original HTTP request by polling the family's response queue under a
//! bounded time budget.
//!
//! # Features
//!
//! - Job envelope codec (base64 image or plain text)
//! - Broker port with RabbitMQ and in-memory adapters
//! - Cancellable, deadline-bounded result polling
//! - Correlation of replies to requests, with a parking mailbox
//! - Idempotent submission under client retries
//! - Outcome to HTTP status translation
//!
//! # Feature Flags
//!
//! - `api` - Enable the HTTP analysis endpoints (default)
//! - `amqp` - Enable the RabbitMQ broker adapter

pub mod broker;
pub mod envelope;
pub mod error;
pub mod family;
pub mod idempotency;
pub mod mailbox;
pub mod outcome;
pub mod poller;
pub mod publisher;

#[cfg(feature = "api")]
pub mod api;

// Re-export commonly used types
pub use envelope::{JobEnvelope, JobKind, JobPayload};
pub use error::{BridgeError, BridgeResult};
pub use family::{JobFamily, QueueDescriptor};
pub use idempotency::{Submission, SubmissionRegistry, IDEMPOTENCY_KEY_HEADER};
pub use mailbox::ResultMailbox;
pub use outcome::{AnalysisResponse, Outcome, OutcomeTranslator};
pub use poller::{CorrelationMode, PollReport, PollSettings, ResultMatcher, ResultPoller};
pub use publisher::JobPublisher;

// Broker exports
pub use broker::{redact_uri, Broker, InMemoryBroker, InboundMessage, OutboundMessage};

#[cfg(feature = "amqp")]
pub use broker::AmqpBroker;

#[cfg(feature = "api")]
pub use api::{create_router, AnalysisState, AnalysisStateBuilder};
