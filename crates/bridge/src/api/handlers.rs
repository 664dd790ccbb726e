//! Analysis endpoint handlers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::HeaderMap,
};
use observability::BridgeMetrics;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::input::AnalysisInput;
use crate::broker::Broker;
use crate::envelope::JobEnvelope;
use crate::error::{BridgeError, BridgeResult};
use crate::family::{JobFamily, QueueDescriptor};
use crate::idempotency::{validate_key, Submission, SubmissionRegistry, IDEMPOTENCY_KEY_HEADER};
use crate::mailbox::ResultMailbox;
use crate::outcome::{AnalysisResponse, Outcome, OutcomeTranslator};
use crate::poller::{CorrelationMode, PollSettings, ResultMatcher, ResultPoller};
use crate::publisher::JobPublisher;

/// Everything one job family needs to bridge a request
#[derive(Clone)]
pub struct FamilyBridge {
    pub family: JobFamily,
    pub descriptor: QueueDescriptor,
    pub publisher: JobPublisher,
    pub poller: ResultPoller,
    /// Idempotency keys are scoped to the family they were published on
    pub submissions: Arc<SubmissionRegistry>,
    pub metrics: BridgeMetrics,
}

impl FamilyBridge {
    pub fn new(
        family: JobFamily,
        descriptor: QueueDescriptor,
        broker: Arc<dyn Broker>,
        settings: PollSettings,
        mailbox: Arc<ResultMailbox>,
        submissions: Arc<SubmissionRegistry>,
    ) -> Self {
        let metrics = BridgeMetrics::new(family.as_str());
        Self {
            family,
            descriptor,
            publisher: JobPublisher::new(broker.clone(), metrics.clone()),
            poller: ResultPoller::new(broker, mailbox, settings, metrics.clone()),
            submissions,
            metrics,
        }
    }
}

/// Shared state of the analysis endpoints
#[derive(Clone)]
pub struct AnalysisState {
    pub composition: Arc<FamilyBridge>,
    pub porosity: Arc<FamilyBridge>,
    pub correlation: CorrelationMode,
    /// Cancelled on server shutdown; every poll runs under a child token
    pub shutdown: CancellationToken,
}

impl AnalysisState {
    pub fn family(&self, family: JobFamily) -> &FamilyBridge {
        match family {
            JobFamily::Composition => &self.composition,
            JobFamily::Porosity => &self.porosity,
        }
    }
}

/// Builder-style construction of [`AnalysisState`]
pub struct AnalysisStateBuilder {
    broker: Arc<dyn Broker>,
    settings: PollSettings,
    correlation: CorrelationMode,
    mailbox_capacity: usize,
    mailbox_ttl: Duration,
    idempotency_ttl: Duration,
    composition: QueueDescriptor,
    porosity: QueueDescriptor,
    shutdown: CancellationToken,
}

impl AnalysisStateBuilder {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            settings: PollSettings::default(),
            correlation: CorrelationMode::default(),
            mailbox_capacity: 1024,
            mailbox_ttl: Duration::from_secs(300),
            idempotency_ttl: Duration::from_secs(300),
            composition: QueueDescriptor::default_for(JobFamily::Composition),
            porosity: QueueDescriptor::default_for(JobFamily::Porosity),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn poll_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn correlation(mut self, mode: CorrelationMode) -> Self {
        self.correlation = mode;
        self
    }

    pub fn mailbox(mut self, capacity: usize, ttl: Duration) -> Self {
        self.mailbox_capacity = capacity;
        self.mailbox_ttl = ttl;
        self
    }

    pub fn idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.idempotency_ttl = ttl;
        self
    }

    pub fn descriptor(mut self, family: JobFamily, descriptor: QueueDescriptor) -> Self {
        match family {
            JobFamily::Composition => self.composition = descriptor,
            JobFamily::Porosity => self.porosity = descriptor,
        }
        self
    }

    pub fn shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn build(self) -> BridgeResult<AnalysisState> {
        self.settings.validate()?;
        if self.composition.response_queue == self.porosity.response_queue {
            return Err(BridgeError::Config(
                "job families must not share a response queue".into(),
            ));
        }

        let bridge = |family, descriptor| {
            Arc::new(FamilyBridge::new(
                family,
                descriptor,
                self.broker.clone(),
                self.settings,
                Arc::new(ResultMailbox::new(self.mailbox_capacity, self.mailbox_ttl)),
                Arc::new(SubmissionRegistry::new(self.idempotency_ttl)),
            ))
        };

        Ok(AnalysisState {
            composition: bridge(JobFamily::Composition, self.composition.clone()),
            porosity: bridge(JobFamily::Porosity, self.porosity.clone()),
            correlation: self.correlation,
            shutdown: self.shutdown.clone(),
        })
    }
}

/// Query of the single-check endpoint
#[derive(Debug, Default, Deserialize)]
pub struct CheckParams {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

/// `POST /composition/analyze`
pub async fn analyze_composition(
    State(state): State<AnalysisState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AnalysisResponse {
    analyze(&state, JobFamily::Composition, &headers, multipart).await
}

/// `POST /analyze`
pub async fn analyze_porosity(
    State(state): State<AnalysisState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AnalysisResponse {
    analyze(&state, JobFamily::Porosity, &headers, multipart).await
}

/// `GET /composition/analyze[?jobId=]`
pub async fn check_composition(
    State(state): State<AnalysisState>,
    Query(params): Query<CheckParams>,
) -> AnalysisResponse {
    let bridge = state.family(JobFamily::Composition);

    let job_id = params.job_id.filter(|id| !id.trim().is_empty());
    let matcher = match (&job_id, state.correlation) {
        (Some(id), CorrelationMode::Correlated) => ResultMatcher::Correlated(id.trim().to_string()),
        _ => ResultMatcher::Any,
    };

    let outcome = match bridge
        .poller
        .check_once(&bridge.descriptor.response_queue, &matcher)
        .await
    {
        Outcome::Failed(reason) => Outcome::Failed(format!("Failed to get result: {reason}")),
        other => other,
    };

    bridge.metrics.record_outcome(outcome.label());
    OutcomeTranslator::translate(outcome, job_id.as_deref().map(str::trim))
}

async fn analyze(
    state: &AnalysisState,
    family: JobFamily,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AnalysisResponse {
    match run_analysis(state, family, headers, multipart).await {
        Ok(response) => response,
        Err(e) => {
            if e.is_client_error() {
                info!(%family, error = %e, "Rejected analysis request");
            } else {
                warn!(%family, error = %e, "Analysis request failed");
            }
            let label = if e.is_client_error() { "rejected" } else { "failed" };
            state.family(family).metrics.record_outcome(label);
            OutcomeTranslator::from_error(&e)
        }
    }
}

#[instrument(skip_all, fields(%family, job_id = tracing::field::Empty))]
async fn run_analysis(
    state: &AnalysisState,
    family: JobFamily,
    headers: &HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> BridgeResult<AnalysisResponse> {
    let bridge = state.family(family);

    let multipart = multipart.map_err(|e| {
        BridgeError::client_input(format!("Expected a multipart/form-data body: {}", e.body_text()))
    })?;
    let client_key = idempotency_key(headers)?;
    let payload = AnalysisInput::from_multipart(multipart)
        .await?
        .into_payload(family)?;

    let job_id = client_key
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    tracing::Span::current().record("job_id", job_id.as_str());

    let submission = match &client_key {
        Some(key) => bridge.submissions.begin(key),
        None => Submission::Fresh,
    };

    match submission {
        Submission::Fresh => {
            let envelope = JobEnvelope::new(job_id.clone(), payload);
            if let Err(e) = bridge.publisher.submit(&envelope, &bridge.descriptor).await {
                if let Some(key) = &client_key {
                    bridge.submissions.forget(key);
                }
                return Err(e);
            }
        }
        Submission::Duplicate => {
            info!("Job already submitted with this idempotency key, resuming poll");
        }
    }

    let cancel = state.shutdown.child_token();
    let matcher = state.correlation.matcher_for(&job_id);
    let report = bridge
        .poller
        .poll(&bridge.descriptor.response_queue, &matcher, &cancel)
        .await;

    bridge.metrics.record_outcome(report.outcome.label());
    Ok(OutcomeTranslator::translate(report.outcome, Some(&job_id)))
}

fn idempotency_key(headers: &HeaderMap) -> BridgeResult<Option<String>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| BridgeError::client_input("Idempotency-Key must be visible ASCII"))?;
    validate_key(raw)
        .map(|key| Some(key.to_string()))
        .map_err(BridgeError::client_input)
}
