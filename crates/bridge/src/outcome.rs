//! Terminal poll outcomes and their HTTP translation
//!
//! | Outcome      | Status | Body                                               |
//! |--------------|--------|----------------------------------------------------|
//! | Completed    | 200    | `{"status":"completed","result":…}`                |
//! | Pending      | 202    | `{"status":"processing","message":…,"jobId":…}`    |
//! | TimedOut     | 202    | `{"status":"timed_out","message":…,"jobId":…}`     |
//! | Failed       | 500    | `{"error":…}`                                      |
//! | Cancelled    | 503    | `{"error":"Request cancelled"}`                    |

use serde_json::{json, Value};

use crate::error::BridgeError;

pub const TIMED_OUT_MESSAGE: &str = "Analysis takes too much time";
pub const PROCESSING_MESSAGE: &str = "Analysis still in progress";

/// Terminal state of one bridged request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A worker result was received
    Completed(Value),
    /// Single check found nothing yet
    Pending,
    /// The poll deadline elapsed without a result
    TimedOut,
    /// Broker or decode failure
    Failed(String),
    /// The request was cancelled while polling (server shutdown)
    Cancelled,
}

impl Outcome {
    /// Stable label for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Completed(_) => "completed",
            Outcome::Pending => "pending",
            Outcome::TimedOut => "timed_out",
            Outcome::Failed(_) => "failed",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// HTTP-facing result: status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    pub status: u16,
    pub body: Value,
}

impl AnalysisResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "error": message.into() }))
    }
}

/// Maps outcomes and errors onto the fixed response table
pub struct OutcomeTranslator;

impl OutcomeTranslator {
    pub fn translate(outcome: Outcome, job_id: Option<&str>) -> AnalysisResponse {
        match outcome {
            Outcome::Completed(result) => AnalysisResponse::new(
                200,
                json!({
                    "status": "completed",
                    "result": result,
                }),
            ),
            Outcome::Pending => AnalysisResponse::new(
                202,
                with_job_id(
                    json!({
                        "status": "processing",
                        "message": PROCESSING_MESSAGE,
                    }),
                    job_id,
                ),
            ),
            Outcome::TimedOut => AnalysisResponse::new(
                202,
                with_job_id(
                    json!({
                        "status": "timed_out",
                        "message": TIMED_OUT_MESSAGE,
                    }),
                    job_id,
                ),
            ),
            Outcome::Failed(reason) => AnalysisResponse::error(500, reason),
            Outcome::Cancelled => AnalysisResponse::error(503, "Request cancelled"),
        }
    }

    /// Translate an error raised before polling started
    pub fn from_error(error: &BridgeError) -> AnalysisResponse {
        match error {
            BridgeError::ClientInput(msg) => AnalysisResponse::error(400, msg.clone()),
            BridgeError::Broker(msg) => {
                AnalysisResponse::error(500, format!("Failed to submit analysis job: {msg}"))
            }
            other => AnalysisResponse::error(500, other.to_string()),
        }
    }
}

fn with_job_id(mut body: Value, job_id: Option<&str>) -> Value {
    if let (Some(id), Some(map)) = (job_id, body.as_object_mut()) {
        map.insert("jobId".to_string(), Value::String(id.to_string()));
    }
    body
}
