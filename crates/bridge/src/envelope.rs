//! Job envelope and its wire codec
//!
//! An envelope is the unit of work placed on the broker. Image bytes travel
//! as standard base64 in a `file` field; text travels verbatim in `text`.
//!
//! ```text
//! {"kind":"image","file":"iVBORw0KGgo...","correlationId":"5f0c..."}
//! {"kind":"text","text":"curly, 3a","correlationId":"5f0c..."}
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

/// Content type of every encoded envelope
pub const ENVELOPE_CONTENT_TYPE: &str = "application/json";

/// Kind tag carried by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Image,
    Text,
}

/// Payload of a job; the variant always matches the kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    Image(Vec<u8>),
    Text(String),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Image(_) => JobKind::Image,
            JobPayload::Text(_) => JobKind::Text,
        }
    }
}

/// Immutable unit of work submitted to a worker queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEnvelope {
    correlation_id: String,
    payload: JobPayload,
}

impl JobEnvelope {
    pub fn new(correlation_id: impl Into<String>, payload: JobPayload) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            payload,
        }
    }

    pub fn image(correlation_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(correlation_id, JobPayload::Image(bytes))
    }

    pub fn text(correlation_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(correlation_id, JobPayload::Text(text.into()))
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn kind(&self) -> JobKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    kind: JobKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    correlation_id: String,
}

/// Serialize an envelope to its JSON wire form
pub fn encode(envelope: &JobEnvelope) -> BridgeResult<Vec<u8>> {
    let (file, text) = match &envelope.payload {
        JobPayload::Image(bytes) => (Some(STANDARD.encode(bytes)), None),
        JobPayload::Text(text) => (None, Some(text.clone())),
    };

    let wire = WireEnvelope {
        kind: envelope.kind(),
        file,
        text,
        correlation_id: envelope.correlation_id.clone(),
    };

    Ok(serde_json::to_vec(&wire)?)
}

/// Parse an envelope from its JSON wire form
pub fn decode(bytes: &[u8]) -> BridgeResult<JobEnvelope> {
    let wire: WireEnvelope = serde_json::from_slice(bytes)?;

    let payload = match (wire.kind, wire.file, wire.text) {
        (JobKind::Image, Some(file), None) => {
            let bytes = STANDARD
                .decode(file.as_bytes())
                .map_err(|e| BridgeError::decode(format!("invalid base64 image: {e}")))?;
            JobPayload::Image(bytes)
        }
        (JobKind::Text, None, Some(text)) => JobPayload::Text(text),
        (kind, file, text) => {
            return Err(BridgeError::decode(format!(
                "envelope of kind {:?} must carry exactly one matching payload (file: {}, text: {})",
                kind,
                file.is_some(),
                text.is_some()
            )));
        }
    };

    Ok(JobEnvelope::new(wire.correlation_id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_image_envelope_round_trip() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x00, 0xff, 0x10];
        let envelope = JobEnvelope::image("job-1", bytes.clone());

        let decoded = decode(&encode(&envelope).unwrap()).unwrap();

        assert_eq!(decoded, envelope);
        assert_eq!(decoded.payload(), &JobPayload::Image(bytes));
    }

    #[test]
    fn test_text_envelope_round_trip() {
        let envelope = JobEnvelope::text("job-2", "curly, 3a");
        let decoded = decode(&encode(&envelope).unwrap()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.kind(), JobKind::Text);
    }

    #[test]
    fn test_wire_shape() {
        let envelope = JobEnvelope::image("abc", b"hi".to_vec());
        let value: serde_json::Value = serde_json::from_slice(&encode(&envelope).unwrap()).unwrap();

        assert_eq!(value["kind"], "image");
        assert_eq!(value["file"], "aGk=");
        assert_eq!(value["correlationId"], "abc");
        assert!(value.get("text").is_none());
    }

    #[test]
    fn test_decode_rejects_mismatched_payload() {
        let raw = br#"{"kind":"image","text":"oops","correlationId":"x"}"#;
        assert_matches!(decode(raw), Err(BridgeError::Decode(_)));

        let raw = br#"{"kind":"text","text":"a","file":"aGk=","correlationId":"x"}"#;
        assert_matches!(decode(raw), Err(BridgeError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let raw = br#"{"kind":"image","file":"***","correlationId":"x"}"#;
        assert_matches!(decode(raw), Err(BridgeError::Decode(msg)) if msg.contains("base64"));
    }
}
