//! Multipart extraction and payload validation

use axum::extract::Multipart;
use tracing::debug;

use crate::envelope::JobPayload;
use crate::error::{BridgeError, BridgeResult};
use crate::family::JobFamily;

/// Multipart field carrying the image bytes
pub const FILE_FIELD: &str = "file";
/// Multipart field carrying the free-text description
pub const TEXT_FIELD: &str = "text";

/// A received `file` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
    }
}

/// Raw analysis request as read from the multipart body
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnalysisInput {
    pub file: Option<FilePart>,
    pub text: Option<String>,
}

impl AnalysisInput {
    /// Read the `file` and `text` parts; other parts are ignored
    pub async fn from_multipart(mut multipart: Multipart) -> BridgeResult<Self> {
        let mut input = AnalysisInput::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| BridgeError::client_input(format!("Malformed multipart body: {e}")))?
        {
            match field.name() {
                Some(FILE_FIELD) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| {
                        BridgeError::client_input(format!("Failed to read file part: {e}"))
                    })?;
                    input.file = Some(FilePart {
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                Some(TEXT_FIELD) => {
                    let text = field.text().await.map_err(|e| {
                        BridgeError::client_input(format!("Failed to read text part: {e}"))
                    })?;
                    input.text = Some(text);
                }
                other => debug!(field = ?other, "Ignoring unknown multipart field"),
            }
        }

        Ok(input)
    }

    /// Validate against the family's rules and produce the job payload.
    ///
    /// Exactly one of `file` and `text` must be present; a blank `text` counts
    /// as absent. Files must carry an `image/*` content type.
    pub fn into_payload(self, family: JobFamily) -> BridgeResult<JobPayload> {
        let text = self.text.filter(|t| !t.trim().is_empty());

        if text.is_some() && !family.accepts_text() {
            return Err(BridgeError::client_input(format!(
                "{family} analysis only accepts an image file"
            )));
        }

        match (self.file, text) {
            (Some(_), Some(_)) => Err(BridgeError::client_input(
                "Provide either a file or text, not both",
            )),
            (None, None) if family.accepts_text() => Err(BridgeError::client_input(
                "Either a file or text must be provided",
            )),
            (None, None) => Err(BridgeError::client_input("File is required")),
            (Some(file), None) if !file.is_image() => {
                Err(BridgeError::client_input("File must be an image"))
            }
            (Some(file), None) => Ok(JobPayload::Image(file.bytes)),
            (None, Some(text)) => Ok(JobPayload::Text(text)),
        }
    }
}
