//! Job families and their broker topology

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named category of asynchronous analysis work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobFamily {
    /// Product composition analysis (image or text)
    Composition,
    /// Hair porosity analysis (image only)
    Porosity,
}

impl JobFamily {
    pub const ALL: [JobFamily; 2] = [JobFamily::Composition, JobFamily::Porosity];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobFamily::Composition => "composition",
            JobFamily::Porosity => "porosity",
        }
    }

    /// Whether plain text is an acceptable payload for this family
    pub fn accepts_text(&self) -> bool {
        matches!(self, JobFamily::Composition)
    }
}

impl fmt::Display for JobFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static broker coordinates for one job family.
///
/// Requests go to `exchange` with `routing_key`; workers reply onto
/// `response_queue`, which is bound to the same exchange with
/// `response_routing_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDescriptor {
    pub exchange: String,
    pub routing_key: String,
    pub request_queue: String,
    pub response_queue: String,
    pub response_routing_key: String,
}

impl QueueDescriptor {
    /// Build a descriptor following the `<prefix>.exchange` / `<prefix>.request.bind`
    /// / `<prefix>.requests` / `<prefix>.responses` naming scheme
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            exchange: format!("{prefix}.exchange"),
            routing_key: format!("{prefix}.request.bind"),
            request_queue: format!("{prefix}.requests"),
            response_queue: format!("{prefix}.responses"),
            response_routing_key: format!("{prefix}.response.bind"),
        }
    }

    /// Default topology for a family as deployed alongside the workers
    pub fn default_for(family: JobFamily) -> Self {
        match family {
            JobFamily::Composition => Self::with_prefix("consistence"),
            JobFamily::Porosity => Self::with_prefix("hairType"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_composition_topology() {
        let d = QueueDescriptor::default_for(JobFamily::Composition);
        assert_eq!(d.exchange, "consistence.exchange");
        assert_eq!(d.routing_key, "consistence.request.bind");
        assert_eq!(d.request_queue, "consistence.requests");
        assert_eq!(d.response_queue, "consistence.responses");
        assert_eq!(d.response_routing_key, "consistence.response.bind");
    }

    #[test]
    fn test_default_porosity_topology() {
        let d = QueueDescriptor::default_for(JobFamily::Porosity);
        assert_eq!(d.exchange, "hairType.exchange");
        assert_eq!(d.response_queue, "hairType.responses");
    }

    #[test]
    fn test_family_accepts_text() {
        assert!(JobFamily::Composition.accepts_text());
        assert!(!JobFamily::Porosity.accepts_text());
        assert_eq!(JobFamily::Porosity.to_string(), "porosity");
    }
}
