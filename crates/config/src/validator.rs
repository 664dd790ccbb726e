use crate::*;
use thiserror::Error;
use url::Url;

const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Gateway name is required")]
    MissingGatewayName,

    #[error("{field} must not be 0")]
    ZeroPort { field: String },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} '{value}' is not a valid URL: {message}")]
    InvalidUrl {
        field: String,
        value: String,
        message: String,
    },

    #[error("{field} must use one of the schemes {expected}, got '{scheme}'")]
    UnsupportedScheme {
        field: String,
        scheme: String,
        expected: String,
    },

    #[error("Polling deadline ({deadline_ms} ms) must not be shorter than the interval ({interval_ms} ms)")]
    DeadlineShorterThanInterval { deadline_ms: u64, interval_ms: u64 },

    #[error("gateway.request_timeout_seconds ({timeout_ms} ms) must be longer than the polling deadline ({deadline_ms} ms)")]
    RequestTimeoutTooShort { timeout_ms: u128, deadline_ms: u128 },

    #[error("Family '{family}': {message}")]
    InvalidFamily { family: String, message: String },

    #[error("Families '{first}' and '{second}' share the response queue '{queue}'")]
    SharedResponseQueue {
        first: String,
        second: String,
        queue: String,
    },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Metrics port {port} collides with the HTTP port")]
    MetricsPortCollision { port: u16 },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &LabgateConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_gateway(&config.gateway, &config.polling, &mut report);
    validate_backend(&config.backend, &mut report);
    validate_broker(&config.broker, &mut report);
    validate_polling(&config.polling, &mut report);
    validate_families(&config.families, &mut report);
    validate_logging(&config.logging, &mut report);
    validate_metrics(&config.metrics, config.gateway.http_port, &mut report);

    report
}

fn validate_gateway(gateway: &GatewayConfig, polling: &PollingConfig, report: &mut ValidationReport) {
    if gateway.name.trim().is_empty() {
        report.add_error(ValidationError::MissingGatewayName);
    }

    if gateway.http_port == 0 {
        report.add_error(ValidationError::ZeroPort {
            field: "gateway.http_port".to_string(),
        });
    }

    match gateway.request_timeout_seconds {
        Some(0) => report.add_error(ValidationError::InvalidPositiveInteger {
            field: "gateway.request_timeout_seconds".to_string(),
        }),
        Some(_) => {}
        None => report.add_default(
            "gateway.request_timeout_seconds",
            &default_request_timeout_seconds().to_string(),
        ),
    }

    // The server timeout must never cut a poll short
    let timeout = gateway.request_timeout();
    let deadline = polling.deadline();
    if timeout <= deadline {
        report.add_error(ValidationError::RequestTimeoutTooShort {
            timeout_ms: timeout.as_millis(),
            deadline_ms: deadline.as_millis(),
        });
    }

    match gateway.max_upload_bytes {
        Some(0) => report.add_error(ValidationError::InvalidPositiveInteger {
            field: "gateway.max_upload_bytes".to_string(),
        }),
        Some(_) => {}
        None => report.add_default(
            "gateway.max_upload_bytes",
            &default_max_upload_bytes().to_string(),
        ),
    }
}

fn validate_backend(backend: &BackendConfig, report: &mut ValidationReport) {
    validate_url("backend.base_uri", &backend.base_uri, &["http", "https"], report);

    match backend.timeout_seconds {
        Some(0) => report.add_error(ValidationError::InvalidPositiveInteger {
            field: "backend.timeout_seconds".to_string(),
        }),
        Some(_) => {}
        None => report.add_default(
            "backend.timeout_seconds",
            &default_backend_timeout_seconds().to_string(),
        ),
    }
}

fn validate_broker(broker: &BrokerConfig, report: &mut ValidationReport) {
    match broker.kind {
        BrokerKind::Amqp => {
            validate_url("broker.uri", &broker.uri, &["amqp", "amqps"], report);
        }
        BrokerKind::Memory => {
            report.add_warning(
                "broker.kind",
                "In-memory broker selected; jobs never reach external workers",
            );
        }
    }
}

fn validate_polling(polling: &PollingConfig, report: &mut ValidationReport) {
    let interval_ms = polling.interval_ms.unwrap_or_else(default_poll_interval_ms);
    let deadline_ms = polling.deadline_ms.unwrap_or_else(default_poll_deadline_ms);
    let max_attempts = polling.max_attempts();

    if polling.interval_ms.is_none() {
        report.add_default("polling.interval_ms", &interval_ms.to_string());
    }
    if polling.max_attempts.is_none() {
        report.add_default("polling.max_attempts", &max_attempts.to_string());
    }
    if polling.deadline_ms.is_none() {
        report.add_default("polling.deadline_ms", &deadline_ms.to_string());
    }
    if polling.idempotency_ttl_seconds.is_none() {
        report.add_default(
            "polling.idempotency_ttl_seconds",
            &default_idempotency_ttl_seconds().to_string(),
        );
    }
    if polling.mailbox_capacity.is_none() {
        report.add_default(
            "polling.mailbox_capacity",
            &default_mailbox_capacity().to_string(),
        );
    }
    if polling.mailbox_ttl_seconds.is_none() {
        report.add_default(
            "polling.mailbox_ttl_seconds",
            &default_mailbox_ttl_seconds().to_string(),
        );
    }

    for (field, value) in [
        ("polling.interval_ms", interval_ms),
        ("polling.max_attempts", u64::from(max_attempts)),
        ("polling.deadline_ms", deadline_ms),
    ] {
        if value == 0 {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: field.to_string(),
            });
        }
    }

    for (field, value) in [
        ("polling.idempotency_ttl_seconds", polling.idempotency_ttl_seconds),
        ("polling.mailbox_ttl_seconds", polling.mailbox_ttl_seconds),
    ] {
        if value == Some(0) {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: field.to_string(),
            });
        }
    }

    if polling.correlation == CorrelationSetting::Correlated && polling.mailbox_capacity == Some(0) {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "polling.mailbox_capacity".to_string(),
        });
    }

    if interval_ms == 0 || max_attempts == 0 || deadline_ms == 0 {
        return;
    }

    if deadline_ms < interval_ms {
        report.add_error(ValidationError::DeadlineShorterThanInterval {
            deadline_ms,
            interval_ms,
        });
        return;
    }

    let pass_ms = u64::from(max_attempts).saturating_mul(interval_ms);
    if pass_ms < deadline_ms {
        report.add_warning(
            "polling.max_attempts",
            &format!(
                "A pass of {max_attempts} attempts lasts {pass_ms} ms, shorter than the {deadline_ms} ms deadline; polling continues over several passes"
            ),
        );
    } else if pass_ms > deadline_ms {
        report.add_warning(
            "polling.max_attempts",
            &format!(
                "A pass of {max_attempts} attempts lasts {pass_ms} ms; the {deadline_ms} ms deadline ends it early"
            ),
        );
    }

    if polling.correlation == CorrelationSetting::Shared {
        report.add_warning(
            "polling.correlation",
            "Shared mode hands any reply to whichever request polls first",
        );
    }
}

fn validate_families(families: &FamiliesConfig, report: &mut ValidationReport) {
    let named = [
        ("composition", &families.composition),
        ("porosity", &families.porosity),
    ];

    for (family, queues) in named {
        for (field, value) in [
            ("exchange", &queues.exchange),
            ("routing_key", &queues.routing_key),
            ("request_queue", &queues.request_queue),
            ("response_queue", &queues.response_queue),
            ("response_routing_key", &queues.response_routing_key),
        ] {
            if value.trim().is_empty() {
                report.add_error(ValidationError::InvalidFamily {
                    family: family.to_string(),
                    message: format!("{field} is required"),
                });
            }
        }

        if queues.request_queue == queues.response_queue {
            report.add_error(ValidationError::InvalidFamily {
                family: family.to_string(),
                message: "request_queue and response_queue must differ".to_string(),
            });
        }
    }

    if families.composition.response_queue == families.porosity.response_queue {
        report.add_error(ValidationError::SharedResponseQueue {
            first: "composition".to_string(),
            second: "porosity".to_string(),
            queue: families.composition.response_queue.clone(),
        });
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    if !LOG_FORMATS.contains(&logging.format.to_ascii_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }

    if logging.level.trim().is_empty() {
        report.add_default("logging.level", &default_log_level());
    }
}

fn validate_metrics(metrics: &MetricsConfig, http_port: u16, report: &mut ValidationReport) {
    if !metrics.enabled {
        return;
    }

    if metrics.port == 0 {
        report.add_error(ValidationError::ZeroPort {
            field: "metrics.port".to_string(),
        });
    } else if metrics.port == http_port {
        report.add_error(ValidationError::MetricsPortCollision { port: metrics.port });
    }
}

fn validate_url(field: &str, value: &str, schemes: &[&str], report: &mut ValidationReport) {
    let unresolved = unresolved_env_vars(value);
    if !unresolved.is_empty() {
        for var in unresolved {
            report.add_error(ValidationError::InvalidEnvVar {
                var,
                message: format!("referenced by {field} but not set"),
            });
        }
        return;
    }

    match Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => report.add_error(ValidationError::UnsupportedScheme {
            field: field.to_string(),
            scheme: url.scheme().to_string(),
            expected: schemes.join(", "),
        }),
        Err(e) => report.add_error(ValidationError::InvalidUrl {
            field: field.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        }),
    }
}
