//! Port validation utilities
//!
//! Checking a port before binding is inherently racy: another process can
//! take it in between. These checks give early feedback at startup; the bind
//! itself is the source of truth.

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Validate that the configured HTTP port (and any extra ports) can be bound
pub async fn validate_ports_available(config: &ServerConfig, extra: &[(&str, u16)]) -> Result<()> {
    info!("Validating server ports...");

    let mut ports_to_check = vec![("HTTP", config.http_port)];
    ports_to_check.extend_from_slice(extra);

    for (purpose, port) in ports_to_check {
        if port == 0 {
            debug!("{} port is ephemeral, skipping check", purpose);
            continue;
        }
        validate_single_port(&config.host, port, purpose).await?;
    }

    info!("All server ports validated successfully");
    Ok(())
}

async fn validate_single_port(host: &str, port: u16, purpose: &str) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    debug!("Checking {} port {}", purpose, port);

    match TcpListener::bind(&addr).await {
        Ok(listener) => {
            drop(listener);
            debug!("{} port {} is available", purpose, port);
            Ok(())
        }
        Err(e) => {
            error!("{} port {} is NOT available: {}", purpose, port, e);
            Err(ServerError::port_unavailable(purpose, port, e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_validate_ports_reports_taken_metrics_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let taken = listener.local_addr().unwrap().port();
        let config = ServerConfig::new("127.0.0.1", 0);

        let result = validate_ports_available(&config, &[("metrics", taken)]).await;
        assert_matches!(
            result,
            Err(ServerError::PortUnavailable { purpose, port, .. }) if purpose == "metrics" && port == taken
        );

        assert!(validate_ports_available(&config, &[]).await.is_ok());
    }
}
