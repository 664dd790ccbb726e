//! labgate CLI and server binary
//!
//! Entry point of the gateway. It provides commands for initializing and
//! validating a configuration file, and for starting the gateway.

use anyhow::{Context, Result};
use cli::{Cli, Commands, LogFormatArg};
use config::{generate_default_config, load_config, save_config, validate_config, LabgateConfig};
use gateway::{build_app, connect_broker, family_descriptors, server_config};
use observability::{init_logging, init_metrics, LogFormat};
use server::{validate_ports_available, HttpServer, Server, ShutdownController};
use std::path::Path;
use tracing::{debug, error, info, warn};

const SERVICE_NAME: &str = "labgate";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start {
            config,
            http,
            log_format,
        } => start_gateway(config, http, log_format).await,
        Commands::Validate { config } => {
            init_logging(SERVICE_NAME, LogFormat::Pretty, "warn")?;
            validate_command(config)
        }
        Commands::Init { output } => {
            init_logging(SERVICE_NAME, LogFormat::Pretty, "info")?;
            init_command(output)
        }
    }
}

/// Log the validation report and refuse to continue on any error
fn ensure_valid(config: &LabgateConfig) -> Result<()> {
    let report = validate_config(config);

    if !report.warnings.is_empty() {
        warn!("Configuration warnings:");
        for warning in &report.warnings {
            warn!(field = %warning.field, message = %warning.message);
        }
    }

    for default in &report.defaults_applied {
        debug!(field = %default.field, value = %default.value, "Default applied");
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start gateway due to configuration errors");
    }

    Ok(())
}

async fn start_gateway<P: AsRef<Path>>(
    config_path: P,
    http_override: Option<u16>,
    log_format_override: Option<LogFormatArg>,
) -> Result<()> {
    let config_path = config_path.as_ref();

    // Logging comes from the file, so the file is read first
    let config = load_config(config_path)?;
    let format_name = log_format_override
        .map(|f| f.as_str().to_string())
        .unwrap_or_else(|| config.logging.format.clone());
    let format = LogFormat::parse(&format_name)
        .with_context(|| format!("Unknown log format: {format_name}"))?;
    init_logging(SERVICE_NAME, format, &config.logging.level)?;

    info!(path = ?config_path, "labgate starting");
    ensure_valid(&config)?;

    let server_config = server_config(&config.gateway, http_override);
    if http_override.is_some() {
        debug!(port = server_config.http_port, "HTTP port overridden from the command line");
    }

    let extra_ports: Vec<(&str, u16)> = if config.metrics.enabled {
        vec![("metrics", config.metrics.port)]
    } else {
        Vec::new()
    };
    validate_ports_available(&server_config, &extra_ports).await?;

    if config.metrics.enabled {
        init_metrics(config.metrics.port)?;
    }

    let shutdown = ShutdownController::with_signals();

    let broker = connect_broker(&config.broker, &family_descriptors(&config))
        .await
        .context("Failed to set up the message broker")?;
    let router = build_app(&config, broker, shutdown.token())?;

    info!(
        name = %config.gateway.name,
        http_port = server_config.http_port,
        poll_interval_ms = config.polling.interval().as_millis() as u64,
        poll_deadline_ms = config.polling.deadline().as_millis() as u64,
        "Starting gateway"
    );

    let server = HttpServer::new(server_config, router);
    server.run(shutdown.token()).await?;

    info!("labgate stopped");
    Ok(())
}

fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Gateway: {} on {}:{}", config.gateway.name, config.gateway.host, config.gateway.http_port);
    println!("Backend: {}", config.backend.base_uri);
    println!("Broker: {:?}", config.broker.kind);
    println!(
        "Polling: every {} ms, {} attempts per pass, {} ms deadline, {:?}",
        config.polling.interval().as_millis(),
        config.polling.max_attempts(),
        config.polling.deadline().as_millis(),
        config.polling.correlation
    );
    println!(
        "Response queues: {} (composition), {} (porosity)",
        config.families.composition.response_queue, config.families.porosity.response_queue
    );

    Ok(())
}

fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!("  - Gateway listener on port {}", config.gateway.http_port);
    println!("  - Backend and broker URIs read from BACKEND_URI and AMQP_URI");
    println!("  - Queue layout of the composition and porosity workers");
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to customize settings");
    println!(
        "  2. Run 'labgate validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'labgate start --config {:?}' to start the gateway",
        output_path
    );

    Ok(())
}
