//! Trigger Host entry point
//!
//! Custom-handler host for the trigger telemetry benchmark.

use clap::{Parser, Subcommand};
use colored::Colorize;
use invocation_span::{InvocationContext, InvokeRequest, TelemetryRecord};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trigger_host::contracts::{FunctionBinding, FunctionRegistry, TriggerKind};
use trigger_host::handler::{benchmark, create_router, AppState};
use trigger_host::telemetry::{MemorySink, TelemetryClient, TelemetryConfig, TriggerMetricsRegistry};
use trigger_host::triggers::{CorrelationExtractor, TriggerExtractor};

#[derive(Parser)]
#[command(name = "trigger-host")]
#[command(about = "Trigger Host - correlation telemetry for serverless trigger benchmarks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the custom-handler server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080", env = "FUNCTIONS_CUSTOMHANDLER_PORT")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print the correlation id a payload yields
    Extract {
        /// Trigger kind (http, queue, event-hub, event-grid, service-bus, blob, cosmos, database)
        #[arg(short, long)]
        trigger: TriggerKind,

        /// Path to the event payload (JSON/YAML)
        #[arg(short, long)]
        file: String,
    },

    /// Run one wrapped benchmark invocation and print the emitted telemetry
    Invoke {
        /// Trigger kind
        #[arg(short, long)]
        trigger: TriggerKind,

        /// Path to an invocation request with `Data` and `Metadata` (JSON/YAML)
        #[arg(short, long)]
        file: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => {
            let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
            let config = TelemetryConfig::from_env();
            let metrics = Arc::new(TriggerMetricsRegistry::new()?);
            let telemetry = TelemetryClient::from_config(&config, Some(metrics.metrics()))?;
            let functions = FunctionRegistry::benchmark();

            tracing::info!("Starting Trigger Host on {}", addr);
            tracing::info!(
                functions = ?functions.names(),
                sink = telemetry.sink_name(),
                "Serving benchmark functions"
            );

            let state = Arc::new(AppState::new(telemetry.clone(), functions, metrics));
            let router = create_router(state);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if let Err(e) = telemetry
                .drain(Duration::from_millis(config.timeout_ms))
                .await
            {
                tracing::warn!("Telemetry not drained on shutdown: {}", e);
            }
        }

        Commands::Extract { trigger, file } => {
            let payload = read_document(&file)?;
            let extractor = TriggerExtractor::new(trigger);
            match extractor.extract(&payload) {
                Ok(id) => println!("{}", id),
                Err(e) => {
                    eprintln!("{} {}", "extraction failed:".red().bold(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Invoke {
            trigger,
            file,
            output,
        } => {
            let request: InvokeRequest = serde_json::from_value(read_document(&file)?)?;
            let binding = FunctionBinding::new(format!("{}_benchmark", trigger), trigger);
            let ctx = InvocationContext::new(binding.function_name.clone());

            let sink = MemorySink::new();
            let telemetry = TelemetryClient::new(&TelemetryConfig::default(), Arc::new(sink.clone()));

            let result = benchmark::invoke(&telemetry, &binding, &ctx, &request).await;
            telemetry.drain(Duration::from_secs(5)).await?;
            let records = sink.records().await;

            match output.as_str() {
                "json" => {
                    let response = match &result {
                        Ok(response) => serde_json::to_value(response)?,
                        Err(e) => serde_json::json!({ "error": e.code(), "message": e.to_string() }),
                    };
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "response": response,
                            "telemetry": records,
                        }))?
                    );
                }
                _ => {
                    match &result {
                        Ok(response) => {
                            println!("{} {}", "✓".green().bold(), binding.function_name);
                            for line in &response.logs {
                                println!("  log: {}", line);
                            }
                        }
                        Err(e) => {
                            println!("{} {}: {}", "✗".red().bold(), binding.function_name, e);
                        }
                    }
                    println!("Telemetry ({} records):", records.len());
                    for record in &records {
                        print_record(record);
                    }
                }
            }

            if result.is_err() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn read_document(file: &str) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(file)?;
    let value = if file.ends_with(".yaml") || file.ends_with(".yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(value)
}

fn print_record(record: &TelemetryRecord) {
    match record {
        TelemetryRecord::Dependency(d) => println!(
            "  {} {} [{}] id={} code={} success={} {}ms",
            "dependency".cyan(),
            d.name,
            d.dependency_type,
            d.id,
            d.result_code,
            d.success,
            d.duration_ms
        ),
        TelemetryRecord::Trace(t) => println!(
            "  {} {} ({})",
            "trace".yellow(),
            t.message,
            t.severity
        ),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
