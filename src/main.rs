use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vacuum_leak_service::api;
use vacuum_leak_service::config::Cli;
use vacuum_leak_service::data_source::serial::{SerialPressureSource, describe_port_type};
use vacuum_leak_service::service::{AppContext, SessionRunner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with colors and stderr output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vacuum_leak_service=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Handle --list-ports
    if cli.list_ports {
        list_serial_ports();
        return Ok(());
    }

    // Require a mode if not listing ports
    let Some(source_config) = cli.to_source_config() else {
        eprintln!("Error: Please specify a mode (serial or playback)");
        eprintln!("Use --help for usage information");
        std::process::exit(1);
    };

    let device_state = cli.to_device_state()?;

    tracing::info!(
        "Starting vacuum leak service on {}:{} (channel {}, time mode {}, target {} kPa)",
        cli.host,
        cli.listen,
        device_state.channel,
        device_state.time_mode().as_u8(),
        device_state.pressure_target()
    );

    // Create pressure source and try an initial connection
    let mut source = source_config.create_source();
    if let Err(e) = source.connect(None).await {
        tracing::warn!(
            "Initial connection to {} failed: {}. Use POST /connect to retry",
            source.name(),
            e
        );
    }

    let ctx = AppContext::new(device_state, source);

    // Create and run HTTP server
    let router = api::create_router(ctx.clone());
    let addr: SocketAddr = format!("{}:{}", cli.host, cli.listen).parse()?;

    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Shutting down...");
    SessionRunner::halt(&ctx, "Service shutting down").await;
    ctx.source.lock().await.disconnect().await?;

    Ok(())
}

/// List available serial ports
fn list_serial_ports() {
    match SerialPressureSource::list_available_ports() {
        Ok(ports) => {
            if ports.is_empty() {
                println!("No serial ports found");
            } else {
                println!("Available serial ports:");
                for port in ports {
                    println!(
                        "  {} - {}",
                        port.port_name,
                        describe_port_type(&port.port_type)
                    );
                }
            }
        }
        Err(e) => {
            eprintln!("Error listing serial ports: {}", e);
        }
    }
}

/// Wait for shutdown signal (Ctrl+C)
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
