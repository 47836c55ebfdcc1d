use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fetchgate::config::{load_config, validate_config, ConfigError, GatewayConfig};
use fetchgate::lifecycle::{wait_for_signal, Shutdown};
use fetchgate::observability::{logging, metrics};
use fetchgate::{admin, HttpServer};

#[derive(Parser)]
#[command(name = "fetchgate")]
#[command(about = "Fetch a list of URLs concurrently and report their body lengths", long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("fetchgate v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_in_flight = config.listener.max_in_flight,
        fetch_timeout_secs = config.fetch.timeout_secs,
        order = ?config.fetch.order,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config.clone())?;

    let admin_task = if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let admission = server.admission();
        let rx = shutdown.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = admin::serve(admin_listener, admission, rx).await {
                tracing::error!(error = %e, "Admin server failed");
            }
        }))
    } else {
        None
    };

    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    if let Some(task) = admin_task {
        task.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
