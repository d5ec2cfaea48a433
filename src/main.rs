//! Relay control daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   operator (browser / relay-cli)
//!         │ HTTP
//!         ▼
//!   ┌──────────────┐   validate    ┌──────────────┐
//!   │ admin server │──────────────▶│   upstream   │
//!   │  (axum)      │               │  validator   │
//!   └──────┬───────┘               └──────────────┘
//!          │ update_and(transform, on_commit)
//!          ▼
//!   ┌──────────────┐  on_commit    ┌──────────────┐    ┌──────────────┐
//!   │ config store │──────────────▶│ feature flags│    │  proxy pool  │
//!   │ (JSON file)  │───────────────┼──────────────┼───▶│ (restart)    │
//!   └──────▲───────┘               └──────────────┘    └──────┬───────┘
//!          │ notify                                           │ live list
//!   ┌──────┴───────┐               ┌──────────────┐    ┌──────▼───────┐
//!   │   watcher    │               │   counter    │───▶│    stats     │
//!   └──────────────┘  connections─▶│   registry   │    │  presenter   │
//!                                  └──────────────┘    └──────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use relay_control::config::load_settings;
use relay_control::http::AdminServer;
use relay_control::lifecycle::{self, shutdown_signal, Shutdown};
use relay_control::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "relay-control")]
#[command(about = "Control plane for the multi-upstream traffic relay", long_about = None)]
struct Args {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(short, long, env = "RELAY_CONTROL_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.listener.bind_address = bind;
    }

    logging::init_logging(&settings.observability.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relay-control starting");
    tracing::info!(
        bind_address = %settings.listener.bind_address,
        store = %settings.store.path.display(),
        window_secs = settings.stats.window_secs,
        "Settings loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let started = lifecycle::start(&settings, &shutdown).await?;

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for operator requests");

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_shutdown.trigger();
    });

    let server = AdminServer::new(started.service.clone(), settings.listener.request_timeout());
    server.run(listener, shutdown.subscribe()).await?;

    for task in started.tasks {
        let _ = task.await;
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
