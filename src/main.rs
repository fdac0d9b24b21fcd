//! Weighted round robin reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http server ──▶ entry Balancer ──▶ child Balancer ... ──▶ Upstream ──▶ Backend
//!                (request id,      (EDF pick,          (nested service)     (hyper client)
//!                 trace, timeout)   sticky cookie)
//!
//!     Health checker ──▶ admin API ──▶ ServiceManager ──▶ Balancer::set_status
//!                                                           └─▶ parent.set_status (propagation)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use wrr_proxy::admin::{setup_admin_router, AdminState};
use wrr_proxy::config::{load_config, ProxyConfig, ServiceConfig};
use wrr_proxy::lifecycle::{shutdown_signal, Shutdown};
use wrr_proxy::observability::{logging, metrics};
use wrr_proxy::{HttpServer, ServiceManager};

#[derive(Parser)]
#[command(name = "wrr-proxy")]
#[command(about = "Weighted round robin reverse proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let found = cli.config.exists();
    let config = if found { load_config(&cli.config)? } else { default_config() };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "wrr-proxy starting");
    if !found {
        tracing::warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        service = %config.listener.service,
        request_timeout_secs = config.listener.request_timeout_secs,
        "Configuration loaded"
    );

    let manager = Arc::new(ServiceManager::new(&config)?);
    let shutdown = Shutdown::new();

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(AdminState::new(manager.clone(), &config.admin.api_key));
        let stop = shutdown.signalled();
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(stop).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }))
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config.listener, manager.entry());
    let proxy_task = tokio::spawn(server.run(listener, shutdown.signalled()));

    shutdown_signal().await;
    shutdown.trigger();

    proxy_task.await??;
    if let Some(task) = admin_task {
        task.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Defaults plus an empty entry service: every request gets 503 until a
/// configuration with servers is supplied.
fn default_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.services.push(ServiceConfig {
        name: config.listener.service.clone(),
        health_check: false,
        sticky: None,
        servers: Vec::new(),
        services: Vec::new(),
    });
    config
}
