//! santuario-gate
//!
//! Access gate in front of the Santuario page application.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ─────────────▶ http server ─▶ access_control ─▶ gate::decide ─┬─ allow ──▶ proxy ─▶ page app
//!                    (request id,   (session token,   (route table,  │
//!                     limits,        resolve)          role +        └─ redirect (307)
//!                     timeout)                         subscription     login / paywall / landing
//!                                                      lookups)
//!
//!     Cross-cutting: config (+ hot reload), store (memory / REST backend),
//!                    observability (tracing, prometheus), lifecycle (signals, drain),
//!                    admin API (separate listener)
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use santuario_gate::admin::setup_admin_router;
use santuario_gate::config::{load_config, ConfigWatcher, GateConfig};
use santuario_gate::http::HttpServer;
use santuario_gate::lifecycle::{shutdown_signal, Shutdown};
use santuario_gate::net::load_tls_config;
use santuario_gate::observability::{logging, metrics};
use santuario_gate::store::Backends;

const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

#[derive(Parser)]
#[command(name = "santuario-gate", version, about = "Access gate for the Santuario platform")]
struct Args {
    /// Path to the TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        backend = ?config.backend.kind,
        routes = config.gate.routes.len(),
        "santuario-gate starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let backends = Backends::from_config(&config.backend)?;

    let shutdown = Arc::new(Shutdown::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.trigger();
        });
    }

    // Hot reload of the gate policy. The watcher must stay alive until exit.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(watcher) => (updates, Some(watcher)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (updates, None)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let server = HttpServer::new(config.clone(), backends)?;

    if config.admin.enabled {
        if config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            tracing::warn!("Admin API is using the placeholder key");
        }
        let admin = setup_admin_router(server.state(), &config.admin.api_key);
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");

        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let served = axum::serve(listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let server_shutdown = shutdown.subscribe();
    match &config.listener.tls {
        Some(tls) => {
            let tls = load_tls_config(tls).await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server.run_tls(addr, tls, config_updates, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    if !shutdown.drained(Duration::from_secs(10)).await {
        tracing::warn!(
            remaining = shutdown.receiver_count(),
            "Listeners did not drain in time"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
