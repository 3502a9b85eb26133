//! Shared utilities for integration tests.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::any,
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use santuario_gate::config::GateConfig;
use santuario_gate::gate::FixedClock;
use santuario_gate::http::{AppState, HttpServer};
use santuario_gate::lifecycle::Shutdown;
use santuario_gate::store::{Backends, MemoryStore};

/// The instant every gate under test believes it is.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Start an upstream that echoes what it received as JSON.
pub async fn start_echo_upstream() -> SocketAddr {
    async fn echo(request: Request<Body>) -> (StatusCode, Json<Value>) {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (
            StatusCode::OK,
            Json(json!({
                "method": request.method().as_str(),
                "path": request.uri().path(),
                "query": request.uri().query(),
                "user_id": header("x-gate-user-id"),
                "request_id": header("x-request-id"),
            })),
        )
    }

    let app = Router::new()
        .route("/", any(echo))
        .route("/{*path}", any(echo));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub struct RunningGate {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<GateConfig>,
}

impl RunningGate {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a gate in front of `upstream`, backed by `store`, frozen at [`now`].
pub async fn start_gate(
    config: GateConfig,
    upstream: SocketAddr,
    store: Arc<MemoryStore>,
) -> RunningGate {
    start_gate_with_backends(config, upstream, Backends::memory(store)).await
}

pub async fn start_gate_with_backends(
    mut config: GateConfig,
    upstream: SocketAddr,
    backends: Backends,
) -> RunningGate {
    config.upstream.url = format!("http://{}", upstream);
    config.observability.metrics_enabled = false;

    let server = HttpServer::with_clock(config, backends, Arc::new(FixedClock(now()))).unwrap();
    let state = server.state();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    RunningGate {
        addr,
        state,
        shutdown,
        updates,
    }
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
