//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler as fallback for every path
//! - Wire up middleware (gate, tracing, limits, request ID, security headers)
//! - Bind server to listener (plain or TLS)
//! - Apply gate policy updates from the config watcher
//! - Graceful shutdown on the lifecycle broadcast

use arc_swap::ArcSwap;
use axum::{
    http::{header, HeaderValue},
    middleware,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GateConfig, SessionConfig};
use crate::gate::{AccessGate, Clock, DecisionStats, SystemClock};
use crate::http::middleware::access_control_middleware;
use crate::http::proxy::{proxy_handler, Upstream, UpstreamError};
use crate::observability::tracing::request_span;
use crate::store::Backends;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<ArcSwap<AccessGate>>,
    pub backends: Backends,
    pub clock: Arc<dyn Clock>,
    pub stats: Arc<DecisionStats>,
    pub session: SessionConfig,
    pub upstream: Upstream,
}

impl AppState {
    /// Swap in the route table and redirect targets of a freshly loaded config.
    pub fn apply_config(&self, config: &GateConfig) {
        let gate = AccessGate::from_settings(&config.gate);
        tracing::info!(
            routes = gate.table().routes().len(),
            checkout_paths = gate.table().checkout().len(),
            lookup_mode = ?gate.lookup_mode(),
            "Gate policy reloaded"
        );
        self.gate.store(Arc::new(gate));
    }
}

/// HTTP server fronting the page application.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and lookup backends.
    pub fn new(config: GateConfig, backends: Backends) -> Result<Self, UpstreamError> {
        Self::with_clock(config, backends, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: GateConfig,
        backends: Backends,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, UpstreamError> {
        let upstream = Upstream::from_config(&config.upstream)?;

        let state = AppState {
            gate: Arc::new(ArcSwap::from_pointee(AccessGate::from_settings(&config.gate))),
            backends,
            clock,
            stats: Arc::new(DecisionStats::default()),
            session: config.session.clone(),
            upstream,
        };

        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .fallback(proxy_handler)
            .layer(middleware::from_fn_with_state(
                state.clone(),
                access_control_middleware,
            ))
            .with_state(state);

        if config.security.enable_headers {
            router = router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ));
        }

        router
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GateConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, upstream = %self.state.upstream.authority(), "HTTP server starting");

        spawn_reloader(self.state.clone(), self.config.clone(), config_updates);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<GateConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, upstream = %self.state.upstream.authority(), "HTTPS server starting");

        spawn_reloader(self.state.clone(), self.config.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining");
            drain.graceful_shutdown(Some(Duration::from_secs(30)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Shared state, e.g. for the admin API.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }
}

fn spawn_reloader(
    state: AppState,
    running: GateConfig,
    mut config_updates: mpsc::UnboundedReceiver<GateConfig>,
) {
    tokio::spawn(async move {
        while let Some(config) = config_updates.recv().await {
            let ignored = restart_only_changes(&running, &config);
            if !ignored.is_empty() {
                tracing::warn!(sections = ?ignored, "Changes need a restart to take effect");
            }
            state.apply_config(&config);
        }
    });
}

/// Sections that differ between `running` and `new` but are only read at startup.
fn restart_only_changes(running: &GateConfig, new: &GateConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if running.listener.bind_address != new.listener.bind_address
        || running.listener.max_connections != new.listener.max_connections
        || running.listener.tls.is_some() != new.listener.tls.is_some()
    {
        changed.push("listener");
    }
    if running.upstream.url != new.upstream.url {
        changed.push("upstream");
    }
    if running.session.cookie_name != new.session.cookie_name {
        changed.push("session");
    }
    if running.backend.kind != new.backend.kind
        || running.backend.base_url != new.backend.base_url
        || running.backend.api_key != new.backend.api_key
        || running.backend.seed_path != new.backend.seed_path
    {
        changed.push("backend");
    }
    if running.admin.enabled != new.admin.enabled
        || running.admin.api_key != new.admin.api_key
        || running.admin.bind_address != new.admin.bind_address
    {
        changed.push("admin");
    }
    changed
}
