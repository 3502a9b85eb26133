use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gate::{Clock, FixedClock, LookupMode, Outcome, Session, StatsSnapshot};
use crate::http::server::AppState;
use crate::routing::{canonicalize_path, AccessLevel, MatchKind};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub upstream: String,
    pub lookup_mode: LookupMode,
}

#[derive(Serialize)]
pub struct RouteView {
    pub path: String,
    pub kind: MatchKind,
    pub access: AccessLevel,
}

#[derive(Serialize)]
pub struct PolicyView {
    pub login_path: String,
    pub landing_path: String,
    pub paywall_path: String,
    pub return_param: String,
    pub routes: Vec<RouteView>,
    pub checkout_paths: Vec<String>,
}

/// Dry-run request: what would the gate do for this caller on this path?
#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub path: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Evaluate subscriptions as of this instant instead of now.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DecideResponse {
    pub path: String,
    pub access: Option<AccessLevel>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub location: Option<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        upstream: state.upstream.authority().to_string(),
        lookup_mode: state.gate.load().lookup_mode(),
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.stats.snapshot())
}

pub async fn get_routes(State(state): State<AppState>) -> Json<PolicyView> {
    let gate = state.gate.load_full();
    let paths = gate.paths();
    let table = gate.table();

    Json(PolicyView {
        login_path: paths.login.clone(),
        landing_path: paths.landing.clone(),
        paywall_path: paths.paywall.clone(),
        return_param: paths.return_param.clone(),
        routes: table
            .routes()
            .iter()
            .map(|route| RouteView {
                path: route.matcher.path().to_string(),
                kind: route.matcher.kind(),
                access: route.access,
            })
            .collect(),
        checkout_paths: table.checkout().iter().map(|m| m.path().to_string()).collect(),
    })
}

/// Evaluate the gate without forwarding anything. Not counted in stats.
pub async fn post_decide(
    State(state): State<AppState>,
    Json(request): Json<DecideRequest>,
) -> Result<Json<DecideResponse>, (StatusCode, String)> {
    let gate = state.gate.load_full();
    let path = canonicalize_path(&request.path)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let now = match request.at {
        Some(at) => FixedClock(at).now(),
        None => state.clock.now(),
    };

    let outcome = gate
        .decide(
            &path,
            request.user_id.map(Session::new),
            state.backends.roles.as_ref(),
            state.backends.subscriptions.as_ref(),
            now,
        )
        .await;

    tracing::debug!(path = %path, at = %now, outcome = outcome.label(), "Admin dry-run decision");

    Ok(Json(DecideResponse {
        access: gate.classify(&path),
        location: outcome.location(gate.paths()),
        path,
        outcome,
    }))
}
