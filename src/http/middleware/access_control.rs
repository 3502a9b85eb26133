//! Access Control Middleware.
//! Runs the gate before any page is served, on the canonical request path.

use axum::{
    body::Body,
    extract::State,
    http::{uri::PathAndQuery, HeaderMap, Request, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use uuid::Uuid;

use crate::gate::Session;
use crate::http::request::session_token;
use crate::http::response::redirect;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::{canonicalize_path, encode_path};

/// Context attached to requests the gate let through.
#[derive(Clone, Debug)]
pub struct GateContext {
    /// Only set when the path required the session to be resolved.
    pub user_id: Option<Uuid>,
}

pub async fn access_control_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let gate = state.gate.load_full();
    let path = match canonicalize_path(req.uri().path()) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!(raw = %req.uri().path(), error = %e, "Rejected malformed path");
            return (StatusCode::BAD_REQUEST, "Malformed request path").into_response();
        }
    };

    // 1. Resolve the session only when the outcome can depend on it.
    let session = if gate.needs_session(&path) {
        resolve_session(&state, req.headers()).await
    } else {
        None
    };

    // 2. Decide.
    let outcome = gate
        .decide(
            &path,
            session,
            state.backends.roles.as_ref(),
            state.backends.subscriptions.as_ref(),
            state.clock.now(),
        )
        .await;

    let access = gate.classify(&path).map_or("unclassified", |a| a.as_str());
    state.stats.record(&outcome);
    metrics::record_decision(outcome.label(), access, start);
    tracing::debug!(
        path = %path,
        access,
        outcome = outcome.label(),
        user_id = ?session.map(|s| s.user_id),
        "Gate decision"
    );

    // 3. Continue or redirect.
    match outcome.location(gate.paths()) {
        None => {
            // The upstream must serve exactly the path that was classified.
            let encoded = encode_path(&path);
            if encoded != req.uri().path() {
                match with_path(req.uri(), &encoded) {
                    Some(uri) => *req.uri_mut() = uri,
                    None => return (StatusCode::BAD_REQUEST, "Malformed request path").into_response(),
                }
            }
            req.extensions_mut().insert(GateContext {
                user_id: session.map(|s| s.user_id),
            });
            next.run(req).await
        }
        Some(location) => redirect(&location),
    }
}

/// `uri` with its path replaced, query kept.
fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// Any failure resolving the session counts as no session.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    let token = session_token(headers, &state.session.cookie_name)?;
    match state.backends.sessions.resolve(&token).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Session resolution failed, treating as signed out");
            metrics::record_lookup_failure("session");
            None
        }
    }
}
