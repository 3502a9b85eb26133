//! Admin API, served on its own listener.
//!
//! Everything lives under `/_gate/` so nothing collides with the page
//! application's own `/admin` section.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState, api_key: &str) -> Router {
    let api_key: Arc<str> = Arc::from(api_key);
    Router::new()
        .route("/_gate/status", get(get_status))
        .route("/_gate/stats", get(get_stats))
        .route("/_gate/routes", get(get_routes))
        .route("/_gate/decide", post(post_decide))
        .layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
        .with_state(state)
}
