//! Ordered route table.
//!
//! # Responsibilities
//! - Store compiled (matcher, access level) entries
//! - Classify a request path: first matching entry wins
//! - Report unclassified paths explicitly (`None`)
//!
//! # Design Decisions
//! - Immutable after construction; hot reload swaps whole tables
//! - O(n) scan, fine for a few dozen entries

use serde::{Deserialize, Serialize};

use crate::config::RouteConfig;
use crate::routing::matcher::{normalize_path, MatchKind, PathMatcher};

/// What a route requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Anyone, with or without a session.
    Public,
    /// Login and register pages; signed-in callers are sent away.
    Auth,
    /// A session, no subscription needed.
    AuthOnly,
    /// A session plus admin role or a valid subscription.
    Protected,
    /// A session plus admin role.
    Admin,
}

impl AccessLevel {
    /// Levels that send anonymous callers to the login page.
    pub fn requires_session(self) -> bool {
        matches!(
            self,
            AccessLevel::AuthOnly | AccessLevel::Protected | AccessLevel::Admin
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Auth => "auth",
            AccessLevel::AuthOnly => "auth_only",
            AccessLevel::Protected => "protected",
            AccessLevel::Admin => "admin",
        }
    }
}

/// Compiled route entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub matcher: PathMatcher,
    pub access: AccessLevel,
}

/// Routes evaluated top-down, plus the checkout pages a subscriber is
/// bounced away from.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    checkout: Vec<PathMatcher>,
}

impl RouteTable {
    /// Compile a table from configuration. An empty route list falls back to
    /// [`default_routes`].
    pub fn from_config(routes: &[RouteConfig], checkout_paths: &[String]) -> Self {
        let source = if routes.is_empty() {
            default_routes()
        } else {
            routes.to_vec()
        };

        Self {
            routes: source
                .iter()
                .map(|r| Route {
                    matcher: PathMatcher::new(r.kind, r.path.as_str()),
                    access: r.access,
                })
                .collect(),
            checkout: checkout_paths.iter().map(|p| PathMatcher::prefix(p.as_str())).collect(),
        }
    }

    /// Returns the access level of the first matching route.
    pub fn classify(&self, path: &str) -> Option<AccessLevel> {
        let path = normalize_path(path);
        self.routes
            .iter()
            .find(|r| r.matcher.matches(path))
            .map(|r| r.access)
    }

    /// Whether `path` is a paywall, trial or founder-access page.
    pub fn is_checkout(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.checkout.iter().any(|m| m.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn checkout(&self) -> &[PathMatcher] {
        &self.checkout
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::from_config(&default_routes(), &default_checkout_paths())
    }
}

fn route(kind: MatchKind, path: &str, access: AccessLevel) -> RouteConfig {
    RouteConfig {
        path: path.to_string(),
        kind,
        access,
    }
}

/// The platform's built-in policy.
pub fn default_routes() -> Vec<RouteConfig> {
    use AccessLevel::*;
    use MatchKind::*;

    vec![
        // Ahead of the public entries so signed-in callers get redirected.
        route(Exact, "/auth/login", Auth),
        route(Exact, "/auth/register", Auth),
        route(Exact, "/", Public),
        route(Exact, "/auth/callback", Public),
        route(Exact, "/auth/auth-code-error", Public),
        route(Exact, "/auth/logout", Public),
        route(Exact, "/auth/registro-exitoso", Public),
        route(Prefix, "/api", Public),
        route(Prefix, "/acceso-fundador", AuthOnly),
        route(Prefix, "/prueba", AuthOnly),
        route(Prefix, "/paywall", AuthOnly),
        route(Prefix, "/suscripcion", AuthOnly),
        route(Prefix, "/mi-santuario", Protected),
        route(Prefix, "/dashboard", Protected),
        route(Prefix, "/clases", Protected),
        route(Prefix, "/clase", Protected),
        route(Prefix, "/programas", Protected),
        route(Prefix, "/perfil", Protected),
        route(Prefix, "/ajustes", Protected),
        route(Prefix, "/historial", Protected),
        route(Prefix, "/explorar", Protected),
        route(Prefix, "/pilares", Protected),
        route(Prefix, "/instructores", Protected),
        route(Prefix, "/favoritos", Protected),
        route(Prefix, "/admin", Admin),
    ]
}

pub fn default_checkout_paths() -> Vec<String> {
    vec![
        "/paywall".to_string(),
        "/prueba".to_string(),
        "/acceso-fundador".to_string(),
    ]
}
