//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject redirect targets that would bounce callers in a loop
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{BackendKind, GateConfig};
use crate::routing::{canonicalize_path, AccessLevel, RouteTable};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must start with '/': {value:?}")]
    RelativePath { field: &'static str, value: String },
    #[error("{field} {value:?} is not canonical, requests are matched as {canonical:?}")]
    NonCanonicalPath {
        field: &'static str,
        value: String,
        canonical: String,
    },
    #[error("duplicate route {0:?}")]
    DuplicateRoute(String),
    #[error("login path {0:?} requires a session, anonymous callers would loop")]
    LoginRequiresSession(String),
    #[error("paywall path {path:?} is classified {access}, callers would loop")]
    PaywallLoop { path: String, access: &'static str },
    #[error("landing path {path:?} {reason}, callers would loop")]
    LandingLoop { path: String, reason: &'static str },
    #[error("return_param must not be empty")]
    EmptyReturnParam,
    #[error("invalid {field} URL {value:?}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{0} is required for the rest backend")]
    MissingBackendField(&'static str),
    #[error("invalid {field} address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_gate(config, &mut errors);
    validate_endpoints(config, &mut errors);

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_absolute(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if !value.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            field,
            value: value.to_string(),
        });
    }
}

/// Requests are classified on their canonical path, so entries must be written that way.
fn check_canonical(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    let canonical = canonicalize_path(value).unwrap_or_default();
    if value.starts_with('/') && canonical != value {
        errors.push(ValidationError::NonCanonicalPath {
            field,
            value: value.to_string(),
            canonical,
        });
    }
}

fn validate_gate(config: &GateConfig, errors: &mut Vec<ValidationError>) {
    let gate = &config.gate;

    let mut seen = HashSet::new();
    for route in &gate.routes {
        check_absolute("route path", &route.path, errors);
        check_canonical("route path", &route.path, errors);
        if !seen.insert((route.kind, route.path.as_str())) {
            errors.push(ValidationError::DuplicateRoute(route.path.clone()));
        }
    }
    for path in &gate.checkout_paths {
        check_absolute("checkout path", path, errors);
        check_canonical("checkout path", path, errors);
    }
    check_absolute("gate.login_path", &gate.login_path, errors);
    check_absolute("gate.landing_path", &gate.landing_path, errors);
    check_absolute("gate.paywall_path", &gate.paywall_path, errors);

    if gate.return_param.is_empty() {
        errors.push(ValidationError::EmptyReturnParam);
    }

    let table = RouteTable::from_config(&gate.routes, &gate.checkout_paths);

    if table.classify(&gate.login_path).is_some_and(AccessLevel::requires_session) {
        errors.push(ValidationError::LoginRequiresSession(gate.login_path.clone()));
    }

    match table.classify(&gate.paywall_path) {
        Some(access @ (AccessLevel::Protected | AccessLevel::Admin | AccessLevel::Auth)) => {
            errors.push(ValidationError::PaywallLoop {
                path: gate.paywall_path.clone(),
                access: access.as_str(),
            });
        }
        _ => {}
    }

    let landing_reason = match table.classify(&gate.landing_path) {
        Some(AccessLevel::Auth) => Some("is an auth page"),
        Some(AccessLevel::Admin) => Some("is admin-only"),
        _ if table.is_checkout(&gate.landing_path) => Some("is a checkout page"),
        _ => None,
    };
    if let Some(reason) = landing_reason {
        errors.push(ValidationError::LandingLoop {
            path: gate.landing_path.clone(),
            reason,
        });
    }
}

fn validate_endpoints(config: &GateConfig, errors: &mut Vec<ValidationError>) {
    let http_url = |value: &str| {
        Url::parse(value)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false)
    };

    // The upstream client speaks plain HTTP only.
    let upstream_ok = Url::parse(&config.upstream.url)
        .map(|u| u.scheme() == "http" && u.has_host())
        .unwrap_or(false);
    if !upstream_ok {
        errors.push(ValidationError::InvalidUrl {
            field: "upstream",
            value: config.upstream.url.clone(),
        });
    }

    if config.backend.kind == BackendKind::Rest {
        if config.backend.base_url.is_empty() {
            errors.push(ValidationError::MissingBackendField("backend.base_url"));
        } else if !http_url(&config.backend.base_url) {
            errors.push(ValidationError::InvalidUrl {
                field: "backend.base_url",
                value: config.backend.base_url.clone(),
            });
        }
        if config.backend.api_key.is_empty() {
            errors.push(ValidationError::MissingBackendField("backend.api_key"));
        }
        if config.backend.timeout_secs == 0 {
            errors.push(ValidationError::Zero("backend.timeout_secs"));
        }
    }

    let mut addresses = vec![("listener.bind_address", &config.listener.bind_address)];
    if config.admin.enabled {
        addresses.push(("admin.bind_address", &config.admin.bind_address));
    }
    if config.observability.metrics_enabled {
        addresses.push(("observability.metrics_address", &config.observability.metrics_address));
    }
    for (field, value) in addresses {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }
}
