//! Request inspection.
//!
//! # Responsibilities
//! - Name the request-id and forwarded-user headers
//! - Pull the session token out of cookies or a bearer header
//!
//! # Design Decisions
//! - The token is opaque here; only the session resolver interprets it
//! - The cookie wins over `Authorization` when both are present

use axum::http::{header, HeaderMap, HeaderName};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Resolved user id forwarded to the upstream. Client-supplied values are
/// always stripped.
pub const X_GATE_USER_ID: HeaderName = HeaderName::from_static("x-gate-user-id");

/// Extract the session token from the named cookie, or a bearer token.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    cookie_value(headers, cookie_name).or_else(|| bearer_token(headers))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sb-access-token=abc123; lang=es"),
        );
        assert_eq!(session_token(&headers, "sb-access-token").as_deref(), Some("abc123"));
        assert_eq!(session_token(&headers, "missing"), None);
    }

    #[test]
    fn test_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("sb-access-token=\"quoted\""));
        assert_eq!(session_token(&headers, "sb-access-token").as_deref(), Some("quoted"));
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(session_token(&headers, "sb-access-token").as_deref(), Some("tok"));

        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=cookie"));
        assert_eq!(session_token(&headers, "sb-access-token").as_deref(), Some("cookie"));
    }

    #[test]
    fn test_empty_values_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token="));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(session_token(&headers, "sb-access-token"), None);
    }
}
