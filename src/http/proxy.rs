//! Forwarding of allowed requests to the page application.

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::http::middleware::GateContext;
use crate::http::request::{X_GATE_USER_ID, X_REQUEST_ID};
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL {0:?}")]
    InvalidUrl(String),
}

/// Plain-HTTP client bound to one upstream authority.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl Upstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let uri: Uri = config
            .url
            .parse()
            .map_err(|_| UpstreamError::InvalidUrl(config.url.clone()))?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(UpstreamError::InvalidUrl(config.url.clone()));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| UpstreamError::InvalidUrl(config.url.clone()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

/// Catch-all handler behind the gate.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // URI rewrite
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    // Only the gate may vouch for the caller.
    parts.headers.remove(X_GATE_USER_ID);
    let user_id = parts.extensions.get::<GateContext>().and_then(|ctx| ctx.user_id);
    if let Some(user_id) = user_id {
        if let Ok(value) = HeaderValue::from_str(&user_id.to_string()) {
            parts.headers.insert(X_GATE_USER_ID, value);
        }
    }

    let req = Request::from_parts(parts, body);
    match state.upstream.client.request(req).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16());
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream(502);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(url: &str) -> Result<Upstream, UpstreamError> {
        Upstream::from_config(&UpstreamConfig { url: url.to_string() })
    }

    #[tokio::test]
    async fn test_upstream_url() {
        assert_eq!(upstream("http://127.0.0.1:3000").unwrap().authority().as_str(), "127.0.0.1:3000");
        assert_eq!(upstream("http://app.internal").unwrap().authority().as_str(), "app.internal");
        assert!(upstream("https://app.internal").is_err());
        assert!(upstream("/relative").is_err());
    }
}
