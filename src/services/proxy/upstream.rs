//! Upstream relay.
//!
//! One attempt per inbound request, bounded by the client timeout. The response
//! body is relayed as raw bytes; only the header allow-list is touched.
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;
use crate::services::auth::Credential;
use crate::services::proxy::classifier::{Access, normalize};
use crate::services::proxy::path::UpstreamPath;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
pub const MISSING_BASE: &str = "AAA_API_BASE_URL not set";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream base address not configured")]
    NotConfigured,
    #[error("{0}")]
    Transport(String),
    #[error("http client build failed: {0}")]
    Build(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Transport(e.to_string())
    }
}

/// The parts of an inbound request that are allowed to reach the upstream.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Decoded upstream path (`/a/b`), as classified.
    pub path: String,
    /// The same path still percent-encoded, as forwarded.
    pub raw_path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub content_type: Option<HeaderValue>,
    pub accept: Option<HeaderValue>,
    pub body: Bytes,
}

impl ProxyRequest {
    pub fn new(
        method: Method,
        path: UpstreamPath,
        uri: &Uri,
        headers: &axum::http::HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path: path.decoded().to_string(),
            raw_path: path.raw().to_string(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
            content_type: headers.get(header::CONTENT_TYPE).cloned(),
            accept: headers.get(header::ACCEPT).cloned(),
            body,
        }
    }
}

/// What every proxied request resolves to.
#[derive(Debug)]
pub enum ProxyOutcome {
    Forwarded {
        status: StatusCode,
        content_type: HeaderValue,
        body: Bytes,
    },
    Unauthorized,
    UpstreamUnreachable {
        detail: String,
        path: String,
        target: String,
    },
    ConfigError {
        detail: String,
    },
}

impl IntoResponse for ProxyOutcome {
    fn into_response(self) -> Response {
        match self {
            ProxyOutcome::Forwarded {
                status,
                content_type,
                body,
            } => (status, [(header::CONTENT_TYPE, content_type)], Body::from(body)).into_response(),
            ProxyOutcome::Unauthorized => AppError::Unauthorized.into_response(),
            ProxyOutcome::UpstreamUnreachable {
                detail,
                path,
                target,
            } => AppError::UpstreamUnreachable {
                detail,
                path,
                target,
            }
            .into_response(),
            ProxyOutcome::ConfigError { detail } => AppError::config(detail).into_response(),
        }
    }
}

/// Buffered upstream response used by the billing/account endpoints.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// `base` without trailing slashes + `/` + path segments + `?query`.
pub fn target_url(base: &str, path: &str, query: Option<&str>) -> String {
    let base = base.trim_end_matches('/');
    let path = normalize(path);
    match query {
        Some(q) if !q.is_empty() => format!("{base}{path}?{q}"),
        _ => format!("{base}{path}"),
    }
}

#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: Client,
    base_url: Option<String>,
}

impl UpstreamClient {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.map(str::to_string),
        })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Relay `req` upstream. Base address is checked first, then the credential;
    /// neither failure touches the network.
    pub async fn forward(
        &self,
        req: ProxyRequest,
        access: Access,
        credential: Option<&Credential>,
    ) -> ProxyOutcome {
        let Some(base) = self.base_url() else {
            return ProxyOutcome::ConfigError {
                detail: MISSING_BASE.to_string(),
            };
        };

        if access.requires_credential() && credential.is_none() {
            return ProxyOutcome::Unauthorized;
        }

        let target = target_url(base, &req.raw_path, req.query.as_deref());

        let mut request = self.client.request(req.method.clone(), &target);
        if let Some(credential) = credential {
            request = request.header(header::AUTHORIZATION, credential.bearer_header());
        }
        if let Some(ct) = req.content_type {
            request = request.header(header::CONTENT_TYPE, ct);
        }
        if let Some(accept) = req.accept {
            request = request.header(header::ACCEPT, accept);
        }
        if !access.is_read() {
            request = request.body(req.body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(path = %req.path, target = %target, error = %err, "upstream fetch failed");
                return ProxyOutcome::UpstreamUnreachable {
                    detail: err.to_string(),
                    path: req.path,
                    target,
                };
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

        match response.bytes().await {
            Ok(body) => ProxyOutcome::Forwarded {
                status,
                content_type,
                body,
            },
            Err(err) => {
                tracing::warn!(path = %req.path, target = %target, error = %err, "upstream body read failed");
                ProxyOutcome::UpstreamUnreachable {
                    detail: err.to_string(),
                    path: req.path,
                    target,
                }
            }
        }
    }

    /// JSON request with a bearer credential; the whole response is buffered.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        credential: &Credential,
        body: Option<&Value>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let base = self.base_url().ok_or(UpstreamError::NotConfigured)?;
        let target = target_url(base, path, None);

        let mut request = self
            .client
            .request(method, &target)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, credential.bearer_header());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
