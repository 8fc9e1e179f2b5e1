//! Identity provider interface consumed by the token resolver and account summary.
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, header};
use serde_json::Value;
use thiserror::Error;

/// Result type for identity provider calls.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Identity-provider errors.
///
/// Note:
/// - Callers on the token path swallow these into "no credential"; they are kept
///   typed only so logs can say what went wrong.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unreachable: {0}")]
    Transport(String),
    #[error("identity provider returned status {0}")]
    Status(u16),
    #[error("identity provider response unreadable: {0}")]
    InvalidResponse(String),
    #[error("ambient session access is not available")]
    AmbientUnsupported,
}

/// Request-scoped session context: the inbound browser cookies.
#[derive(Debug, Clone, Default)]
pub struct SessionScope {
    cookie: Option<HeaderValue>,
}

impl SessionScope {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            cookie: headers.get(header::COOKIE).cloned(),
        }
    }

    pub fn cookie(&self) -> Option<&HeaderValue> {
        self.cookie.as_ref()
    }

    /// Cookie names only; values are session secrets.
    pub fn cookie_names(&self) -> Vec<String> {
        self.cookie
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(';')
                    .filter_map(|part| part.split('=').next())
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// "Get access token" / "get session" capabilities of the identity provider.
///
/// The access token response shape is not fixed (plain string or an object with
/// one of several field names); implementations return it undecoded.
///
/// `scope = Some(..)` is the request-scoped variant, `None` the ambient one.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    // Backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // Whether calls with `scope = None` can succeed in this deployment.
    fn supports_ambient(&self) -> bool;

    async fn access_token(&self, scope: Option<&SessionScope>) -> IdentityResult<Value>;

    // `Ok(None)` when there is no logged-in session.
    async fn session(&self, scope: Option<&SessionScope>) -> IdentityResult<Option<Value>>;
}

/// Field names present on a provider response, for shape-only logging.
pub fn response_shape(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::String(_) => vec!["(string)".to_string()],
        Value::Null => Vec::new(),
        other => vec![format!("({})", json_kind(other))],
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
