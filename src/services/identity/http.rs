use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde_json::Value;

use crate::services::identity::provider::{
    IdentityError, IdentityProvider, IdentityResult, SessionScope,
};

const ACCESS_TOKEN_PATH: &str = "auth/access-token";
const PROFILE_PATH: &str = "auth/profile";

/// Identity provider reached over HTTP (the session service that owns the login cookies).
///
/// - request-scoped calls forward the inbound `cookie` header and nothing else
/// - ambient calls go out without cookies and rely on the session service's own
///   process-level session; they are only attempted when enabled by config
#[derive(Clone, Debug)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    ambient_enabled: bool,
}

impl HttpIdentityProvider {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        ambient_enabled: bool,
    ) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            ambient_enabled,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, path: &str, scope: Option<&SessionScope>) -> IdentityResult<reqwest::Response> {
        if scope.is_none() && !self.ambient_enabled {
            return Err(IdentityError::AmbientUnsupported);
        }

        let mut request = self
            .client
            .get(self.url(path))
            .header(header::ACCEPT, "application/json");

        if let Some(cookie) = scope.and_then(SessionScope::cookie) {
            request = request.header(header::COOKIE, cookie.clone());
        }

        request
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))
    }
}

/// JSON when the body parses as JSON, otherwise the trimmed text as a JSON string.
async fn read_value(response: reqwest::Response) -> IdentityResult<Value> {
    let text = response
        .text()
        .await
        .map_err(|e| IdentityError::InvalidResponse(e.to_string()))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string())))
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn backend_name(&self) -> &'static str {
        "http-session"
    }

    fn supports_ambient(&self) -> bool {
        self.ambient_enabled
    }

    async fn access_token(&self, scope: Option<&SessionScope>) -> IdentityResult<Value> {
        let response = self.get(ACCESS_TOKEN_PATH, scope).await?;
        if !response.status().is_success() {
            return Err(IdentityError::Status(response.status().as_u16()));
        }
        read_value(response).await
    }

    async fn session(&self, scope: Option<&SessionScope>) -> IdentityResult<Option<Value>> {
        let response = self.get(PROFILE_PATH, scope).await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
                return Ok(None);
            }
            s if !s.is_success() => return Err(IdentityError::Status(s.as_u16())),
            _ => {}
        }
        match read_value(response).await? {
            Value::Object(map) => Ok(Some(Value::Object(map))),
            Value::Null => Ok(None),
            other => Err(IdentityError::InvalidResponse(format!(
                "expected a profile object, got {other}"
            ))),
        }
    }
}
