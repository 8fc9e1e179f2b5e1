//! Inbound request → bearer credential.
//!
//! The identity provider may answer with a bare string or with an object whose
//! token field name varies; resolution never fails, it yields `None` instead and
//! leaves the 401 decision to the caller.
use std::sync::Arc;

use serde_json::Value;

use crate::services::auth::credential::Credential;
use crate::services::identity::{IdentityProvider, SessionScope, response_shape};

/// Object fields probed for the token, in priority order.
pub const TOKEN_FIELDS: [&str; 3] = ["token", "accessToken", "access_token"];

/// Pull a token out of a provider response. First non-empty match wins.
pub fn extract_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => TOKEN_FIELDS.iter().find_map(|field| match map.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }),
        _ => None,
    }
}

#[derive(Clone)]
pub struct TokenResolver {
    provider: Arc<dyn IdentityProvider>,
    expose_full_token: bool,
}

impl TokenResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, expose_full_token: bool) -> Self {
        Self {
            provider,
            expose_full_token,
        }
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    pub fn expose_full_token(&self) -> bool {
        self.expose_full_token
    }

    /// Request-scoped lookup first, then the ambient variant when the provider has one.
    pub async fn resolve(&self, scope: &SessionScope) -> Option<Credential> {
        if let Some(credential) = self.attempt(Some(scope)).await {
            return Some(credential);
        }
        if !self.provider.supports_ambient() {
            return None;
        }
        self.attempt(None).await
    }

    async fn attempt(&self, scope: Option<&SessionScope>) -> Option<Credential> {
        let variant = if scope.is_some() { "scoped" } else { "ambient" };

        let value = match self.provider.access_token(scope).await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(
                    backend = self.provider.backend_name(),
                    variant,
                    error = %err,
                    "access token lookup failed"
                );
                return None;
            }
        };

        tracing::debug!(
            backend = self.provider.backend_name(),
            variant,
            shape = ?response_shape(&value),
            "access token result shape"
        );

        let credential = extract_token(&value).and_then(Credential::new)?;
        tracing::debug!(
            variant,
            token = %credential.for_log(self.expose_full_token),
            "access token resolved"
        );
        Some(credential)
    }
}
