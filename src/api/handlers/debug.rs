/*
 * Responsibility
 * - GET /debug/token (only routed in debug mode)
 * - Shape of the resolved token and its unverified JWT claims, masked by default
 */
use axum::{Json, extract::State};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

use crate::api::dto::debug::{JwtPayloadSubset, TokenDiagnostics};
use crate::services::identity::{SessionScope, response_shape};
use crate::state::AppState;

pub async fn token_diagnostics(
    State(state): State<AppState>,
    scope: SessionScope,
) -> Json<TokenDiagnostics> {
    let credential = state.tokens.resolve(&scope).await;
    let token_keys = match state.tokens.provider().access_token(Some(&scope)).await {
        Ok(raw) => response_shape(&raw),
        Err(e) => vec![format!("(error: {e})")],
    };

    let token = credential.as_ref().map(|c| c.expose()).unwrap_or_default();
    let payload = decode_jwt_payload(token);

    Json(TokenDiagnostics {
        ok: true,
        token_present: credential.is_some(),
        masked_token: credential.as_ref().map(|c| c.masked()),
        token_length: token.len(),
        dot_count: token.matches('.').count(),
        token_looks_like_jwt: token.split('.').count() == 3,
        token_keys,
        jwt_payload_keys: payload.as_ref().map(|p| p.keys().cloned().collect()),
        jwt_payload_subset: payload.as_ref().map(|p| JwtPayloadSubset {
            aud: claim(p, &["aud", "audience"]),
            exp: claim(p, &["exp"]),
            sub: claim(p, &["sub"]),
            scope: claim(p, &["scope", "scopes"]),
        }),
        full_token: credential
            .as_ref()
            .filter(|_| state.tokens.expose_full_token())
            .map(|c| c.expose().to_string()),
    })
}

/// Unverified payload of a three-part JWT, `None` for anything else.
pub fn decode_jwt_payload(token: &str) -> Option<Map<String, Value>> {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn claim(payload: &Map<String, Value>, names: &[&str]) -> Value {
    names
        .iter()
        .find_map(|n| payload.get(*n).filter(|v| !v.is_null()).cloned())
        .unwrap_or(Value::Null)
}
