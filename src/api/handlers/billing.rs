/*
 * Responsibility
 * - POST /billing/checkout and /billing/portal
 * - Tier guard before forwarding (lookup failure -> 502, wrong tier -> 409)
 * - Map upstream portal failures to fixed codes the client can render
 */
use axum::{
    Json,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;

use crate::api::extractors::Authorized;
use crate::error::AppError;
use crate::services::billing::{
    self, CHECKOUT_PATH, PORTAL_PATH, ensure_checkout_allowed, ensure_portal_allowed,
};
use crate::services::proxy::upstream::MISSING_BASE;
use crate::services::proxy::{UpstreamError, UpstreamResponse};
use crate::state::AppState;

pub async fn checkout(
    State(state): State<AppState>,
    Authorized(credential): Authorized,
    body: Bytes,
) -> Result<Response, AppError> {
    let tier = billing::lookup_tier(&state.upstream, &credential).await?;
    ensure_checkout_allowed(tier)?;

    let plan_key = billing::plan_key_from_body(&body, &state.config.default_plan_key);
    tracing::info!(plan_key = %plan_key, "starting checkout");

    let res = state
        .upstream
        .send_json(
            Method::POST,
            CHECKOUT_PATH,
            &credential,
            Some(&json!({ "plan_key": plan_key })),
        )
        .await
        .map_err(proxy_failed)?;

    Ok(relay(res, "checkout_failed"))
}

pub async fn portal(
    State(state): State<AppState>,
    Authorized(credential): Authorized,
) -> Result<Response, AppError> {
    let tier = billing::lookup_tier(&state.upstream, &credential).await?;
    ensure_portal_allowed(tier)?;

    let payload = billing::portal_request_body(state.config.app_base_url.as_deref());
    let res = state
        .upstream
        .send_json(Method::POST, PORTAL_PATH, &credential, Some(&payload))
        .await
        .map_err(proxy_failed)?;

    if res.status == StatusCode::CONFLICT {
        return Err(AppError::rejected("stripe_customer_missing"));
    }
    if res.status.is_server_error() {
        tracing::warn!(status = %res.status, "billing portal creation failed upstream");
        return Err(AppError::PortalCreateFailed);
    }

    Ok(relay(res, "portal_request_failed"))
}

fn proxy_failed(e: UpstreamError) -> AppError {
    tracing::warn!(error = %e, "billing upstream call failed");
    match e {
        UpstreamError::NotConfigured => AppError::config(MISSING_BASE),
        other => AppError::ProxyFailed {
            detail: other.to_string(),
        },
    }
}

/// JSON bodies and successful text bodies pass through with the upstream status;
/// a non-JSON failure body is wrapped as `{ ok: false, error: <text or fallback> }`.
fn relay(res: UpstreamResponse, fallback: &'static str) -> Response {
    if !res.is_json() && !res.status.is_success() {
        let text = res.text();
        let error = if text.trim().is_empty() {
            fallback.to_string()
        } else {
            text
        };
        return (res.status, Json(json!({ "ok": false, "error": error }))).into_response();
    }

    let content_type = res
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("text/plain"));

    (res.status, [(header::CONTENT_TYPE, content_type)], res.body).into_response()
}
