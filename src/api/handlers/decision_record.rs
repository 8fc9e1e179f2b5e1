/*
 * Responsibility
 * - POST /decision-record/render: store rendered HTML, answer with its token
 * - GET  /decision-record/render?token=: hand the HTML back while it is fresh
 * - Anonymous; the token is the only capability
 */
use axum::{
    Json,
    extract::{Query, State},
};
use bytes::Bytes;

use crate::api::dto::decision_record::{
    FetchRecordQuery, FetchedRecord, StoreRecordRequest, StoredRecord,
};
use crate::error::AppError;
use crate::state::AppState;

pub async fn store_record(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StoredRecord>, AppError> {
    let req: StoreRecordRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "decision record body is not JSON");
        AppError::bad_request("invalid JSON body")
    })?;

    let html = req.html();
    if html.is_empty() {
        return Err(AppError::bad_request("html is required"));
    }

    let token = state.artifacts.put(req.token(), html.to_string())?;
    tracing::debug!(
        token = %token,
        bytes = html.len(),
        entries = state.artifacts.entry_count(),
        "decision record stored"
    );

    Ok(Json(StoredRecord { ok: true, token }))
}

pub async fn fetch_record(
    State(state): State<AppState>,
    Query(query): Query<FetchRecordQuery>,
) -> Result<Json<FetchedRecord>, AppError> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("token is required"))?;

    let html = state
        .artifacts
        .get(token)
        .ok_or_else(|| AppError::not_found("decision record not found or expired"))?;

    Ok(Json(FetchedRecord { ok: true, html }))
}
