/*
 * Responsibility
 * - GET /health (liveness only, no upstream or identity call)
 * - Mounted outside /api so it skips the API-only middleware
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
