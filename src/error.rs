/*
 * Responsibility
 * - The client-facing error vocabulary (one AppError for every handler)
 * - IntoResponse: HTTP status + flat JSON body `{ ok: false, error, ... }`
 *   - gateway and business errors carry a snake_case code in `error`
 *   - config, validation and not-found errors carry the readable message in `error`
 * - Lower-layer errors (upstream, lookup, cache) are converted here
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::billing::LookupError;
use crate::services::cache::ArtifactError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {detail}")]
    Config { detail: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("{message}")]
    BadRequest { message: String },
    #[error("{message}")]
    PayloadTooLarge { message: String },
    #[error("{message}")]
    NotFound { message: String },
    /// A business guard refused the request (wrong tier, missing billing customer...).
    #[error("rejected: {code}")]
    Rejected { code: &'static str },
    #[error("upstream unreachable: {detail}")]
    UpstreamUnreachable {
        detail: String,
        path: String,
        target: String,
    },
    #[error("proxy error: {detail}")]
    ProxyFailed { detail: String },
    #[error("authority lookup failed")]
    LookupFailed,
    #[error("portal create failed")]
    PortalCreateFailed,
}

impl AppError {
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn rejected(code: &'static str) -> Self {
        Self::Rejected { code }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config { .. } | AppError::PortalCreateFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Rejected { .. } => StatusCode::CONFLICT,
            AppError::UpstreamUnreachable { .. }
            | AppError::ProxyFailed { .. }
            | AppError::LookupFailed => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, detail, path, target) = match self {
            AppError::Config { detail } => (detail, None, None, None),
            AppError::Unauthorized => (
                "unauthorized".to_string(),
                Some("Not authenticated (no access token)".to_string()),
                None,
                None,
            ),
            AppError::BadRequest { message }
            | AppError::PayloadTooLarge { message }
            | AppError::NotFound { message } => (message, None, None, None),
            AppError::Rejected { code } => (code.to_string(), None, None, None),
            AppError::UpstreamUnreachable {
                detail,
                path,
                target,
            } => (
                "upstream_unreachable".to_string(),
                Some(detail),
                Some(path),
                Some(target),
            ),
            AppError::ProxyFailed { detail } => ("proxy_error".to_string(), Some(detail), None, None),
            AppError::LookupFailed => ("authority_lookup_failed".to_string(), None, None, None),
            AppError::PortalCreateFailed => ("portal_create_failed".to_string(), None, None, None),
        };

        let body = ErrorResponse {
            ok: false,
            error,
            detail,
            path,
            target,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ArtifactError> for AppError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::TooLarge { .. } => AppError::PayloadTooLarge {
                message: "html payload too large".to_string(),
            },
        }
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        tracing::warn!(error = %e, "authority lookup failed");
        AppError::LookupFailed
    }
}
