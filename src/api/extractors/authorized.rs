use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::Credential;
use crate::services::identity::SessionScope;
use crate::services::proxy::upstream::MISSING_BASE;
use crate::state::AppState;

/// Handler argument for endpoints that always need a credential.
/// Resolution goes through the same scoped → ambient chain as the proxy.
pub struct Authorized(pub Credential);

impl FromRequestParts<AppState> for Authorized {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.upstream.base_url().is_none() {
            return Err(AppError::config(MISSING_BASE));
        }

        let scope = SessionScope::from_headers(&parts.headers);
        state
            .tokens
            .resolve(&scope)
            .await
            .map(Authorized)
            .ok_or(AppError::Unauthorized)
    }
}
