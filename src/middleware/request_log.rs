//! Debug-mode request log for `/api/*`: method, path with query, cookie names.
//!
//! Cookie values and the Authorization header are never logged.

use axum::{
    Router,
    body::Body,
    extract::OriginalUri,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::services::identity::SessionScope;
use crate::state::AppState;

pub fn apply(router: Router<AppState>, debug: bool) -> Router<AppState> {
    if debug {
        router.layer(middleware::from_fn(log_request))
    } else {
        router
    }
}

async fn log_request(req: Request<Body>, next: Next) -> Response {
    let cookie_names = SessionScope::from_headers(req.headers()).cookie_names();
    // Inside a nested router `uri()` has the mount prefix stripped.
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|o| o.0.clone())
        .unwrap_or_else(|| req.uri().clone());
    tracing::info!(
        method = %req.method(),
        path = %uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"),
        cookie_names = ?cookie_names,
        "api request"
    );
    next.run(req).await
}
