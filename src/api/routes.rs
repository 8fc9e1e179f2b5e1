/*
 * Responsibility
 * - URL structure under /api
 * - /aaa/{*path} is the authenticated pass-through; billing, decision-record and account are specialized
 * - /debug/token exists only in debug mode
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::config::Config;
use crate::state::AppState;

use crate::api::handlers::{
    account::summary,
    billing::{checkout, portal},
    debug::token_diagnostics,
    decision_record::{fetch_record, store_record},
    proxy::proxy,
};

pub fn routes(config: &Config) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/aaa/{*path}",
            get(proxy).post(proxy).put(proxy).patch(proxy).delete(proxy),
        )
        .route("/billing/checkout", post(checkout))
        .route("/billing/portal", post(portal))
        .route(
            "/decision-record/render",
            get(fetch_record).post(store_record),
        )
        .route("/account/summary", get(summary));

    if config.debug {
        router.route("/debug/token", get(token_diagnostics))
    } else {
        router
    }
}
