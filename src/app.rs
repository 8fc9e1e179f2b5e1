/*
 * Responsibility
 * - Tracing + panic hook setup
 * - Config -> identity provider -> AppState -> Router
 * - Middleware ordering, axum::serve() with graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, handlers::health::health};
use crate::config::Config;
use crate::middleware;
use crate::services::identity::HttpIdentityProvider;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set. Ex:
    // RUST_LOG=info,sagitta_bff=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr may be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it gets noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("loading configuration")?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        env = ?config.app_env,
        addr = %config.addr,
        upstream = config.upstream_base_url.as_deref().unwrap_or("(unset)"),
        debug = config.debug,
        "starting BFF"
    );
    if config.upstream_base_url.is_none() {
        tracing::warn!("AAA_API_BASE_URL not set; upstream-bound routes will answer 500");
    }
    if config.debug_full_token {
        tracing::warn!("DEBUG_FULL_TOKEN is on; full access tokens will appear in logs and /api/debug/token");
    }

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    let identity = HttpIdentityProvider::new(
        &config.auth_base_url,
        config.upstream_timeout,
        config.auth_ambient_token,
    )
    .context("building identity client")?;

    AppState::new(config.clone(), Arc::new(identity)).context("building upstream client")
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let api = middleware::request_log::apply(api::routes(config), config.debug);

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
