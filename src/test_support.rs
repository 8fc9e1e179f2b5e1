//! Shared fixtures for unit and router tests.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use bytes::Bytes;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::{AppEnv, Config, DEFAULT_PLAN_KEY, DEFAULT_PROTECTED_READ_PREFIXES};
use crate::services::identity::provider::IdentityError;
use crate::services::identity::{IdentityProvider, SessionScope};
use crate::services::identity::provider::IdentityResult;
use crate::state::AppState;

pub const TOKEN: &str = "tok-123";

#[derive(Debug, Clone)]
pub enum Reply {
    Value(Value),
    Fail,
}

impl Reply {
    fn into_result(self) -> IdentityResult<Value> {
        match self {
            Reply::Value(v) => Ok(v),
            Reply::Fail => Err(IdentityError::Transport("connection refused".into())),
        }
    }
}

/// Identity provider with canned replies and call counters.
#[derive(Debug)]
pub struct FakeIdentity {
    scoped: Reply,
    ambient: Option<Reply>,
    session: Option<Value>,
    scoped_calls: AtomicUsize,
    ambient_calls: AtomicUsize,
}

impl FakeIdentity {
    pub fn new(scoped: Reply) -> Self {
        Self {
            scoped,
            ambient: None,
            session: None,
            scoped_calls: AtomicUsize::new(0),
            ambient_calls: AtomicUsize::new(0),
        }
    }

    /// Logged in: scoped lookup yields `{ "token": TOKEN }`, session has a user.
    pub fn logged_in() -> Arc<Self> {
        Self::new(Reply::Value(json!({ "token": TOKEN })))
            .with_session(json!({ "sub": "auth0|u1", "email": "u1@example.com" }))
            .shared()
    }

    pub fn anonymous() -> Arc<Self> {
        Self::new(Reply::Fail).shared()
    }

    pub fn with_ambient(mut self, reply: Reply) -> Self {
        self.ambient = Some(reply);
        self
    }

    pub fn with_session(mut self, session: Value) -> Self {
        self.session = Some(session);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn scoped_calls(&self) -> usize {
        self.scoped_calls.load(Ordering::SeqCst)
    }

    pub fn ambient_calls(&self) -> usize {
        self.ambient_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    fn backend_name(&self) -> &'static str {
        "fake"
    }

    fn supports_ambient(&self) -> bool {
        self.ambient.is_some()
    }

    async fn access_token(&self, scope: Option<&SessionScope>) -> IdentityResult<Value> {
        match scope {
            Some(_) => {
                self.scoped_calls.fetch_add(1, Ordering::SeqCst);
                self.scoped.clone().into_result()
            }
            None => {
                self.ambient_calls.fetch_add(1, Ordering::SeqCst);
                match &self.ambient {
                    Some(reply) => reply.clone().into_result(),
                    None => Err(IdentityError::AmbientUnsupported),
                }
            }
        }
    }

    async fn session(&self, _scope: Option<&SessionScope>) -> IdentityResult<Option<Value>> {
        Ok(self.session.clone())
    }
}

pub fn config(upstream: Option<String>) -> Config {
    Config {
        addr: "127.0.0.1:0".parse().expect("static addr"),
        app_env: AppEnv::Development,
        cors_allowed_origins: Vec::new(),
        upstream_base_url: upstream,
        upstream_timeout: Duration::from_secs(5),
        protected_read_prefixes: DEFAULT_PROTECTED_READ_PREFIXES
            .iter()
            .map(|s| s.to_string())
            .collect(),
        auth_base_url: "http://idp.invalid".to_string(),
        auth_ambient_token: false,
        debug: true,
        debug_full_token: false,
        app_base_url: None,
        default_plan_key: DEFAULT_PLAN_KEY.to_string(),
        decision_record_ttl: Duration::from_secs(600),
        decision_record_capacity: 64,
        decision_record_max_bytes: 5 * 1024 * 1024,
    }
}

pub fn app_with(config: Config, identity: Arc<FakeIdentity>) -> Router {
    let state = AppState::new(config.clone(), identity).expect("state");
    crate::app::build_router(state, &config)
}

pub fn app(upstream: Option<String>, identity: Arc<FakeIdentity>) -> Router {
    app_with(config(upstream), identity)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Base URL of a port nothing listens on.
pub async fn dead_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}
