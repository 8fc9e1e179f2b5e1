/*
 * Responsibility
 * - /api/aaa/{*path}: resolve credential -> classify -> forward -> relay
 * - The path is read undecoded from the URI; paths the upstream would reinterpret are refused
 * - Debug logging of the request/response envelope (never token or cookie values)
 */
use axum::{
    extract::State,
    http::{HeaderMap, Method, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::error::AppError;
use crate::services::identity::SessionScope;
use crate::services::proxy::{ProxyOutcome, ProxyRequest, UpstreamPath};
use crate::state::AppState;

/// Mount point of this handler inside the `/api` router (the nest prefix is already stripped).
const ROUTE_PREFIX: &str = "/aaa";

pub async fn proxy(
    State(state): State<AppState>,
    scope: SessionScope,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw = uri.path().strip_prefix(ROUTE_PREFIX).unwrap_or_default();
    let path = match UpstreamPath::parse(raw) {
        Ok(path) => path,
        Err(e) => {
            tracing::info!(path = %raw, error = %e, "refusing proxy path");
            return AppError::bad_request("invalid path").into_response();
        }
    };

    let request = ProxyRequest::new(method, path, &uri, &headers, body);
    let access = state.classifier.classify(&request.method, &request.path);
    let credential = state.tokens.resolve(&scope).await;

    if state.config.debug {
        let has_session = state
            .tokens
            .provider()
            .session(Some(&scope))
            .await
            .ok()
            .flatten()
            .is_some();
        tracing::info!(
            method = %request.method,
            upstream_path = %request.path,
            base_present = state.upstream.base_url().is_some(),
            access = ?access,
            has_access_token = credential.is_some(),
            has_session,
            cookie_names = ?scope.cookie_names(),
            content_type = ?headers.get(header::CONTENT_TYPE),
            accept = ?headers.get(header::ACCEPT),
            "proxy request"
        );
    }

    let upstream_path = request.path.clone();
    let outcome = state
        .upstream
        .forward(request, access, credential.as_ref())
        .await;

    match &outcome {
        ProxyOutcome::Forwarded {
            status,
            content_type,
            ..
        } if state.config.debug => {
            tracing::info!(upstream_path = %upstream_path, status = %status, content_type = ?content_type, "proxy response");
        }
        ProxyOutcome::Unauthorized => {
            tracing::debug!(upstream_path = %upstream_path, access = ?access, "no access token for protected request");
        }
        ProxyOutcome::ConfigError { detail } => {
            tracing::error!(detail = %detail, "upstream not configured");
        }
        _ => {}
    }

    outcome.into_response()
}

#[cfg(test)]
mod tests {
    use crate::test_support::{FakeIdentity, Reply, TOKEN, app, dead_base, send};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use wiremock::matchers::{any, body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn anonymous_write_is_401_without_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let res = send(
            app(Some(server.uri()), FakeIdentity::anonymous()),
            Request::post("/api/aaa/scenario")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"a":1}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.json()["error"], "unauthorized");
    }

    #[tokio::test]
    async fn anonymous_protected_read_is_401() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for p in ["/api/aaa/me", "/api/aaa/portfolios/1", "/api/aaa/decision-runs"] {
            let res = send(
                app(Some(server.uri()), FakeIdentity::anonymous()),
                Request::get(p).body(Body::empty()).unwrap(),
            )
            .await;
            assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{p}");
        }
    }

    #[tokio::test]
    async fn anonymous_public_read_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/regimes/current"))
            .and(query_param("as_of", "2024-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"regime": "calm"})))
            .expect(1)
            .mount(&server)
            .await;

        let res = send(
            app(Some(server.uri()), FakeIdentity::anonymous()),
            Request::get("/api/aaa/regimes/current?as_of=2024-01-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json(), json!({"regime": "calm"}));
    }

    #[tokio::test]
    async fn authenticated_write_forwards_body_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/portfolios/9"))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .and(body_bytes(br#"{"name":"x"}"#.to_vec()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let res = send(
            app(Some(server.uri()), FakeIdentity::logged_in()),
            Request::put("/api/aaa/portfolios/9")
                .header("content-type", "application/json")
                .header("cookie", "appSession=abc")
                .body(Body::from(r#"{"name":"x"}"#))
                .unwrap(),
        )
        .await;

        assert_eq!(res.status, StatusCode::NO_CONTENT);
        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("cookie").is_none());
    }

    #[tokio::test]
    async fn ambient_token_rescues_failed_scoped_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/policies/3"))
            .and(header("authorization", "Bearer ambient-tok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let idp = FakeIdentity::new(Reply::Fail)
            .with_ambient(Reply::Value(json!({"accessToken": "ambient-tok"})))
            .shared();
        let res = send(
            app(Some(server.uri()), idp),
            Request::delete("/api/aaa/policies/3").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn upstream_errors_are_relayed_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(403).set_body_raw("nope", "text/plain"))
            .mount(&server)
            .await;

        let res = send(
            app(Some(server.uri()), FakeIdentity::logged_in()),
            Request::get("/api/aaa/me").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(res.status, StatusCode::FORBIDDEN);
        assert_eq!(res.headers["content-type"], "text/plain");
        assert_eq!(res.body.as_ref(), b"nope");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_502_with_diagnostics() {
        let base = dead_base().await;
        let res = send(
            app(Some(base.clone()), FakeIdentity::logged_in()),
            Request::get("/api/aaa/portfolios?page=2").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(res.status, StatusCode::BAD_GATEWAY);
        let body = res.json();
        assert_eq!(body["error"], "upstream_unreachable");
        assert_eq!(body["path"], "/portfolios");
        assert_eq!(body["target"], format!("{base}/portfolios?page=2"));
    }

    #[tokio::test]
    async fn reinterpretable_paths_are_refused_before_any_call() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for p in [
            "/api/aaa/portfolios%3Fx=1",
            "/api/aaa/portfolios%23",
            "/api/aaa/x/../portfolios",
            "/api/aaa/x/%2e%2e/me",
            "/api/aaa/x%2F..%2Fme",
        ] {
            for idp in [FakeIdentity::anonymous(), FakeIdentity::logged_in()] {
                let res = send(
                    app(Some(server.uri()), idp),
                    Request::get(p).body(Body::empty()).unwrap(),
                )
                .await;
                assert_eq!(res.status, StatusCode::BAD_REQUEST, "{p}");
                assert_eq!(res.json(), json!({"ok": false, "error": "invalid path"}), "{p}");
            }
        }
    }

    #[tokio::test]
    async fn encoded_protected_path_still_needs_a_credential() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for p in ["/api/aaa/p%6Frtfolios", "/api/aaa/%6De", "/api/aaa/portfolios/%31"] {
            let res = send(
                app(Some(server.uri()), FakeIdentity::anonymous()),
                Request::get(p).body(Body::empty()).unwrap(),
            )
            .await;
            assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{p}");
        }
    }

    #[tokio::test]
    async fn encoded_path_is_forwarded_as_received() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/a%20b"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let res = send(
            app(Some(server.uri()), FakeIdentity::anonymous()),
            Request::get("/api/aaa/files/a%20b").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn header_unsafe_token_counts_as_absent() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let idp = FakeIdentity::new(Reply::Value(json!({"token": "tok\nen"}))).shared();
        let res = send(
            app(Some(server.uri()), idp),
            Request::get("/api/aaa/portfolios").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_upstream_base_is_500() {
        let res = send(
            app(None, FakeIdentity::logged_in()),
            Request::get("/api/aaa/regimes").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.json(),
            json!({"ok": false, "error": "AAA_API_BASE_URL not set"})
        );
    }
}
