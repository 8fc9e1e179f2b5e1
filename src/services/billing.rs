/*
 * Responsibility
 * - Caller tier lookup against the upstream `/me` resource (every call, no caching)
 * - Checkout/portal guard rules on top of that tier
 * - Lenient `plan_key` parsing for checkout
 */
use axum::http::Method;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;
use crate::services::auth::Credential;
use crate::services::proxy::{UpstreamClient, UpstreamError};

pub const ME_PATH: &str = "/me";
pub const CHECKOUT_PATH: &str = "/billing/checkout";
pub const PORTAL_PATH: &str = "/billing/portal";
pub const SUMMARY_PATH: &str = "/billing/summary";

/// Lookup failures. These are never business rejections: callers answer 502.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("upstream /me returned status {0}")]
    Status(u16),
    #[error("upstream /me body unusable: {0}")]
    InvalidBody(String),
}

/// Caller tier as reported by upstream `authority_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Baseline, level 0.
    Observer,
    /// Customer-billed, level 1.
    Sandbox,
    /// Contract-invoiced, level 2 and above.
    Contract(i64),
}

impl Tier {
    pub fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=0 => Tier::Observer,
            1 => Tier::Sandbox,
            n => Tier::Contract(n),
        }
    }

    pub fn level(self) -> i64 {
        match self {
            Tier::Observer => 0,
            Tier::Sandbox => 1,
            Tier::Contract(n) => n,
        }
    }
}

/// `authority_level` from a `/me` body. Missing or null means level 0.
pub fn authority_level(me: &Value) -> Option<i64> {
    let Value::Object(map) = me else {
        return None;
    };
    match map.get("authority_level") {
        None | Some(Value::Null) => Some(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    }
}

/// `GET /me` with the caller's credential.
pub async fn fetch_me(upstream: &UpstreamClient, credential: &Credential) -> Result<Value, LookupError> {
    let res = upstream
        .send_json(Method::GET, ME_PATH, credential, None)
        .await?;
    if !res.status.is_success() {
        return Err(LookupError::Status(res.status.as_u16()));
    }
    res.json()
        .ok_or_else(|| LookupError::InvalidBody("not JSON".to_string()))
}

pub async fn lookup_tier(upstream: &UpstreamClient, credential: &Credential) -> Result<Tier, LookupError> {
    let me = fetch_me(upstream, credential).await?;
    let level = authority_level(&me)
        .ok_or_else(|| LookupError::InvalidBody("authority_level is not a number".to_string()))?;
    Ok(Tier::from_level(level))
}

/// Checkout is only valid from the baseline tier.
pub fn ensure_checkout_allowed(tier: Tier) -> Result<(), AppError> {
    match tier {
        Tier::Observer => Ok(()),
        _ => {
            tracing::info!(authority_level = tier.level(), "checkout refused");
            Err(AppError::rejected("not_observer"))
        }
    }
}

/// The billing portal is only for customer-billed callers.
pub fn ensure_portal_allowed(tier: Tier) -> Result<(), AppError> {
    match tier {
        Tier::Sandbox => Ok(()),
        _ => {
            tracing::info!(authority_level = tier.level(), "portal refused");
            Err(AppError::rejected("not_sandbox"))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutBody {
    #[serde(default)]
    plan_key: Option<Value>,
}

/// Trimmed, lowercased `plan_key` from the request body, or `default` when the
/// body is missing, not JSON, or carries no usable value.
pub fn plan_key_from_body(body: &[u8], default: &str) -> String {
    serde_json::from_slice::<CheckoutBody>(body)
        .ok()
        .and_then(|b| match b.plan_key {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// `{ "return_url": "<app base>/account" }` when the app base is configured.
pub fn portal_request_body(app_base_url: Option<&str>) -> Value {
    match app_base_url.map(str::trim).filter(|s| !s.is_empty()) {
        Some(base) => serde_json::json!({
            "return_url": format!("{}/account", base.trim_end_matches('/'))
        }),
        None => serde_json::json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn authority_level_parsing() {
        assert_eq!(authority_level(&json!({"authority_level": 2})), Some(2));
        assert_eq!(authority_level(&json!({"authority_level": 1.0})), Some(1));
        assert_eq!(authority_level(&json!({"authority_level": "1"})), Some(1));
        assert_eq!(authority_level(&json!({"authority_level": null})), Some(0));
        assert_eq!(authority_level(&json!({})), Some(0));
        assert_eq!(authority_level(&json!({"authority_level": "gold"})), None);
        assert_eq!(authority_level(&json!({"authority_level": 1.5})), None);
        assert_eq!(authority_level(&json!([1])), None);
    }

    #[test]
    fn tiers_from_levels() {
        assert_eq!(Tier::from_level(0), Tier::Observer);
        assert_eq!(Tier::from_level(-1), Tier::Observer);
        assert_eq!(Tier::from_level(1), Tier::Sandbox);
        assert_eq!(Tier::from_level(3), Tier::Contract(3));
        assert_eq!(Tier::Contract(3).level(), 3);
    }

    #[test]
    fn guards() {
        assert!(ensure_checkout_allowed(Tier::Observer).is_ok());
        assert!(matches!(
            ensure_checkout_allowed(Tier::Sandbox),
            Err(AppError::Rejected { code: "not_observer" })
        ));
        assert!(matches!(
            ensure_checkout_allowed(Tier::Contract(2)),
            Err(AppError::Rejected { code: "not_observer" })
        ));

        assert!(ensure_portal_allowed(Tier::Sandbox).is_ok());
        for tier in [Tier::Observer, Tier::Contract(2)] {
            assert!(matches!(
                ensure_portal_allowed(tier),
                Err(AppError::Rejected { code: "not_sandbox" })
            ));
        }
    }

    #[test]
    fn plan_key_defaults() {
        assert_eq!(plan_key_from_body(br#"{"plan_key": " Production "}"#, "sandbox"), "production");
        assert_eq!(plan_key_from_body(br#"{"plan_key": "  "}"#, "sandbox"), "sandbox");
        assert_eq!(plan_key_from_body(br#"{"plan_key": 7}"#, "sandbox"), "sandbox");
        assert_eq!(plan_key_from_body(br#"{}"#, "sandbox"), "sandbox");
        assert_eq!(plan_key_from_body(b"", "sandbox"), "sandbox");
        assert_eq!(plan_key_from_body(b"not json", "sandbox"), "sandbox");
    }

    #[test]
    fn portal_body_uses_app_base() {
        assert_eq!(
            portal_request_body(Some("https://app.local/")),
            json!({"return_url": "https://app.local/account"})
        );
        assert_eq!(portal_request_body(Some("  ")), json!({}));
        assert_eq!(portal_request_body(None), json!({}));
    }

    #[tokio::test]
    async fn lookup_reads_me_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authority_level": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let upstream = UpstreamClient::new(Some(&server.uri()), Duration::from_secs(5)).unwrap();
        let tier = lookup_tier(&upstream, &Credential::new("tok").unwrap())
            .await
            .unwrap();
        assert_eq!(tier, Tier::Sandbox);
    }

    #[tokio::test]
    async fn lookup_non_success_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let upstream = UpstreamClient::new(Some(&server.uri()), Duration::from_secs(5)).unwrap();
        let err = lookup_tier(&upstream, &Credential::new("tok").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Status(503)));
    }
}
