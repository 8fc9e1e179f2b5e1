/*
 * Responsibility
 * - GET /account/summary: session profile + /me + /billing/summary in one view
 * - Upstream failures degrade to defaults; only missing session/credential/base are errors
 */
use axum::{
    Json,
    extract::State,
    http::Method,
};
use serde_json::Value;

use crate::api::dto::account::{
    AccountSummary, BillingMode, SummaryAccount, SummaryBilling, SummarySecurity, SummaryUser,
};
use crate::error::AppError;
use crate::services::auth::Credential;
use crate::services::billing::{self, SUMMARY_PATH};
use crate::services::identity::SessionScope;
use crate::services::proxy::upstream::MISSING_BASE;
use crate::state::AppState;

/// `amr` entries that indicate a second factor was used.
const MFA_METHODS: [&str; 5] = ["mfa", "otp", "sms", "totp", "ga"];

pub async fn summary(
    State(state): State<AppState>,
    scope: SessionScope,
) -> Result<Json<AccountSummary>, AppError> {
    let session = match state.tokens.provider().session(Some(&scope)).await {
        Ok(Some(session)) => session,
        Ok(None) => return Err(AppError::Unauthorized),
        Err(e) => {
            tracing::debug!(error = %e, "session lookup failed");
            return Err(AppError::Unauthorized);
        }
    };
    let credential = state
        .tokens
        .resolve(&scope)
        .await
        .ok_or(AppError::Unauthorized)?;
    if state.upstream.base_url().is_none() {
        return Err(AppError::config(MISSING_BASE));
    }

    let me = match billing::fetch_me(&state.upstream, &credential).await {
        Ok(me) => Some(me),
        Err(e) => {
            tracing::warn!(error = %e, "account summary: /me unavailable");
            None
        }
    };
    let billing_summary = fetch_billing_summary(&state, &credential).await;

    Ok(Json(build_summary(&session, me.as_ref(), billing_summary.as_ref())))
}

async fn fetch_billing_summary(state: &AppState, credential: &Credential) -> Option<Value> {
    match state
        .upstream
        .send_json(Method::GET, SUMMARY_PATH, credential, None)
        .await
    {
        Ok(res) if res.status.is_success() => res.json(),
        Ok(res) => {
            tracing::warn!(status = %res.status, "account summary: billing summary unavailable");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "account summary: billing summary unavailable");
            None
        }
    }
}

fn string_field(value: Option<&Value>, key: &str) -> Option<String> {
    value?.get(key)?.as_str().map(str::to_string)
}

/// `Some(true)` if any `amr` entry names a second factor, `None` without `amr`.
pub fn mfa_enrolled(session: &Value) -> Option<bool> {
    let amr = session.get("amr")?.as_array()?;
    Some(amr.iter().any(|v| {
        let method = match v {
            Value::String(s) => s.to_ascii_lowercase(),
            other => other.to_string().to_ascii_lowercase(),
        };
        MFA_METHODS.contains(&method.as_str())
    }))
}

pub fn build_summary(session: &Value, me: Option<&Value>, billing: Option<&Value>) -> AccountSummary {
    let authority_level = me.and_then(billing::authority_level).unwrap_or(0);
    let subscription = billing.and_then(|b| b.get("subscription"));

    AccountSummary {
        user: SummaryUser {
            sub: string_field(Some(session), "sub").unwrap_or_default(),
            email: string_field(Some(session), "email"),
        },
        account: SummaryAccount {
            account_id: string_field(me, "account_id"),
        },
        authority_level,
        plan_key: string_field(me, "plan_key"),
        billing: SummaryBilling {
            mode: if authority_level == 1 {
                BillingMode::Stripe
            } else {
                BillingMode::Invoice
            },
            status: string_field(subscription, "status"),
            term_end: string_field(subscription, "current_period_end"),
            stripe_customer_id: string_field(billing, "stripe_customer_id"),
        },
        security: SummarySecurity {
            mfa_required: authority_level >= 2,
            mfa_enrolled: mfa_enrolled(session),
        },
    }
}
