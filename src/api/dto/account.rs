use serde::Serialize;

#[derive(Debug, Serialize, PartialEq)]
pub struct AccountSummary {
    pub user: SummaryUser,
    pub account: SummaryAccount,
    pub authority_level: i64,
    pub plan_key: Option<String>,
    pub billing: SummaryBilling,
    pub security: SummarySecurity,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryUser {
    pub sub: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryAccount {
    pub account_id: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    Stripe,
    Invoice,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryBilling {
    pub mode: BillingMode,
    pub status: Option<String>,
    pub term_end: Option<String>,
    pub stripe_customer_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SummarySecurity {
    pub mfa_required: bool,
    pub mfa_enrolled: Option<bool>,
}
