use serde::Serialize;
use serde_json::Value;

/// Shape of the resolved token, for diagnosing audience/scope problems.
/// `full_token` is only filled when full-token exposure is explicitly enabled.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDiagnostics {
    pub ok: bool,
    pub token_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_token: Option<String>,
    pub token_length: usize,
    pub dot_count: usize,
    pub token_looks_like_jwt: bool,
    pub token_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_payload_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_payload_subset: Option<JwtPayloadSubset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JwtPayloadSubset {
    pub aud: Value,
    pub exp: Value,
    pub sub: Value,
    pub scope: Value,
}
