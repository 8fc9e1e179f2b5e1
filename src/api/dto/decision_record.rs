use serde::{Deserialize, Serialize};
use serde_json::Value;

/// POST /decision-record/render body.
///
/// Both fields are taken leniently: anything that is not a string counts as absent.
#[derive(Debug, Default, Deserialize)]
pub struct StoreRecordRequest {
    #[serde(default)]
    pub token: Option<Value>,
    #[serde(default)]
    pub html: Option<Value>,
}

impl StoreRecordRequest {
    pub fn token(&self) -> Option<&str> {
        match &self.token {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Empty when missing or not a string.
    pub fn html(&self) -> &str {
        match &self.html {
            Some(Value::String(s)) => s.as_str(),
            _ => "",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FetchRecordQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoredRecord {
    pub ok: bool,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct FetchedRecord {
    pub ok: bool,
    pub html: String,
}
