use std::fmt;

use axum::http::HeaderValue;
use secrecy::{ExposeSecret, SecretString};

/// Bearer credential resolved for a single inbound request.
///
/// The raw value is only reachable through [`Credential::expose`] and
/// [`Credential::bearer_header`]; `Debug` and [`Credential::masked`] never print it.
#[derive(Clone)]
pub struct Credential {
    secret: SecretString,
    header: HeaderValue,
}

impl Credential {
    /// Returns `None` for blank input and for values that cannot travel in an
    /// `authorization` header (control characters and the like).
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return None;
        }
        let mut header = HeaderValue::from_str(&format!("Bearer {raw}")).ok()?;
        header.set_sensitive(true);
        Some(Self {
            secret: SecretString::from(raw),
            header,
        })
    }

    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    /// `authorization: Bearer <token>` header value, marked sensitive.
    pub fn bearer_header(&self) -> HeaderValue {
        self.header.clone()
    }

    pub fn masked(&self) -> String {
        mask(self.expose())
    }

    /// Value for logs: masked unless the full-token debug flag is set.
    pub fn for_log(&self, expose_full: bool) -> String {
        if expose_full {
            self.expose().to_string()
        } else {
            self.masked()
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

const MASK_KEEP: usize = 6;

/// First and last six characters with the middle elided; short values are fully hidden.
pub fn mask(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= MASK_KEEP * 2 {
        return "****".to_string();
    }
    let head: String = chars[..MASK_KEEP].iter().collect();
    let tail: String = chars[chars.len() - MASK_KEEP..].iter().collect();
    format!("{head}…{tail}")
}
