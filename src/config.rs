/*
 * Responsibility
 * - Load settings from the environment (upstream base, identity provider, debug flags, cache limits)
 * - Validate what must exist at startup (missing -> startup failure)
 * - The upstream base is optional here; its absence is reported per request as a 500
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Read paths that require a credential even though they are reads.
pub const DEFAULT_PROTECTED_READ_PREFIXES: &[&str] =
    &["/me", "/scenarios", "/portfolios", "/policies", "/decision-runs"];

pub const DEFAULT_PLAN_KEY: &str = "sandbox";

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // Upstream business API. `None` is served as a configuration error per request.
    pub upstream_base_url: Option<String>,
    pub upstream_timeout: Duration,
    pub protected_read_prefixes: Vec<String>,

    // Identity provider (session -> access token)
    pub auth_base_url: String,
    pub auth_ambient_token: bool,

    pub debug: bool,
    pub debug_full_token: bool,

    // Billing
    pub app_base_url: Option<String>,
    pub default_plan_key: String,

    // Decision record hand-off cache
    pub decision_record_ttl: Duration,
    pub decision_record_capacity: usize,
    pub decision_record_max_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = split_list(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let upstream_base_url = non_empty_var("AAA_API_BASE_URL");
        if let Some(base) = &upstream_base_url {
            url::Url::parse(base).map_err(|_| ConfigError::Invalid("AAA_API_BASE_URL"))?;
        }

        let upstream_timeout = Duration::from_secs(parse_or("UPSTREAM_TIMEOUT_SECONDS", 20));

        let protected_read_prefixes = match non_empty_var("PROTECTED_READ_PREFIXES") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_PROTECTED_READ_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let auth_base_url =
            non_empty_var("AUTH_BASE_URL").ok_or(ConfigError::Missing("AUTH_BASE_URL"))?;
        url::Url::parse(&auth_base_url).map_err(|_| ConfigError::Invalid("AUTH_BASE_URL"))?;

        let auth_ambient_token = flag("AUTH_AMBIENT_TOKEN");

        // Verbose proxy logging is on outside production unless asked for explicitly.
        let debug = flag("AAA_PROXY_DEBUG") || !app_env.is_production();
        let debug_full_token = flag("DEBUG_FULL_TOKEN");

        let app_base_url = non_empty_var("APP_BASE_URL");

        let default_plan_key = non_empty_var("DEFAULT_PLAN_KEY")
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_PLAN_KEY.to_string());

        let decision_record_ttl = Duration::from_secs(parse_or("DECISION_RECORD_TTL_SECONDS", 600));
        let decision_record_capacity = parse_or("DECISION_RECORD_CAPACITY", 64);
        if decision_record_capacity == 0 {
            return Err(ConfigError::Invalid("DECISION_RECORD_CAPACITY"));
        }
        let decision_record_max_bytes = parse_or("DECISION_RECORD_MAX_BYTES", 5 * 1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            upstream_base_url,
            upstream_timeout,
            protected_read_prefixes,
            auth_base_url,
            auth_ambient_token,
            debug,
            debug_full_token,
            app_base_url,
            default_plan_key,
            decision_record_ttl,
            decision_record_capacity,
            decision_record_max_bytes,
        })
    }

    /// Largest request body any route accepts: the artifact ceiling plus room for the JSON envelope.
    pub fn max_request_body_bytes(&self) -> usize {
        self.decision_record_max_bytes.saturating_add(64 * 1024)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag(key: &str) -> bool {
    matches!(
        std::env::var(key).ok().as_deref().map(str::trim),
        Some("1") | Some("true")
    )
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
