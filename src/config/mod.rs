use anyhow::{bail, Context};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub resolver: ResolverConfig,
    pub geo: GeoConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds after the session anchor before a request counts again
    #[serde(default = "SessionConfig::default_timeout_secs")]
    pub timeout_secs: i64,
    /// Slide the session window forward on every observed request
    #[serde(default)]
    pub rollover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub endpoint: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub endpoint: String,
    /// Identifier scheme to resolve URLs into, e.g. `info:doi`
    pub scheme: String,
    #[serde(default)]
    pub strict: bool,
    /// URLs dropped without resolution or error
    #[serde(default)]
    pub excluded_urls: HashSet<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Path to a MaxMind Country or City database
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Measure identifier written verbatim in every output row
    pub measure_uri: String,
    #[serde(default)]
    pub add_headers: bool,
}

impl SessionConfig {
    const fn default_timeout_secs() -> i64 {
        1800
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
            rollover: false,
        }
    }
}

const fn default_http_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let timeout_secs = match std::env::var("SESSION_TIMEOUT") {
            Ok(v) => parse_session_timeout(&v)?,
            Err(_) => SessionConfig::default_timeout_secs(),
        };
        let rollover = env_flag("ROLLOVER");

        let http_timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(default_http_timeout_secs);

        let auth_endpoint = required("AUTH_API_ENDP")?;
        let user = required("URI_API_USER")?;
        let password = required("URI_API_PASS")?;

        let resolver_endpoint = required("URI_API_ENDP")?;
        let scheme = required("URI_SCHEME")?;
        let strict = env_flag("URI_STRICT");
        let excluded_urls = match std::env::var("EXCLUDED_URLS") {
            Ok(raw) => parse_excluded_urls(&raw)?,
            Err(_) => HashSet::new(),
        };

        let database_path = std::env::var("GEOLITE_DB")
            .ok()
            .filter(|path| !path.trim().is_empty());

        let measure_uri = required("MEASURE_URI")?;
        let add_headers = env_flag("ADD_HEADERS");

        Ok(Config {
            session: SessionConfig {
                timeout_secs,
                rollover,
            },
            auth: AuthConfig {
                endpoint: auth_endpoint,
                user,
                password,
                timeout_secs: http_timeout_secs,
            },
            resolver: ResolverConfig {
                endpoint: resolver_endpoint,
                scheme,
                strict,
                excluded_urls,
                timeout_secs: http_timeout_secs,
            },
            geo: GeoConfig { database_path },
            report: ReportConfig {
                measure_uri,
                add_headers,
            },
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Parse a session timeout in whole seconds
pub fn parse_session_timeout(raw: &str) -> anyhow::Result<i64> {
    let secs = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("SESSION_TIMEOUT must be a number of seconds, got '{raw}'"))?;
    validate_session_timeout(secs)
}

/// Reject timeouts that are negative or too large for a `TimeDelta`
pub fn validate_session_timeout(secs: i64) -> anyhow::Result<i64> {
    if secs < 0 {
        bail!("SESSION_TIMEOUT must not be negative");
    }
    TimeDelta::try_seconds(secs).context("SESSION_TIMEOUT out of range")?;
    Ok(secs)
}

/// Parse the JSON array of URLs to exclude
pub fn parse_excluded_urls(raw: &str) -> anyhow::Result<HashSet<String>> {
    if raw.trim().is_empty() {
        return Ok(HashSet::new());
    }

    let urls: Vec<String> =
        serde_json::from_str(raw).context("EXCLUDED_URLS must be a JSON array of strings")?;
    Ok(urls.into_iter().collect())
}
