//! Configuration structure and environment parsing.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Default HackTheBox labs API root.
pub const DEFAULT_BASE_URL: &str = "https://labs.hackthebox.com/api/v4";

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 100;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Runtime configuration.
#[derive(Clone)]
pub struct Config {
    /// HTB app token (JWT).
    pub htb_token: String,

    /// API root, without a trailing slash.
    pub htb_base_url: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Timeout for a single HTTP request to the API.
    pub request_timeout: Duration,

    /// Upper bound on a single `tools/call`, including every request it makes.
    pub tool_timeout: Duration,

    /// Reserved for rate limiting; not enforced.
    pub rate_limit_per_minute: u32,

    /// Reserved for response caching; not enforced.
    pub cache_ttl: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("htb_token", &"<redacted>")
            .field("htb_base_url", &self.htb_base_url)
            .field("log_level", &self.log_level)
            .field("request_timeout", &self.request_timeout)
            .field("tool_timeout", &self.tool_timeout)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl Config {
    /// Builds configuration from a variable lookup function.
    ///
    /// `lookup` returns the value of a variable, or `None` when unset.
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or validation fails.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let htb_token = get("HTB_TOKEN")
            .ok_or(ConfigError::MissingVariable { name: "HTB_TOKEN" })?
            .trim()
            .to_string();

        let config = Self {
            htb_token,
            htb_base_url: get("HTB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim()
                .trim_end_matches('/')
                .to_string(),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            request_timeout: Duration::from_secs(parse_number(
                "REQUEST_TIMEOUT_SECONDS",
                get("REQUEST_TIMEOUT_SECONDS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            tool_timeout: Duration::from_secs(parse_number(
                "TOOL_TIMEOUT_SECONDS",
                get("TOOL_TIMEOUT_SECONDS"),
                DEFAULT_TOOL_TIMEOUT_SECS,
            )?),
            rate_limit_per_minute: parse_number(
                "RATE_LIMIT_PER_MINUTE",
                get("RATE_LIMIT_PER_MINUTE"),
                DEFAULT_RATE_LIMIT_PER_MINUTE,
            )?,
            cache_ttl: Duration::from_secs(parse_number(
                "CACHE_TTL_SECONDS",
                get("CACHE_TTL_SECONDS"),
                DEFAULT_CACHE_TTL_SECS,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_token(&self.htb_token)?;

        let url = Url::parse(&self.htb_base_url).map_err(|e| ConfigError::InvalidValue {
            name: "HTB_BASE_URL",
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                name: "HTB_BASE_URL",
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.request_timeout.is_zero() || self.tool_timeout.is_zero() {
            return Err(ConfigError::ValidationError {
                message: "timeouts must be at least one second".to_string(),
            });
        }

        Ok(())
    }
}

/// Checks that the token has the three dot-separated parts of a JWT.
fn validate_token(token: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidValue {
            name: "HTB_TOKEN",
            message: "token must be a valid JWT with 3 parts separated by dots".to_string(),
        });
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    raw.map_or(Ok(default), |value| {
        value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name,
            message: format!("'{}' is not a non-negative integer", value.trim()),
        })
    })
}
