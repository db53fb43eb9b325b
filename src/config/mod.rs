//! Configuration loading from the environment.
//!
//! All settings come from environment variables; there is no configuration
//! file.
//!
//! | Variable | Default | Notes |
//! |---|---|---|
//! | `HTB_TOKEN` | (required) | App token, a JWT |
//! | `HTB_BASE_URL` | `https://labs.hackthebox.com/api/v4` | |
//! | `LOG_LEVEL` | `info` | Overridden by `-v`/`-q` |
//! | `REQUEST_TIMEOUT_SECONDS` | `30` | Per HTTP request |
//! | `TOOL_TIMEOUT_SECONDS` | `60` | Per `tools/call` |
//! | `RATE_LIMIT_PER_MINUTE` | `100` | Parsed, not enforced |
//! | `CACHE_TTL_SECONDS` | `300` | Parsed, not enforced |

mod settings;

pub use settings::{Config, DEFAULT_BASE_URL};

use crate::error::ConfigError;

/// Loads and validates configuration from the process environment.
///
/// # Errors
///
/// Returns an error if:
/// - `HTB_TOKEN` is missing or is not shaped like a JWT
/// - A numeric variable does not parse
/// - `HTB_BASE_URL` is not an http(s) URL
pub fn load_config() -> Result<Config, ConfigError> {
    Config::from_lookup(|name| std::env::var(name).ok())
}
