//! Sync engine configuration.
//!
//! Every setting has a default, so an empty environment yields a working
//! configuration pointed at the public Pantry endpoint.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::sync::{SyncIsolation, TagComparison};
use crate::util::{is_http_url, normalize_text};

pub const DEFAULT_PANTRY_BASE_URL: &str = "https://getpantry.cloud/apiv1/pantry";
pub const DEFAULT_BASKET_NAME: &str = "LCG";
pub const DEFAULT_RATE_LIMIT_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_BASE_URL: &str = "LPT_PANTRY_BASE_URL";
const ENV_BASKET_NAME: &str = "LPT_BASKET_NAME";
const ENV_RATE_LIMIT_INTERVAL_MS: &str = "LPT_RATE_LIMIT_INTERVAL_MS";
const ENV_REQUEST_TIMEOUT_SECS: &str = "LPT_REQUEST_TIMEOUT_SECS";
const ENV_SYNC_ISOLATION: &str = "LPT_SYNC_ISOLATION";
const ENV_TAG_COMPARISON: &str = "LPT_TAG_COMPARISON";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for the remote basket client, rate limiter and merge policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Pantry API root, without trailing slash
    pub base_url: String,
    /// Basket holding the user's snapshot
    pub basket_name: String,
    /// Minimum spacing between two outbound requests
    pub rate_limit_interval: Duration,
    /// Per-request time budget; `None` waits on the transport forever
    pub request_timeout: Option<Duration>,
    pub isolation: SyncIsolation,
    pub tag_comparison: TagComparison,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PANTRY_BASE_URL.to_string(),
            basket_name: DEFAULT_BASKET_NAME.to_string(),
            rate_limit_interval: Duration::from_millis(DEFAULT_RATE_LIMIT_INTERVAL_MS),
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            isolation: SyncIsolation::default(),
            tag_comparison: TagComparison::default(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = value_or_default(&lookup, ENV_BASE_URL, DEFAULT_PANTRY_BASE_URL);
        if !is_http_url(&base_url) {
            return Err(ConfigError::Invalid(format!(
                "{ENV_BASE_URL} must start with http:// or https://"
            )));
        }

        let basket_name = value_or_default(&lookup, ENV_BASKET_NAME, DEFAULT_BASKET_NAME);
        if basket_name.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "{ENV_BASKET_NAME} must not contain '/'"
            )));
        }

        let interval_ms = parse_u64(
            &lookup,
            ENV_RATE_LIMIT_INTERVAL_MS,
            DEFAULT_RATE_LIMIT_INTERVAL_MS,
        )?;
        let timeout_secs =
            parse_u64(&lookup, ENV_REQUEST_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let isolation = optional_trimmed(&lookup, ENV_SYNC_ISOLATION)
            .map(|raw| raw.parse::<SyncIsolation>())
            .transpose()
            .map_err(|error| ConfigError::Invalid(format!("{ENV_SYNC_ISOLATION}: {error}")))?
            .unwrap_or_default();

        let tag_comparison = optional_trimmed(&lookup, ENV_TAG_COMPARISON)
            .map(|raw| raw.parse::<TagComparison>())
            .transpose()
            .map_err(|error| ConfigError::Invalid(format!("{ENV_TAG_COMPARISON}: {error}")))?
            .unwrap_or_default();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            basket_name,
            rate_limit_interval: Duration::from_millis(interval_ms),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            isolation,
            tag_comparison,
        })
    }
}

fn parse_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    optional_trimmed(lookup, name).map_or(Ok(default), |raw| {
        raw.parse::<u64>()
            .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
    })
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| normalize_text(&value))
}
