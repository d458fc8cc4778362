//! Configuration types for numcheck

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Default task endpoint of the checknumber.ai service
pub const DEFAULT_BASE_URL: &str = "https://api.checknumber.ai/wa/api/simple/tasks";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "WHATSAPP_API_KEY";

/// Main configuration for [`crate::JobClient`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// API key sent as `X-API-Key` on every service call
    pub api_key: String,

    /// Task endpoint (default: checknumber.ai simple tasks API)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Delay between status polls (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Timeout for submit and status calls (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Timeout for the artifact download (default: 10 minutes)
    ///
    /// Result spreadsheets for large batches can take a while to transfer.
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// TCP connect timeout applied to every call (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Where the result artifact is written when the caller gives no path
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Retry policy used by [`crate::JobClient::run_with_retry`]
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            poll_interval: default_poll_interval(),
            request_timeout: default_request_timeout(),
            download_timeout: default_download_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            output_path: default_output_path(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Create a configuration with default settings and the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from the process environment
    ///
    /// Reads `WHATSAPP_API_KEY` (required), and optionally
    /// `NUMCHECK_BASE_URL`, `NUMCHECK_POLL_INTERVAL_SECS` and `NUMCHECK_OUTPUT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: format!("{} is not set", API_KEY_ENV),
                key: Some("api_key".to_string()),
            })?;

        let mut config = Self::new(api_key);

        if let Some(base_url) = lookup("NUMCHECK_BASE_URL") {
            config.base_url = base_url;
        }

        if let Some(secs) = lookup("NUMCHECK_POLL_INTERVAL_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| Error::Config {
                message: format!("poll interval must be a whole number of seconds, got {:?}", secs),
                key: Some("poll_interval".to_string()),
            })?;
            config.poll_interval = Duration::from_secs(secs);
        }

        if let Some(output) = lookup("NUMCHECK_OUTPUT") {
            config.output_path = PathBuf::from(output);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the settings the client cannot work without
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config {
                message: "API key must not be empty".to_string(),
                key: Some("api_key".to_string()),
            });
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(Error::Config {
                    message: format!("unsupported base URL scheme: {}", url.scheme()),
                    key: Some("base_url".to_string()),
                });
            }
            Err(e) => {
                return Err(Error::Config {
                    message: format!("invalid base URL {:?}: {}", self.base_url, e),
                    key: Some("base_url".to_string()),
                });
            }
        }

        crate::poller::check_interval(self.poll_interval)
    }
}

/// Retry behavior configuration
///
/// Applied around a whole job (submit, poll, download), never inside a stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    format!("numcheck/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_path() -> PathBuf {
    PathBuf::from("whatsapp_results.xlsx")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
