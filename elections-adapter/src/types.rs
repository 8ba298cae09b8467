//! Shared data types for adapter configuration and probing.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AdapterError;

/// Public inquiry page of the electoral commission.
pub const DEFAULT_INQUIRY_URL: &str = "https://www.elections.eg/inquiry";
/// Default port for a chromedriver spawned by the adapter.
pub const DEFAULT_DRIVER_PORT: u16 = 9515;
/// Desktop Chrome user agent presented to the site.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Environment variable overriding [`FormConfig::inquiry_url`].
pub const INQUIRY_URL_ENV_VAR: &str = "ELECTIONS_INQUIRY_URL";
/// Environment variable selecting an already running WebDriver server.
pub const WEBDRIVER_URL_ENV_VAR: &str = "ELECTIONS_WEBDRIVER_URL";
/// Environment variable overriding the spawned chromedriver port.
pub const DRIVER_PORT_ENV_VAR: &str = "ELECTIONS_DRIVER_PORT";
/// Environment variable overriding [`PoolConfig::size`].
pub const POOL_SIZE_ENV_VAR: &str = "ELECTIONS_POOL_SIZE";
/// Environment variable overriding [`PoolConfig::session_ttl`], in seconds.
pub const SESSION_TTL_ENV_VAR: &str = "ELECTIONS_SESSION_TTL_SECS";
/// Environment variable overriding [`BrowserConfig::headless`].
pub const HEADLESS_ENV_VAR: &str = "ELECTIONS_HEADLESS";

/// Where the WebDriver server comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DriverEndpoint {
    /// Spawn a local chromedriver and own its lifetime.
    Spawn {
        /// Explicit chromedriver path (None = discover).
        binary: Option<PathBuf>,
        /// Port passed as `--port`.
        port: u16,
        /// How long to wait for `/status` to report ready.
        startup_timeout: Duration,
    },
    /// Connect to a WebDriver server someone else manages.
    Remote(String),
}

impl Default for DriverEndpoint {
    fn default() -> Self {
        Self::Spawn {
            binary: None,
            port: DEFAULT_DRIVER_PORT,
            startup_timeout: Duration::from_secs(20),
        }
    }
}

/// Chrome launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run without a visible window.
    pub headless: bool,
    /// User agent string.
    pub user_agent: String,
    /// Chrome binary override (None = chromedriver's default lookup).
    pub chrome_binary: Option<PathBuf>,
    /// Page-load timeout enforced by the browser.
    pub page_load_timeout: Duration,
    /// Extra command-line switches appended after the defaults.
    pub extra_args: Vec<String>,
    /// Give each session a private `--user-data-dir` on this host.
    ///
    /// Only meaningful when the browser runs on the same machine; turned
    /// off for remote WebDriver servers.
    pub isolated_profile: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_binary: None,
            page_load_timeout: Duration::from_secs(30),
            extra_args: Vec::new(),
            isolated_profile: true,
        }
    }
}

/// Browser session pool limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum concurrent sessions (default: 3).
    pub size: usize,
    /// Idle sessions older than this are closed instead of reused (default: 300s).
    pub session_ttl: Duration,
    /// How long a checkout waits for a free slot (default: 30s).
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: 3,
            session_ttl: Duration::from_secs(300),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Timings and location of the inquiry form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormConfig {
    /// Inquiry page URL.
    pub inquiry_url: String,
    /// Pause after navigation before looking for the form.
    pub settle_delay: Duration,
    /// Pause after submitting before reading the result.
    pub result_delay: Duration,
    /// Maximum wait for each form element and for the result markers.
    pub element_timeout: Duration,
    /// Interval between element polls.
    pub poll_interval: Duration,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            inquiry_url: DEFAULT_INQUIRY_URL.to_string(),
            settle_delay: Duration::from_secs(2),
            result_delay: Duration::from_secs(3),
            element_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Complete adapter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// WebDriver server source.
    pub driver: DriverEndpoint,
    /// Chrome settings.
    pub browser: BrowserConfig,
    /// Session pool limits.
    pub pool: PoolConfig,
    /// Form location and timings.
    pub form: FormConfig,
}

impl AdapterConfig {
    /// Reads configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AdapterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(INQUIRY_URL_ENV_VAR) {
            config.form.inquiry_url = url.trim().to_string();
        }

        if let Some(url) = lookup(WEBDRIVER_URL_ENV_VAR) {
            config.driver = DriverEndpoint::Remote(url.trim().to_string());
            config.browser.isolated_profile = false;
        } else if let Some(value) = lookup(DRIVER_PORT_ENV_VAR) {
            let port = parse_number::<u16>(DRIVER_PORT_ENV_VAR, &value)?;
            if let DriverEndpoint::Spawn { port: p, .. } = &mut config.driver {
                *p = port;
            }
        }

        if let Some(value) = lookup(POOL_SIZE_ENV_VAR) {
            let size = parse_number::<usize>(POOL_SIZE_ENV_VAR, &value)?;
            if size == 0 {
                return Err(AdapterError::InvalidConfig(format!(
                    "{POOL_SIZE_ENV_VAR} must be at least 1"
                )));
            }
            config.pool.size = size;
        }

        if let Some(value) = lookup(SESSION_TTL_ENV_VAR) {
            config.pool.session_ttl = voter_lookup::config::parse_seconds(SESSION_TTL_ENV_VAR, &value)
                .map_err(|e| AdapterError::InvalidConfig(e.to_string()))?;
        }

        if let Some(value) = lookup(HEADLESS_ENV_VAR) {
            config.browser.headless = parse_bool(HEADLESS_ENV_VAR, &value)?;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AdapterError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| AdapterError::InvalidConfig(format!("{name}={value:?}: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, AdapterError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AdapterError::InvalidConfig(format!(
            "{name}={value:?}: expected true or false"
        ))),
    }
}

/// Result of probing the WebDriver environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitReport {
    /// Resolved chromedriver path, when a local driver is used.
    pub driver_path: Option<PathBuf>,
    /// Version string reported by `chromedriver --version`.
    pub version: Option<String>,
    /// Remote WebDriver URL, when one is configured.
    pub remote_url: Option<String>,
    /// Whether the remote server reported itself ready.
    pub remote_ready: Option<bool>,
    /// Status message from the remote server.
    pub remote_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.pool, PoolConfig::default());
        assert_eq!(config.form.inquiry_url, DEFAULT_INQUIRY_URL);
        assert!(config.browser.headless);
        assert!(matches!(
            config.driver,
            DriverEndpoint::Spawn { port: DEFAULT_DRIVER_PORT, binary: None, .. }
        ));
    }

    #[test]
    fn test_remote_driver_wins_over_port() {
        let config = AdapterConfig::from_lookup(vars(&[
            (WEBDRIVER_URL_ENV_VAR, "http://selenium:4444/wd/hub"),
            (DRIVER_PORT_ENV_VAR, "9999"),
        ]))
        .unwrap();
        assert_eq!(
            config.driver,
            DriverEndpoint::Remote("http://selenium:4444/wd/hub".to_string())
        );
        assert!(!config.browser.isolated_profile);
    }

    #[test]
    fn test_overrides() {
        let config = AdapterConfig::from_lookup(vars(&[
            (DRIVER_PORT_ENV_VAR, "9600"),
            (POOL_SIZE_ENV_VAR, "5"),
            (SESSION_TTL_ENV_VAR, "120"),
            (HEADLESS_ENV_VAR, "off"),
        ]))
        .unwrap();
        assert!(matches!(config.driver, DriverEndpoint::Spawn { port: 9600, .. }));
        assert_eq!(config.pool.size, 5);
        assert_eq!(config.pool.session_ttl, Duration::from_secs(120));
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(AdapterConfig::from_lookup(vars(&[(POOL_SIZE_ENV_VAR, "0")])).is_err());
        assert!(AdapterConfig::from_lookup(vars(&[(DRIVER_PORT_ENV_VAR, "99999")])).is_err());
        assert!(AdapterConfig::from_lookup(vars(&[(HEADLESS_ENV_VAR, "maybe")])).is_err());
    }
}
