//! Runtime settings: environment first, command-line flags on top.

use clap::Args;
use elections_adapter::{AdapterConfig, DriverEndpoint};
use std::path::PathBuf;
use std::time::Duration;
use voter_lookup::config::parse_seconds;
use voter_lookup::{DistrictAllowList, LookupConfig};

use crate::errors::CliError;

/// Flags shared by every subcommand. Each one overrides the matching
/// environment variable.
#[derive(Debug, Clone, Default, Args)]
pub struct RuntimeArgs {
    /// Attempts per lookup [env: VOTER_MAX_ATTEMPTS]
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Backoff base in seconds [env: VOTER_BASE_DELAY_SECS]
    #[arg(long, global = true, value_name = "SECS")]
    pub base_delay: Option<String>,

    /// Per-attempt deadline in seconds, 0 disables [env: VOTER_ATTEMPT_TIMEOUT_SECS]
    #[arg(long, global = true, value_name = "SECS")]
    pub attempt_timeout: Option<String>,

    /// Target district; repeat for several [env: VOTER_TARGET_DISTRICTS]
    #[arg(long = "district", global = true, value_name = "NAME")]
    pub districts: Vec<String>,

    /// Inquiry page URL [env: ELECTIONS_INQUIRY_URL]
    #[arg(long, global = true)]
    pub inquiry_url: Option<String>,

    /// Use an already running WebDriver server [env: ELECTIONS_WEBDRIVER_URL]
    #[arg(long, global = true, conflicts_with = "chromedriver")]
    pub webdriver_url: Option<String>,

    /// Path to chromedriver [env: ELECTIONS_CHROMEDRIVER_BIN]
    #[arg(long, global = true)]
    pub chromedriver: Option<PathBuf>,

    /// Port for the spawned chromedriver [env: ELECTIONS_DRIVER_PORT]
    #[arg(long, global = true)]
    pub driver_port: Option<u16>,

    /// Concurrent browser sessions [env: ELECTIONS_POOL_SIZE]
    #[arg(long, global = true)]
    pub pool_size: Option<usize>,

    /// Show the browser window [env: ELECTIONS_HEADLESS=false]
    #[arg(long, global = true)]
    pub headed: bool,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Retry loop and district allow-list.
    pub lookup: LookupConfig,
    /// Browser adapter.
    pub adapter: AdapterConfig,
}

impl Settings {
    /// Resolves settings from the process environment and `args`.
    ///
    /// # Errors
    ///
    /// Returns `CliError` when a variable or flag holds an invalid value.
    pub fn resolve(args: &RuntimeArgs) -> Result<Self, CliError> {
        Self::resolve_with(|name| std::env::var(name).ok(), args)
    }

    /// Resolves settings from `lookup` (variable name to value) and `args`.
    ///
    /// # Errors
    ///
    /// Returns `CliError` when a variable or flag holds an invalid value.
    pub fn resolve_with<F>(lookup: F, args: &RuntimeArgs) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut lookup_config = LookupConfig::from_lookup(&lookup)?;
        let mut adapter = AdapterConfig::from_lookup(&lookup)?;

        let mut retry = lookup_config.retry.clone();
        if let Some(max) = args.max_attempts {
            retry = retry.with_max_attempts(max);
        }
        if let Some(value) = &args.base_delay {
            retry = retry.with_base_delay(parse_seconds("--base-delay", value)?);
        }
        if let Some(value) = &args.attempt_timeout {
            let timeout = parse_seconds("--attempt-timeout", value)?;
            retry = retry.with_attempt_timeout((!timeout.is_zero()).then_some(timeout));
        }
        lookup_config.retry = retry;

        if !args.districts.is_empty() {
            let list = DistrictAllowList::new(&args.districts);
            if list.is_empty() {
                return Err(voter_lookup::ConfigError::EmptyDistrictList.into());
            }
            lookup_config.districts = list;
        }

        if let Some(url) = &args.inquiry_url {
            adapter.form.inquiry_url.clone_from(url);
        }

        if let Some(url) = &args.webdriver_url {
            adapter.driver = DriverEndpoint::Remote(url.clone());
            adapter.browser.isolated_profile = false;
        } else if args.chromedriver.is_some() || args.driver_port.is_some() {
            let (binary, port, startup_timeout) = match &adapter.driver {
                DriverEndpoint::Spawn {
                    binary,
                    port,
                    startup_timeout,
                } => (binary.clone(), *port, *startup_timeout),
                DriverEndpoint::Remote(_) => (
                    None,
                    elections_adapter::DEFAULT_DRIVER_PORT,
                    Duration::from_secs(20),
                ),
            };
            adapter.driver = DriverEndpoint::Spawn {
                binary: args.chromedriver.clone().or(binary),
                port: args.driver_port.unwrap_or(port),
                startup_timeout,
            };
            adapter.browser.isolated_profile = true;
        }

        if let Some(size) = args.pool_size {
            if size == 0 {
                return Err(elections_adapter::AdapterError::InvalidConfig(
                    "--pool-size must be at least 1".to_string(),
                )
                .into());
            }
            adapter.pool.size = size;
        }

        if args.headed {
            adapter.browser.headless = false;
        }

        Ok(Self {
            lookup: lookup_config,
            adapter,
        })
    }
}
