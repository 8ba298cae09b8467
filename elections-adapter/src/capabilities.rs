//! Chrome command-line and WebDriver capability construction.
//!
//! ## Switch Reference
//!
//! ### Container switches (always on)
//! - `--no-sandbox`, `--disable-dev-shm-usage`: Chrome inside Docker with a small `/dev/shm`
//! - `--disable-gpu`, `--disable-software-rasterizer`: no GPU in headless containers
//!
//! ### Footprint switches (always on)
//! - Background throttling, extensions, sync, default apps and component
//!   updates are disabled so each session starts quickly and stays small.
//! - `--blink-settings=imagesEnabled=false`: the inquiry result is text only
//!
//! ### Per-session switches
//! - `--headless=new`: only when [`BrowserConfig::headless`] is set
//! - `--user-data-dir=<dir>`: a fresh profile per session so pooled
//!   browsers never share a lock file
//! - `--user-agent=<ua>`: desktop Chrome user agent

use crate::types::BrowserConfig;
use serde_json::{json, Value};
use std::path::Path;

const BASE_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-features=TranslateUI",
    "--disable-ipc-flooding-protection",
    "--disable-blink-features=AutomationControlled",
    "--disable-extensions",
    "--disable-component-extensions-with-background-pages",
    "--disable-print-preview",
    "--no-first-run",
    "--disable-default-apps",
    "--disable-sync",
    "--hide-crash-restore-bubble",
    "--disable-background-networking",
    "--disable-client-side-phishing-detection",
    "--disable-component-update",
    "--blink-settings=imagesEnabled=false",
    "--window-size=1920,1080",
];

/// Builds the Chrome switches for one session.
#[must_use]
pub fn build_chrome_args(config: &BrowserConfig, profile_dir: Option<&Path>) -> Vec<String> {
    let mut args = Vec::with_capacity(BASE_ARGS.len() + 4 + config.extra_args.len());

    if config.headless {
        args.push("--headless=new".to_string());
    }

    args.extend(BASE_ARGS.iter().map(|s| (*s).to_string()));
    args.push(format!("--user-agent={}", config.user_agent));

    if let Some(dir) = profile_dir {
        args.push(format!("--user-data-dir={}", dir.display()));
    }

    args.extend(config.extra_args.iter().cloned());
    args
}

/// Builds the `capabilities` object for `POST /session`.
#[must_use]
pub fn build_capabilities(config: &BrowserConfig, profile_dir: Option<&Path>) -> Value {
    let mut chrome_options = json!({
        "args": build_chrome_args(config, profile_dir),
        "excludeSwitches": ["enable-automation"],
    });

    if let Some(binary) = &config.chrome_binary {
        chrome_options["binary"] = json!(binary.display().to_string());
    }

    let page_load_ms = u64::try_from(config.page_load_timeout.as_millis()).unwrap_or(u64::MAX);

    json!({
        "alwaysMatch": {
            "browserName": "chrome",
            "pageLoadStrategy": "normal",
            "timeouts": { "pageLoad": page_load_ms, "implicit": 0 },
            "goog:chromeOptions": chrome_options,
        }
    })
}
