//! Locates the chromedriver binary on the host system.

use crate::error::AdapterError;
use std::path::PathBuf;
use which::which;

/// Environment variable that overrides the default chromedriver path.
pub const CHROMEDRIVER_BIN_ENV_VAR: &str = "ELECTIONS_CHROMEDRIVER_BIN";

/// Locates the chromedriver executable.
///
/// Resolution order:
/// 1. `explicit_path` if provided and the file exists.
/// 2. The path in the `ELECTIONS_CHROMEDRIVER_BIN` environment variable.
/// 3. `chromedriver` resolved via `$PATH`.
/// 4. Common install location fallbacks (platform-specific).
/// 5. Helpful error with install instructions.
///
/// # Errors
///
/// Returns `AdapterError::ExecutableNotFound` when no valid executable can be
/// located.
pub fn discover_chromedriver(explicit_path: Option<PathBuf>) -> Result<PathBuf, AdapterError> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Ok(path);
        }
        return Err(AdapterError::ExecutableNotFound(format!(
            "Explicit path does not exist: {}",
            path.display()
        )));
    }

    if let Ok(path_str) = std::env::var(CHROMEDRIVER_BIN_ENV_VAR) {
        let path = PathBuf::from(path_str);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            path = %path.display(),
            "{CHROMEDRIVER_BIN_ENV_VAR} points to a missing file, falling back to PATH"
        );
    }

    if let Ok(path) = which("chromedriver") {
        return Ok(path);
    }

    if let Some(location) = fallback_locations().into_iter().find(|p| p.exists()) {
        return Ok(location);
    }

    Err(AdapterError::ExecutableNotFound(
        "chromedriver not found. Install it from https://googlechromelabs.github.io/chrome-for-testing/ \
         or your package manager (e.g. apt install chromium-driver).\n\
         Searched: PATH, common install locations."
            .to_string(),
    ))
}

#[cfg(unix)]
fn fallback_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(home) = dirs::home_dir() {
        locations.push(home.join(".local/bin/chromedriver"));
    }
    if let Some(cache) = dirs::cache_dir() {
        locations.push(cache.join("selenium/chromedriver/chromedriver"));
    }
    locations.push(PathBuf::from("/usr/local/bin/chromedriver"));
    locations.push(PathBuf::from("/usr/bin/chromedriver"));
    locations.push(PathBuf::from("/usr/lib/chromium/chromedriver"));
    locations.push(PathBuf::from("/snap/bin/chromium.chromedriver"));
    locations
}

#[cfg(windows)]
fn fallback_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(cache) = dirs::cache_dir() {
        locations.push(cache.join("selenium/chromedriver/chromedriver.exe"));
    }
    locations.push(PathBuf::from(r"C:\Program Files\chromedriver\chromedriver.exe"));
    locations
}
