//! Environment probing for the `check` command.

use crate::discovery::discover_chromedriver;
use crate::error::AdapterError;
use crate::types::{AdapterConfig, DriverEndpoint, InitReport};
use crate::webdriver::WebDriverClient;
use std::time::Duration;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Locates the WebDriver the configuration points at and reports on it.
///
/// For a local driver this resolves the chromedriver binary and reads its
/// version. For a remote server it queries `/status`; an unreachable server
/// is reported, not raised.
///
/// # Errors
///
/// Returns `AdapterError` if chromedriver cannot be found or its version
/// command cannot be run.
pub async fn init(config: &AdapterConfig) -> Result<InitReport, AdapterError> {
    match &config.driver {
        DriverEndpoint::Spawn { binary, .. } => {
            let path = discover_chromedriver(binary.clone())?;

            let output = tokio::time::timeout(
                PROBE_TIMEOUT,
                Command::new(&path).arg("--version").output(),
            )
            .await
            .map_err(|_| AdapterError::SpawnFailed {
                stage: "--version".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "chromedriver --version did not return",
                ),
            })?
            .map_err(|e| AdapterError::SpawnFailed {
                stage: "--version".to_string(),
                source: e,
            })?;

            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();

            Ok(InitReport {
                driver_path: Some(path),
                version: Some(version).filter(|v| !v.is_empty()),
                remote_url: None,
                remote_ready: None,
                remote_message: None,
            })
        }
        DriverEndpoint::Remote(url) => {
            let client = WebDriverClient::new(url, PROBE_TIMEOUT)?;
            let (ready, message) = match client.status().await {
                Ok(status) => (status.ready, status.message),
                Err(e) => (false, e.to_string()),
            };

            Ok(InitReport {
                driver_path: None,
                version: None,
                remote_url: Some(client.base_url().to_string()),
                remote_ready: Some(ready),
                remote_message: Some(message),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_explicit_binary() {
        let config = AdapterConfig {
            driver: DriverEndpoint::Spawn {
                binary: Some(PathBuf::from("/nonexistent/chromedriver")),
                port: 9515,
                startup_timeout: Duration::from_secs(1),
            },
            ..AdapterConfig::default()
        };
        let err = init(&config).await.unwrap_err();
        assert!(matches!(err, AdapterError::ExecutableNotFound(_)));
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_reported() {
        let config = AdapterConfig {
            driver: DriverEndpoint::Remote("http://127.0.0.1:9/".to_string()),
            ..AdapterConfig::default()
        };
        let report = init(&config).await.unwrap();
        assert_eq!(report.remote_ready, Some(false));
        assert_eq!(report.remote_url.as_deref(), Some("http://127.0.0.1:9/"));
        assert!(report.driver_path.is_none());
    }
}
