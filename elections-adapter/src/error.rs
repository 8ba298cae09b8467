use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("chromedriver executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Failed to spawn chromedriver at {stage}: {source}")]
    SpawnFailed {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chromedriver did not become ready within {0:?}")]
    DriverNotReady(Duration),

    #[error("Failed to send signal {signal} to PID {pid}: {reason}")]
    SignalFailed {
        signal: String,
        pid: u32,
        reason: String,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid WebDriver URL: {0}")]
    InvalidUrl(String),

    #[error("WebDriver error '{error}': {message}")]
    WebDriver { error: String, message: String },

    #[error("Unexpected WebDriver response: {0}")]
    MalformedResponse(String),

    #[error("Element '{selector}' not found after {waited:?}")]
    ElementNotFound { selector: String, waited: Duration },

    #[error("No browser session available after waiting {0:?}")]
    PoolExhausted(Duration),

    #[error("Session pool is shut down")]
    PoolClosed,

    #[error("Failed to create browser profile directory: {0}")]
    Profile(#[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AdapterError {
    /// Whether the browser session that produced this error should be discarded.
    #[must_use]
    pub fn is_session_fatal(&self) -> bool {
        match self {
            Self::Http(_) | Self::MalformedResponse(_) => true,
            Self::WebDriver { error, .. } => matches!(
                error.as_str(),
                "invalid session id" | "session not created" | "unknown error"
            ),
            _ => false,
        }
    }

    /// WebDriver "no such element" / "stale element reference" answers.
    #[must_use]
    pub fn is_missing_element(&self) -> bool {
        matches!(
            self,
            Self::WebDriver { error, .. }
                if error == "no such element" || error == "stale element reference"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_error(error: &str) -> AdapterError {
        AdapterError::WebDriver {
            error: error.to_string(),
            message: String::new(),
        }
    }

    #[test]
    fn test_missing_element_answers() {
        assert!(driver_error("no such element").is_missing_element());
        assert!(driver_error("stale element reference").is_missing_element());
        assert!(!driver_error("no such frame").is_missing_element());
        assert!(!AdapterError::PoolClosed.is_missing_element());
    }

    #[test]
    fn test_session_fatal_answers() {
        assert!(driver_error("invalid session id").is_session_fatal());
        assert!(AdapterError::MalformedResponse("{}".to_string()).is_session_fatal());
        assert!(!driver_error("no such element").is_session_fatal());
        assert!(!AdapterError::PoolExhausted(Duration::from_secs(1)).is_session_fatal());
    }
}
