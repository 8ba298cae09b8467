use thiserror::Error;

/// Errors surfaced by the `voter` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid retry or district configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] voter_lookup::ConfigError),

    /// Error from the elections adapter.
    #[error("Elections adapter error: {0}")]
    Adapter(#[from] elections_adapter::AdapterError),

    /// Failed to serialize a response.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Batch file handling error.
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}
