//! Teardown that never hides a finished result.

use std::fmt::Display;
use std::future::Future;

/// Runs `shutdown` after `output` has been produced and returns `output`
/// unchanged. A failed shutdown is logged at `warn`.
pub async fn shutdown_after<T, E, F>(output: T, shutdown: F) -> T
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    if let Err(e) = shutdown.await {
        tracing::warn!(error = %e, "failed to shut down browser driver");
    }
    output
}
