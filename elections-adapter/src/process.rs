//! Lifecycle of a locally spawned chromedriver.

use crate::error::AdapterError;
use crate::webdriver::WebDriverClient;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};

const GRACE_PERIOD: Duration = Duration::from_secs(5);
const READY_POLL: Duration = Duration::from_millis(200);

/// A chromedriver child process owned by this program.
///
/// The child is killed if this value is dropped without [`Self::shutdown`].
#[derive(Debug)]
pub struct ChromeDriverProcess {
    child: Child,
    pid: u32,
    path: PathBuf,
    url: String,
    log_tasks: JoinSet<()>,
}

impl ChromeDriverProcess {
    /// Starts chromedriver on `127.0.0.1:port` and waits until `/status`
    /// reports ready.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::SpawnFailed` if the binary cannot be started and
    /// `AdapterError::DriverNotReady` if it does not come up in time.
    pub async fn spawn(
        path: &Path,
        port: u16,
        startup_timeout: Duration,
    ) -> Result<Self, AdapterError> {
        let mut child = Command::new(path)
            .arg(format!("--port={port}"))
            .arg("--allowed-ips=127.0.0.1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AdapterError::SpawnFailed {
                stage: "spawn".to_string(),
                source: e,
            })?;

        let pid = child.id().ok_or_else(|| AdapterError::SpawnFailed {
            stage: "pid".to_string(),
            source: std::io::Error::other("chromedriver exited immediately"),
        })?;

        let mut log_tasks = JoinSet::new();
        if let Some(stdout) = child.stdout.take() {
            log_tasks.spawn(forward_lines(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            log_tasks.spawn(forward_lines(stderr, "stderr"));
        }

        let mut process = Self {
            child,
            pid,
            path: path.to_path_buf(),
            url: format!("http://127.0.0.1:{port}/"),
            log_tasks,
        };

        if let Err(e) = process.wait_ready(startup_timeout).await {
            if let Err(cleanup) = process.shutdown().await {
                tracing::debug!(pid, error = %cleanup, "cleanup after failed start also failed");
            }
            return Err(e);
        }

        tracing::info!(pid, port, path = %process.path.display(), "chromedriver ready");
        Ok(process)
    }

    /// Base URL of the driver's HTTP endpoint.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Process id of the child.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait_ready(&mut self, startup_timeout: Duration) -> Result<(), AdapterError> {
        let client = WebDriverClient::new(&self.url, READY_POLL * 5)?;
        let deadline = Instant::now() + startup_timeout;

        loop {
            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(AdapterError::SpawnFailed {
                    stage: "startup".to_string(),
                    source: std::io::Error::other(format!("chromedriver exited with {status}")),
                });
            }
            match client.status().await {
                Ok(status) if status.ready => return Ok(()),
                Ok(status) => tracing::trace!(message = %status.message, "chromedriver not ready"),
                Err(e) => tracing::trace!(error = %e, "chromedriver not answering yet"),
            }
            if Instant::now() >= deadline {
                return Err(AdapterError::DriverNotReady(startup_timeout));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    /// Stops the driver: `SIGTERM`, wait the grace period, then `SIGKILL`.
    ///
    /// # Errors
    ///
    /// Returns an error if signalling or reaping the child fails.
    pub async fn shutdown(mut self) -> Result<(), AdapterError> {
        let result = graceful_shutdown(&mut self.child, self.pid).await;
        self.log_tasks.abort_all();
        if result.is_ok() {
            tracing::info!(pid = self.pid, "chromedriver stopped");
        }
        result
    }
}

async fn forward_lines(stream: impl tokio::io::AsyncRead + Unpin, stage: &'static str) {
    let mut reader = BufReader::new(stream).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        tracing::debug!(target: "chromedriver", stream = stage, "{line}");
    }
}

#[cfg(unix)]
async fn graceful_shutdown(child: &mut Child, pid: u32) -> Result<(), AdapterError> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    if let Ok(Some(_)) = child.try_wait() {
        return Ok(());
    }

    let raw_pid = i32::try_from(pid).map_err(|_| AdapterError::SignalFailed {
        signal: "SIGTERM".to_string(),
        pid,
        reason: "PID value exceeds i32::MAX".to_string(),
    })?;

    signal::kill(Pid::from_raw(raw_pid), Signal::SIGTERM).map_err(|e| {
        AdapterError::SignalFailed {
            signal: "SIGTERM".to_string(),
            pid,
            reason: e.to_string(),
        }
    })?;

    match timeout(GRACE_PERIOD, child.wait()).await {
        Ok(Ok(_status)) => Ok(()),
        Ok(Err(e)) => Err(AdapterError::SpawnFailed {
            stage: "graceful_shutdown wait".to_string(),
            source: e,
        }),
        Err(_) => {
            child.kill().await.map_err(|e| AdapterError::SpawnFailed {
                stage: "SIGKILL".to_string(),
                source: e,
            })?;
            child.wait().await.map_err(|e| AdapterError::SpawnFailed {
                stage: "post-SIGKILL wait".to_string(),
                source: e,
            })?;
            Ok(())
        }
    }
}

/// Windows: immediate termination, no graceful shutdown for console processes.
#[cfg(windows)]
async fn graceful_shutdown(child: &mut Child, _pid: u32) -> Result<(), AdapterError> {
    child.kill().await.map_err(|e| AdapterError::SpawnFailed {
        stage: "TerminateProcess".to_string(),
        source: e,
    })?;
    child.wait().await.map_err(|e| AdapterError::SpawnFailed {
        stage: "post-kill wait".to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_missing_binary_fails() {
        let err = ChromeDriverProcess::spawn(
            Path::new("/nonexistent/chromedriver"),
            9,
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AdapterError::SpawnFailed { ref stage, .. } if stage == "spawn"));
    }

    #[tokio::test]
    async fn test_process_that_exits_is_reported() {
        // `true` ignores its arguments and exits at once.
        let Ok(path) = which::which("true") else {
            return;
        };
        let err = ChromeDriverProcess::spawn(&path, 1, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AdapterError::SpawnFailed { .. } | AdapterError::DriverNotReady(_)),
            "unexpected error: {err}"
        );
    }
}
