//! Bounded pool of reusable browser sessions.
//!
//! Checkout is scoped: a [`SessionLease`] hands its session back when
//! dropped, unless it was marked broken, in which case the session is
//! deleted. Idle sessions older than the configured TTL are closed instead
//! of being reused.

use crate::capabilities::build_capabilities;
use crate::error::AdapterError;
use crate::types::{BrowserConfig, PoolConfig};
use crate::webdriver::{BrowserSession, WebDriverClient};
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

struct PoolInner {
    client: WebDriverClient,
    browser: BrowserConfig,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<BrowserSession>>,
}

impl PoolInner {
    fn take_idle(&self) -> Vec<BrowserSession> {
        std::mem::take(&mut *self.idle.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn pop_fresh(&self) -> Option<BrowserSession> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(session) = idle.pop() {
            if session.age() < self.config.session_ttl {
                return Some(session);
            }
            tracing::debug!(session = session.id(), age = ?session.age(), "retiring expired session");
            close_in_background(session);
        }
        None
    }

    fn give_back(&self, session: BrowserSession) {
        if self.permits.is_closed() {
            close_in_background(session);
            return;
        }
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(session);
    }
}

/// Pool of WebDriver sessions bounded by a semaphore.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("server", &self.inner.client.base_url())
            .field("size", &self.inner.config.size)
            .field("available", &self.inner.permits.available_permits())
            .field("idle", &self.idle_count())
            .finish()
    }
}

impl SessionPool {
    /// Creates an empty pool; sessions are opened lazily on checkout.
    #[must_use]
    pub fn new(client: WebDriverClient, browser: BrowserConfig, config: PoolConfig) -> Self {
        let size = config.size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                client,
                browser,
                config,
                permits: Arc::new(Semaphore::new(size)),
                idle: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Checks out a session, opening a new browser when no idle one is fresh.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::PoolExhausted` when no slot frees up within the
    /// acquire timeout, `AdapterError::PoolClosed` after [`Self::shutdown`],
    /// or the WebDriver error raised while creating a session.
    pub async fn acquire(&self) -> Result<SessionLease, AdapterError> {
        let wait = self.inner.config.acquire_timeout;
        let permit = tokio::time::timeout(wait, Arc::clone(&self.inner.permits).acquire_owned())
            .await
            .map_err(|_| AdapterError::PoolExhausted(wait))?
            .map_err(|_| AdapterError::PoolClosed)?;

        let session = match self.inner.pop_fresh() {
            Some(session) => {
                tracing::trace!(session = session.id(), "reusing idle session");
                session
            }
            None => self.open_session().await?,
        };

        Ok(SessionLease {
            session,
            pool: Arc::clone(&self.inner),
            broken: false,
            _permit: permit,
        })
    }

    async fn open_session(&self) -> Result<BrowserSession, AdapterError> {
        let profile = if self.inner.browser.isolated_profile {
            Some(
                tempfile::Builder::new()
                    .prefix("voter-chrome-")
                    .tempdir()
                    .map_err(AdapterError::Profile)?,
            )
        } else {
            None
        };
        let capabilities =
            build_capabilities(&self.inner.browser, profile.as_ref().map(tempfile::TempDir::path));
        let session = self.inner.client.new_session(capabilities, profile).await?;
        tracing::info!(session = session.id(), "opened browser session");
        Ok(session)
    }

    /// Number of sessions waiting for reuse.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Refuses further checkouts and closes every idle session.
    ///
    /// Sessions still leased are closed when their lease drops.
    pub async fn shutdown(&self) {
        self.inner.permits.close();
        for session in self.inner.take_idle() {
            let id = session.id().to_string();
            if let Err(e) = session.close().await {
                tracing::warn!(session = %id, error = %e, "failed to close session");
            }
        }
    }
}

/// Exclusive use of one pooled session.
pub struct SessionLease {
    session: BrowserSession,
    pool: Arc<PoolInner>,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl SessionLease {
    /// Deletes the session on drop instead of returning it to the pool.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Returns the session to the pool on drop. Undoes [`Self::mark_broken`].
    pub fn mark_healthy(&mut self) {
        self.broken = false;
    }

    /// Whether the session will be discarded on drop.
    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.broken
    }
}

impl Deref for SessionLease {
    type Target = BrowserSession;

    fn deref(&self) -> &BrowserSession {
        &self.session
    }
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease")
            .field("session", &self.session.id())
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let session = self.session.detach();
        if self.broken {
            tracing::info!(session = session.id(), "discarding broken session");
            close_in_background(session);
        } else {
            self.pool.give_back(session);
        }
    }
}

fn close_in_background(session: BrowserSession) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(session = session.id(), "no runtime to close session; browser left running");
        return;
    };
    handle.spawn(async move {
        let id = session.id().to_string();
        if let Err(e) = session.close().await {
            tracing::debug!(session = %id, error = %e, "background session close failed");
        }
    });
}
