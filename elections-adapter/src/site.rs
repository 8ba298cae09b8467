//! The inquiry form driven through a pooled browser session.

use crate::discovery::discover_chromedriver;
use crate::error::AdapterError;
use crate::page::{interpret, RESULT_MARKERS};
use crate::pool::SessionPool;
use crate::process::ChromeDriverProcess;
use crate::types::{AdapterConfig, DriverEndpoint, FormConfig};
use crate::webdriver::{BrowserSession, WebDriverClient};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use voter_lookup::{AttemptOutcome, Identifier, PageInteraction};

/// The form lives inside this iframe.
pub const IFRAME_SELECTOR: &str = "#ocv_iframe_id";
/// National ID text input.
pub const NATIONAL_ID_SELECTOR: &str = "#nid";
/// Submit button.
pub const SUBMIT_SELECTOR: &str = "#submit_btn";

/// Slack added to the browser's page-load timeout for HTTP requests to the driver.
const REQUEST_SLACK: Duration = Duration::from_secs(15);

/// Why a single pass through the form failed. The display text becomes the
/// transient reason recorded by the retry loop.
#[derive(Debug, Error)]
enum FormError {
    #[error("No browser session available: {0}")]
    Session(#[source] AdapterError),

    #[error("Navigation error: {0}")]
    Navigation(#[source] AdapterError),

    #[error("Could not find iframe - page structure may have changed")]
    Iframe(#[source] AdapterError),

    #[error("Could not find national ID input field")]
    Input(#[source] AdapterError),

    #[error("Could not find submit button")]
    Submit(#[source] AdapterError),

    #[error("Failed to read page content: {0}")]
    Read(#[source] AdapterError),
}

impl FormError {
    const fn cause(&self) -> &AdapterError {
        match self {
            Self::Session(e)
            | Self::Navigation(e)
            | Self::Iframe(e)
            | Self::Input(e)
            | Self::Submit(e)
            | Self::Read(e) => e,
        }
    }
}

/// [`PageInteraction`] backed by a real browser.
pub struct ElectionsSite {
    pool: SessionPool,
    form: FormConfig,
    driver: Mutex<Option<ChromeDriverProcess>>,
}

impl std::fmt::Debug for ElectionsSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElectionsSite")
            .field("pool", &self.pool)
            .field("inquiry_url", &self.form.inquiry_url)
            .finish_non_exhaustive()
    }
}

impl ElectionsSite {
    /// Starts (or connects to) the WebDriver server and prepares the pool.
    ///
    /// No browser is opened until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError` for an invalid inquiry URL, a missing
    /// chromedriver, or a driver that fails to start.
    pub async fn connect(config: AdapterConfig) -> Result<Self, AdapterError> {
        reqwest::Url::parse(&config.form.inquiry_url)
            .map_err(|e| AdapterError::InvalidUrl(format!("{}: {e}", config.form.inquiry_url)))?;

        let (url, driver) = match &config.driver {
            DriverEndpoint::Spawn {
                binary,
                port,
                startup_timeout,
            } => {
                let path = discover_chromedriver(binary.clone())?;
                let process = ChromeDriverProcess::spawn(&path, *port, *startup_timeout).await?;
                (process.url().to_string(), Some(process))
            }
            DriverEndpoint::Remote(url) => (url.clone(), None),
        };

        let client = WebDriverClient::new(&url, config.browser.page_load_timeout + REQUEST_SLACK)?;
        tracing::info!(server = client.base_url(), pool_size = config.pool.size, "elections site ready");

        let pool = SessionPool::new(client, config.browser, config.pool);
        Ok(Self {
            pool,
            form: config.form,
            driver: Mutex::new(driver),
        })
    }

    /// Wraps an existing pool, for callers that manage the driver themselves.
    #[must_use]
    pub fn with_pool(pool: SessionPool, form: FormConfig) -> Self {
        Self {
            pool,
            form,
            driver: Mutex::new(None),
        }
    }

    /// The underlying session pool.
    #[must_use]
    pub const fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Closes all browsers and stops a spawned chromedriver.
    ///
    /// # Errors
    ///
    /// Returns an error if the chromedriver process cannot be stopped.
    pub async fn shutdown(&self) -> Result<(), AdapterError> {
        self.pool.shutdown().await;
        if let Some(process) = self.driver.lock().await.take() {
            process.shutdown().await?;
        }
        Ok(())
    }

    async fn submit(&self, id: &Identifier) -> Result<String, FormError> {
        let mut lease = self.pool.acquire().await.map_err(FormError::Session)?;
        // Stays set while commands are in flight, so a lease dropped by the
        // attempt deadline takes its possibly hung session with it.
        lease.mark_broken();

        let result = self.fill_form(&lease, id).await;

        let mut healthy = true;
        if let Err(e) = &result {
            tracing::warn!(session = lease.id(), error = %e, cause = %e.cause(), "form step failed");
            healthy = !e.cause().is_session_fatal();
        }
        if healthy {
            if let Err(e) = lease.switch_to_top().await {
                healthy = !e.is_session_fatal();
            }
        }
        if healthy {
            lease.mark_healthy();
        }

        result
    }

    async fn fill_form(&self, session: &BrowserSession, id: &Identifier) -> Result<String, FormError> {
        let form = &self.form;

        session
            .navigate(&form.inquiry_url)
            .await
            .map_err(FormError::Navigation)?;
        tokio::time::sleep(form.settle_delay).await;

        let frame = session
            .wait_for(IFRAME_SELECTOR, form.element_timeout, form.poll_interval)
            .await
            .map_err(FormError::Iframe)?;
        session.switch_to_frame(&frame).await.map_err(FormError::Iframe)?;

        let input = session
            .wait_for(NATIONAL_ID_SELECTOR, form.element_timeout, form.poll_interval)
            .await
            .map_err(FormError::Input)?;
        session.clear(&input).await.map_err(FormError::Input)?;
        session
            .send_keys(&input, id.as_str())
            .await
            .map_err(FormError::Input)?;

        let button = session
            .wait_until_clickable(SUBMIT_SELECTOR, form.element_timeout, form.poll_interval)
            .await
            .map_err(FormError::Submit)?;
        session.click(&button).await.map_err(FormError::Submit)?;

        tokio::time::sleep(form.result_delay).await;

        session
            .wait_for_text(RESULT_MARKERS, form.element_timeout, form.poll_interval)
            .await
            .map_err(FormError::Read)
    }
}

#[async_trait]
impl PageInteraction for ElectionsSite {
    async fn attempt_lookup(&self, id: &Identifier) -> AttemptOutcome {
        match self.submit(id).await {
            Ok(body) => interpret(&body),
            Err(e) => AttemptOutcome::transient(e.to_string()),
        }
    }
}
