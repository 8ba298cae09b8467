//! WebDriver adapter for the electoral commission's inquiry page.
//!
//! This crate locates and runs chromedriver, keeps a bounded pool of Chrome
//! sessions, fills in the inquiry form and turns the rendered result into an
//! [`voter_lookup::AttemptOutcome`]. [`ElectionsSite`] is the
//! [`voter_lookup::PageInteraction`] handed to the retry loop.

/// Chrome switches and WebDriver capabilities.
pub mod capabilities;
/// Discovery and resolution of the chromedriver executable path.
pub mod discovery;
/// Error types returned by adapter operations.
pub mod error;
/// Probing of the configured WebDriver for diagnostics.
pub mod init;
/// Result page interpretation.
pub mod page;
/// Bounded pool of browser sessions.
pub mod pool;
/// Spawning and stopping chromedriver.
pub mod process;
/// The inquiry form flow.
pub mod site;
/// Shared data types for configuration and probe reports.
pub mod types;
/// W3C WebDriver HTTP client.
pub mod webdriver;

pub use discovery::{discover_chromedriver, CHROMEDRIVER_BIN_ENV_VAR};
pub use error::AdapterError;
pub use init::init;
pub use page::{interpret, to_ascii_digits};
pub use pool::{SessionLease, SessionPool};
pub use process::ChromeDriverProcess;
pub use site::ElectionsSite;
pub use types::*;
pub use webdriver::{BrowserSession, DriverStatus, WebDriverClient};
