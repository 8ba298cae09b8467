//! End-to-end tests against the live inquiry page.
//!
//! These tests require chromedriver, a Chrome/Chromium install and network
//! access to the electoral commission's site. They are marked `#[ignore]`.
//!
//! ## Running E2E Tests
//!
//! ```bash
//! cargo test -p elections-adapter --test e2e -- --ignored
//!
//! # Use an existing WebDriver server instead of spawning chromedriver
//! ELECTIONS_WEBDRIVER_URL=http://localhost:4444 cargo test -p elections-adapter --test e2e -- --ignored
//! ```
//!
//! Set `VOTER_E2E_NATIONAL_ID` to a real national ID to exercise the
//! registered path; the default ID only checks that the site answers.

use std::sync::Arc;

use elections_adapter::{init, AdapterConfig, ElectionsSite};
use voter_lookup::prelude::*;

async fn connect() -> Option<ElectionsSite> {
    let config = AdapterConfig::from_env().ok()?;
    match init(&config).await {
        Ok(report) if report.remote_ready != Some(false) => {}
        Ok(report) => {
            eprintln!("Skipping: WebDriver not ready: {report:?}");
            return None;
        }
        Err(e) => {
            eprintln!("Skipping: {e}");
            return None;
        }
    }
    ElectionsSite::connect(config).await.ok()
}

#[tokio::test]
#[ignore = "Requires chromedriver and network access"]
async fn e2e_site_answers_definitively() {
    let Some(site) = connect().await else {
        return;
    };
    let site = Arc::new(site);
    let service = VoterLookup::new(RetryingLookupOrchestrator::new(), site.clone());

    let national_id =
        std::env::var("VOTER_E2E_NATIONAL_ID").unwrap_or_else(|_| "29710260300314".to_string());
    let result = service.lookup(&national_id).await.expect("valid id");

    site.shutdown().await.expect("driver shutdown");

    assert!(
        result.is_success(),
        "expected a definitive answer from the live site, got {result:?}"
    );
}

#[tokio::test]
#[ignore = "Requires chromedriver and network access"]
async fn e2e_invalid_id_never_opens_a_browser() {
    let Some(site) = connect().await else {
        return;
    };
    let site = Arc::new(site);
    let service = VoterLookup::new(RetryingLookupOrchestrator::new(), site.clone());

    let err = service.lookup("123").await.expect_err("too short");

    assert_eq!(err.input, "123");
    assert_eq!(site.pool().idle_count(), 0);
    site.shutdown().await.expect("driver shutdown");
}
