//! Retry and classification core for voter-registration lookups.
//!
//! A raw national ID is checked by [`validate`], then handed to a
//! [`RetryingLookupOrchestrator`] that calls a [`PageInteraction`]
//! collaborator until the upstream site answers definitively or the attempt
//! budget runs out:
//!
//! - [`validate`] - Structural check of the 14-digit national ID
//! - [`RetryingLookupOrchestrator`] - Async retry loop with exponential backoff
//! - [`DistrictAllowList`] - Maps a registration record to `Registered` / `OutOfDistrict`
//! - [`LookupResult`] - Definitive answer or exhausted retries, with metrics
//! - [`LookupResponse`] - Normalized JSON envelope
//! - [`VoterLookup`] - Validation and orchestration behind one call

/// Retry policy, district allow-list and environment loading.
pub mod config;
/// Validation and configuration errors.
pub mod error;
/// Structural validation of national IDs.
pub mod identifier;
/// The collaborator trait.
pub mod interaction;
/// Per-lookup metrics.
pub mod metrics;
/// The retry loop.
pub mod orchestrator;
/// JSON response envelopes.
pub mod response;
/// High-level client.
pub mod service;
/// Statuses, records and attempt outcomes.
pub mod types;

pub use config::{DistrictAllowList, LookupConfig, RetryPolicy, DEFAULT_TARGET_DISTRICTS};
pub use error::{ConfigError, ValidationError, NATIONAL_ID_FIELD};
pub use identifier::{validate, Identifier, NATIONAL_ID_LEN};
pub use interaction::PageInteraction;
pub use metrics::LookupMetrics;
pub use orchestrator::{AttemptRecord, LookupResult, RetryingLookupOrchestrator};
pub use response::LookupResponse;
pub use service::VoterLookup;
pub use types::*;

/// Common imports for callers wiring a collaborator into the core.
pub mod prelude {
    pub use crate::{
        validate, AttemptOutcome, DistrictAllowList, Identifier, LookupConfig, LookupResponse,
        LookupResult, LookupStatus, PageInteraction, RegistrationRecord, RetryPolicy,
        RetryingLookupOrchestrator, VoterLookup,
    };
}
