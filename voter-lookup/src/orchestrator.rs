//! Bounded retry loop around a [`PageInteraction`] collaborator.

use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::{error, info, warn, Instrument};

use crate::config::{DistrictAllowList, LookupConfig, RetryPolicy};
use crate::identifier::Identifier;
use crate::interaction::PageInteraction;
use crate::metrics::LookupMetrics;
use crate::types::{AttemptOutcome, LookupStatus, RegistrationRecord};

/// Record of a single failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// The attempt number (1-indexed).
    pub attempt: u32,
    /// Why the attempt failed.
    pub reason: String,
    /// Elapsed time since the lookup started when the attempt finished.
    pub elapsed: Duration,
}

/// Final result of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// The site answered definitively.
    Success {
        /// Classified status.
        status: LookupStatus,
        /// Registration details for `Registered` and `OutOfDistrict`.
        record: Option<RegistrationRecord>,
        /// Attempt count and timing.
        metrics: LookupMetrics,
    },
    /// Every attempt failed transiently.
    Exhausted {
        /// Number of attempts made (equals the policy maximum).
        attempts_made: u32,
        /// Reason reported by the final attempt.
        last_reason: String,
        /// All failed attempts, oldest first.
        history: Vec<AttemptRecord>,
        /// Attempt count and timing.
        metrics: LookupMetrics,
    },
}

impl LookupResult {
    /// Returns `true` for [`LookupResult::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Classified status, if the lookup succeeded.
    #[must_use]
    pub const fn status(&self) -> Option<LookupStatus> {
        match self {
            Self::Success { status, .. } => Some(*status),
            Self::Exhausted { .. } => None,
        }
    }

    /// Metrics for either variant.
    #[must_use]
    pub const fn metrics(&self) -> &LookupMetrics {
        match self {
            Self::Success { metrics, .. } | Self::Exhausted { metrics, .. } => metrics,
        }
    }
}

/// Drives lookup attempts until a definitive answer or the attempt budget runs out.
///
/// The orchestrator holds only immutable configuration, so one instance can
/// serve any number of concurrent lookups.
#[derive(Debug, Clone, Default)]
pub struct RetryingLookupOrchestrator {
    policy: RetryPolicy,
    districts: DistrictAllowList,
}

impl RetryingLookupOrchestrator {
    /// Creates an orchestrator with the default policy and target districts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an orchestrator from a full configuration.
    #[must_use]
    pub fn with_config(config: LookupConfig) -> Self {
        Self {
            policy: config.retry,
            districts: config.districts,
        }
    }

    /// Replaces the retry policy (fluent builder pattern).
    #[must_use]
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the target-district allow-list (fluent builder pattern).
    #[must_use]
    pub fn districts(mut self, districts: DistrictAllowList) -> Self {
        self.districts = districts;
        self
    }

    /// The active retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs the retry loop for `id` against `page`.
    ///
    /// Definitive outcomes return immediately after district classification.
    /// Transient outcomes are recorded and retried after
    /// [`RetryPolicy::delay_before`]; once the budget is spent the result is
    /// [`LookupResult::Exhausted`] carrying the final reason.
    pub async fn lookup<P>(&self, id: &Identifier, page: &P) -> LookupResult
    where
        P: PageInteraction + ?Sized,
    {
        let start = Instant::now();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut history: Vec<AttemptRecord> = Vec::new();
        let mut backoff_time = Duration::ZERO;

        for attempt in 1..=max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                info!(national_id = %id, attempt, max_attempts, ?delay, "Retrying after backoff");
                sleep(delay).await;
                backoff_time = backoff_time.saturating_add(delay);
            }

            let span = tracing::info_span!("attempt", national_id = %id, attempt, max_attempts);
            let outcome = self.run_attempt(id, page).instrument(span).await;

            match outcome {
                AttemptOutcome::Definitive { status, record } => {
                    let status = self.districts.classify(status, record.as_ref());
                    let record = record.filter(|_| status.has_record());
                    info!(national_id = %id, attempt, %status, "Lookup answered");

                    return LookupResult::Success {
                        status,
                        record,
                        metrics: LookupMetrics {
                            total_attempts: attempt,
                            wall_time: start.elapsed(),
                            backoff_time,
                        },
                    };
                }
                AttemptOutcome::Transient { reason } => {
                    warn!(national_id = %id, attempt, max_attempts, %reason, "Attempt failed");
                    history.push(AttemptRecord {
                        attempt,
                        reason,
                        elapsed: start.elapsed(),
                    });
                }
            }
        }

        let last_reason = history
            .last()
            .map(|record| record.reason.clone())
            .unwrap_or_default();
        error!(national_id = %id, attempts = max_attempts, %last_reason, "Lookup failed after all attempts");

        LookupResult::Exhausted {
            attempts_made: max_attempts,
            last_reason,
            history,
            metrics: LookupMetrics {
                total_attempts: max_attempts,
                wall_time: start.elapsed(),
                backoff_time,
            },
        }
    }

    async fn run_attempt<P>(&self, id: &Identifier, page: &P) -> AttemptOutcome
    where
        P: PageInteraction + ?Sized,
    {
        match self.policy.attempt_timeout {
            Some(limit) => timeout(limit, page.attempt_lookup(id))
                .await
                .unwrap_or_else(|_| {
                    AttemptOutcome::transient(format!("attempt timed out after {limit:?}"))
                }),
            None => page.attempt_lookup(id).await,
        }
    }
}
