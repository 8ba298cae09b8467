//! Configuration for retry behavior and district classification.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{LookupStatus, RegistrationRecord};

/// Environment variable overriding [`RetryPolicy::max_attempts`].
pub const MAX_ATTEMPTS_ENV_VAR: &str = "VOTER_MAX_ATTEMPTS";
/// Environment variable overriding [`RetryPolicy::base_delay`], in seconds.
pub const BASE_DELAY_ENV_VAR: &str = "VOTER_BASE_DELAY_SECS";
/// Environment variable overriding [`RetryPolicy::attempt_timeout`], in seconds (`0` disables).
pub const ATTEMPT_TIMEOUT_ENV_VAR: &str = "VOTER_ATTEMPT_TIMEOUT_SECS";
/// Environment variable holding a comma-separated target-district allow-list.
pub const TARGET_DISTRICTS_ENV_VAR: &str = "VOTER_TARGET_DISTRICTS";

/// Districts targeted by the reference deployment.
pub const DEFAULT_TARGET_DISTRICTS: [&str; 5] = [
    "قسم الشرق",
    "قسم العرب",
    "قسم الضواحى",
    "قسم أول بورفؤاد",
    "قسم ثان بورفؤاد",
];

/// Bounded retry schedule with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up (default: 3, never below 1).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt (default: 2s).
    pub base_delay: Duration,
    /// Deadline applied to each collaborator call (default: 60s).
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            attempt_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryPolicy {
    /// Set the maximum number of attempts. Zero is raised to one.
    #[must_use]
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Set the backoff base delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set or clear the per-attempt deadline.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delay to wait before running `attempt` (1-indexed).
    ///
    /// Attempt 1 runs immediately; attempt `k > 1` waits
    /// `base_delay * 2^(k-2)`. Saturates instead of overflowing.
    ///
    /// ```
    /// use std::time::Duration;
    /// use voter_lookup::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_before(1), Duration::ZERO);
    /// assert_eq!(policy.delay_before(2), Duration::from_secs(2));
    /// assert_eq!(policy.delay_before(3), Duration::from_secs(4));
    /// ```
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        2u32.checked_pow(attempt - 2)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Sum of all delays incurred when every attempt is used.
    #[must_use]
    pub fn worst_case_delay(&self) -> Duration {
        (1..=self.max_attempts)
            .map(|attempt| self.delay_before(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Set of district names that qualify a record as [`LookupStatus::Registered`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictAllowList {
    districts: BTreeSet<String>,
}

impl Default for DistrictAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_DISTRICTS)
    }
}

impl DistrictAllowList {
    /// Builds an allow-list from district names. Entries are trimmed and blanks dropped.
    pub fn new<I, S>(districts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let districts = districts
            .into_iter()
            .map(|d| d.as_ref().trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        Self { districts }
    }

    /// Returns `true` when `district` exactly matches an entry.
    #[must_use]
    pub fn contains(&self, district: &str) -> bool {
        self.districts.contains(district)
    }

    /// Number of configured districts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.len()
    }

    /// Returns `true` when no district is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Iterates over the configured districts in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.districts.iter().map(String::as_str)
    }

    /// Classifies a definitive answer.
    ///
    /// A registration with a non-empty district is `Registered` when the
    /// district is on the list and `OutOfDistrict` otherwise. `Underage` and
    /// `NotRegistered` are returned unchanged, whatever record came with them.
    #[must_use]
    pub fn classify(
        &self,
        status: LookupStatus,
        record: Option<&RegistrationRecord>,
    ) -> LookupStatus {
        if !status.has_record() {
            return status;
        }
        match record {
            Some(r) if !r.district.is_empty() => {
                if self.contains(&r.district) {
                    LookupStatus::Registered
                } else {
                    LookupStatus::OutOfDistrict
                }
            }
            _ => status,
        }
    }
}

/// Complete configuration for the lookup core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupConfig {
    /// Retry schedule.
    pub retry: RetryPolicy,
    /// Target districts.
    pub districts: DistrictAllowList,
}

impl LookupConfig {
    /// Reads configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its value.
    ///
    /// Kept separate from [`LookupConfig::from_env`] so callers and tests can
    /// supply variables without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut retry = RetryPolicy::default();

        if let Some(value) = lookup(MAX_ATTEMPTS_ENV_VAR) {
            let max = value
                .trim()
                .parse::<u32>()
                .map_err(|e| invalid(MAX_ATTEMPTS_ENV_VAR, &value, &e.to_string()))?;
            retry = retry.with_max_attempts(max);
        }

        if let Some(value) = lookup(BASE_DELAY_ENV_VAR) {
            retry = retry.with_base_delay(parse_seconds(BASE_DELAY_ENV_VAR, &value)?);
        }

        if let Some(value) = lookup(ATTEMPT_TIMEOUT_ENV_VAR) {
            let timeout = parse_seconds(ATTEMPT_TIMEOUT_ENV_VAR, &value)?;
            retry = retry.with_attempt_timeout((!timeout.is_zero()).then_some(timeout));
        }

        let districts = match lookup(TARGET_DISTRICTS_ENV_VAR) {
            Some(value) => {
                let list = DistrictAllowList::new(value.split(','));
                if list.is_empty() {
                    return Err(ConfigError::EmptyDistrictList);
                }
                list
            }
            None => DistrictAllowList::default(),
        };

        Ok(Self { retry, districts })
    }
}

/// Parses a non-negative, possibly fractional, number of seconds.
pub fn parse_seconds(name: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs = value
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(name, value, &e.to_string()))?;
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(name, value, &e.to_string()))
}

fn invalid(name: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn record(district: &str) -> RegistrationRecord {
        RegistrationRecord {
            district: district.to_string(),
            ..RegistrationRecord::default()
        }
    }

    #[test]
    fn test_backoff_schedule_doubles() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_millis(500));
        let delays: Vec<_> = (1..=5).map(|k| policy.delay_before(k)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::ZERO,
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ]
        );
    }

    #[test]
    fn test_attempt_zero_is_immediate() {
        assert_eq!(RetryPolicy::default().delay_before(0), Duration::ZERO);
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(200), Duration::MAX);
    }

    #[test]
    fn test_worst_case_delay_default_is_three_base_delays() {
        assert_eq!(
            RetryPolicy::default().worst_case_delay(),
            Duration::from_secs(6)
        );
    }

    #[test]
    fn test_max_attempts_never_zero() {
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn test_classify_target_district_is_registered() {
        let list = DistrictAllowList::default();
        let r = record("قسم الشرق");
        assert_eq!(
            list.classify(LookupStatus::Registered, Some(&r)),
            LookupStatus::Registered
        );
    }

    #[test]
    fn test_classify_other_district_is_out_of_district() {
        let list = DistrictAllowList::default();
        let r = record("قسم أسيوط");
        assert_eq!(
            list.classify(LookupStatus::Registered, Some(&r)),
            LookupStatus::OutOfDistrict
        );
    }

    #[test]
    fn test_classify_without_district_passes_status_through() {
        let list = DistrictAllowList::default();
        assert_eq!(
            list.classify(LookupStatus::Underage, None),
            LookupStatus::Underage
        );
        assert_eq!(
            list.classify(LookupStatus::Registered, Some(&record(""))),
            LookupStatus::Registered
        );
    }

    #[test]
    fn test_classify_keeps_non_registration_answers() {
        let list = DistrictAllowList::default();
        let r = record("قسم الشرق");
        assert_eq!(
            list.classify(LookupStatus::Underage, Some(&r)),
            LookupStatus::Underage
        );
        assert_eq!(
            list.classify(LookupStatus::NotRegistered, Some(&record("قسم أسيوط"))),
            LookupStatus::NotRegistered
        );
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = LookupConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, LookupConfig::default());
        assert_eq!(config.districts.len(), 5);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = LookupConfig::from_lookup(vars(&[
            (MAX_ATTEMPTS_ENV_VAR, "5"),
            (BASE_DELAY_ENV_VAR, "0.25"),
            (ATTEMPT_TIMEOUT_ENV_VAR, "0"),
            (TARGET_DISTRICTS_ENV_VAR, " قسم الشرق , قسم العرب ,"),
        ]))
        .unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.retry.attempt_timeout, None);
        assert_eq!(config.districts.len(), 2);
        assert!(config.districts.contains("قسم العرب"));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = LookupConfig::from_lookup(vars(&[(MAX_ATTEMPTS_ENV_VAR, "three")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == MAX_ATTEMPTS_ENV_VAR));

        let err = LookupConfig::from_lookup(vars(&[(BASE_DELAY_ENV_VAR, "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_lookup_rejects_empty_district_list() {
        let err = LookupConfig::from_lookup(vars(&[(TARGET_DISTRICTS_ENV_VAR, " , ")])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyDistrictList));
    }
}
