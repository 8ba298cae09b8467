//! Shared data types for lookup answers and per-attempt outcomes.

use serde::{Deserialize, Serialize};

/// Upstream notice shown when the person is younger than voting age.
pub const UNDERAGE_NOTICE: &str = "عفوا, غير مسموح لإقل من 18 سنة بالإنتخاب";

/// Upstream notice shown when the national ID is not in the voter roll.
pub const NOT_REGISTERED_NOTICE: &str = "الرقم القومي غير مدرج بقاعدة بيانات الناخبين";

/// Message reported for voters registered outside the target districts.
pub const OUT_OF_DISTRICT_NOTICE: &str = "الناخب مسجل في دائرة خارج النطاق المستهدف";

/// Definitive registration status reported by the upstream site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    /// Registered in one of the target districts.
    Registered,
    /// Registered, but in a district outside the allow-list.
    OutOfDistrict,
    /// Not present in the voter roll.
    NotRegistered,
    /// Below voting age.
    Underage,
}

impl LookupStatus {
    /// Stable snake_case code, also used as the `reason` field in responses.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::OutOfDistrict => "out_of_district",
            Self::NotRegistered => "not_registered",
            Self::Underage => "underage",
        }
    }

    /// Whether this status comes with a [`RegistrationRecord`].
    #[must_use]
    pub const fn has_record(self) -> bool {
        matches!(self, Self::Registered | Self::OutOfDistrict)
    }
}

impl std::fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Polling-station details for a registered voter.
///
/// Every field is free text copied from the upstream page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Electoral center name.
    pub electoral_center: String,
    /// District (police section) name.
    pub district: String,
    /// Electoral center address.
    pub address: String,
    /// Subcommittee number.
    pub subcommittee_number: String,
    /// Position in the electoral list.
    pub electoral_list_number: String,
}

/// Result of a single attempt against the upstream site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The site answered conclusively; never retried.
    Definitive {
        /// Status as read from the page.
        status: LookupStatus,
        /// Registration details, when the page carried them.
        record: Option<RegistrationRecord>,
    },
    /// Infrastructure failure (network, timeout, page did not render).
    Transient {
        /// Why the attempt failed.
        reason: String,
    },
}

impl AttemptOutcome {
    /// Shorthand for a definitive outcome without a record.
    #[must_use]
    pub const fn answer(status: LookupStatus) -> Self {
        Self::Definitive {
            status,
            record: None,
        }
    }

    /// Shorthand for a definitive outcome carrying a record.
    #[must_use]
    pub const fn registered(record: RegistrationRecord) -> Self {
        Self::Definitive {
            status: LookupStatus::Registered,
            record: Some(record),
        }
    }

    /// Shorthand for a transient failure.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }

    /// Returns `true` for [`AttemptOutcome::Transient`].
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}
