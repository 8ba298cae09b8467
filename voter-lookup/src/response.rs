//! Normalized JSON envelopes for lookup answers.
//!
//! Three shapes are kept apart: answers (`success: true`), exhausted retries
//! (`success: false` with `retries_exhausted`), and rejected input
//! (`success: false` with `field` and `input`).

use serde::Serialize;

use crate::error::ValidationError;
use crate::orchestrator::LookupResult;
use crate::types::{
    LookupStatus, RegistrationRecord, NOT_REGISTERED_NOTICE, OUT_OF_DISTRICT_NOTICE,
    UNDERAGE_NOTICE,
};

/// Top-level response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LookupResponse {
    /// The upstream site answered.
    Answer(AnswerEnvelope),
    /// The lookup could not get a definitive answer.
    Failure(FailureEnvelope),
    /// The national ID was rejected before any lookup.
    Invalid(InvalidEnvelope),
}

/// Body for a definitive answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerEnvelope {
    /// Always `true`.
    pub success: bool,
    /// The queried national ID.
    pub national_id: String,
    /// Classified status.
    pub status: LookupStatus,
    /// Status-specific payload.
    pub data: AnswerData,
}

/// Status-specific payload of an [`AnswerEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnswerData {
    /// Full polling-station details.
    Registered(RegistrationRecord),
    /// Registered elsewhere.
    OutOfDistrict {
        /// Informational message.
        message: String,
        /// Always `out_of_district`.
        reason: &'static str,
        /// The voter's actual district.
        district: String,
        /// Electoral center name.
        electoral_center: String,
        /// Electoral center address.
        address: String,
    },
    /// Not registered or underage.
    Notice {
        /// Upstream notice text.
        message: String,
        /// Status code.
        reason: &'static str,
    },
}

/// Body for a lookup that ran out of attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEnvelope {
    /// Always `false`.
    pub success: bool,
    /// The queried national ID.
    pub national_id: String,
    /// Failure description including the final reason.
    pub error: String,
    /// Always `true`.
    pub retries_exhausted: bool,
}

/// Body for rejected input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidEnvelope {
    /// Always `false`.
    pub success: bool,
    /// Validation message.
    pub error: String,
    /// Offending field.
    pub field: &'static str,
    /// Raw input as supplied.
    pub input: String,
}

impl LookupResponse {
    /// Builds the envelope for a finished lookup of `national_id`.
    #[must_use]
    pub fn from_result(national_id: &str, result: &LookupResult) -> Self {
        match result {
            LookupResult::Success { status, record, .. } => Self::Answer(AnswerEnvelope {
                success: true,
                national_id: national_id.to_string(),
                status: *status,
                data: answer_data(*status, record.as_ref()),
            }),
            LookupResult::Exhausted {
                attempts_made,
                last_reason,
                ..
            } => Self::Failure(FailureEnvelope {
                success: false,
                national_id: national_id.to_string(),
                error: format!("Failed after {attempts_made} attempts. Last error: {last_reason}"),
                retries_exhausted: true,
            }),
        }
    }

    /// Builds the envelope for rejected input.
    #[must_use]
    pub fn from_validation(err: &ValidationError) -> Self {
        Self::Invalid(InvalidEnvelope {
            success: false,
            error: err.message.clone(),
            field: err.field,
            input: err.input.clone(),
        })
    }

    /// Mirrors the `success` flag of the body.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Answer(_))
    }

    /// Serializes the body to a compact JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<&ValidationError> for LookupResponse {
    fn from(err: &ValidationError) -> Self {
        Self::from_validation(err)
    }
}

fn answer_data(status: LookupStatus, record: Option<&RegistrationRecord>) -> AnswerData {
    let record = record.cloned().unwrap_or_default();
    match status {
        LookupStatus::Registered => AnswerData::Registered(record),
        LookupStatus::OutOfDistrict => AnswerData::OutOfDistrict {
            message: OUT_OF_DISTRICT_NOTICE.to_string(),
            reason: status.code(),
            district: record.district,
            electoral_center: record.electoral_center,
            address: record.address,
        },
        LookupStatus::NotRegistered => AnswerData::Notice {
            message: NOT_REGISTERED_NOTICE.to_string(),
            reason: status.code(),
        },
        LookupStatus::Underage => AnswerData::Notice {
            message: UNDERAGE_NOTICE.to_string(),
            reason: status.code(),
        },
    }
}
