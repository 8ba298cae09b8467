//! Structural validation of national identification numbers.

use std::fmt;

use serde::Serialize;

use crate::error::ValidationError;

/// Number of characters in a national ID.
pub const NATIONAL_ID_LEN: usize = 14;

/// A validated national ID: exactly 14 ASCII digits.
///
/// The only way to obtain one is through [`validate`], so holders can rely on
/// the invariant without re-checking it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Returns the identifier digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = ValidationError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        validate(raw)
    }
}

/// Validates a raw national ID.
///
/// Surrounding whitespace is trimmed first. The rules are checked in order
/// and the first failure is returned:
///
/// 1. the trimmed value is not empty;
/// 2. it is exactly [`NATIONAL_ID_LEN`] characters long;
/// 3. every character is an ASCII digit.
///
/// The error always echoes `raw` untouched.
///
/// # Examples
///
/// ```
/// use voter_lookup::validate;
///
/// let id = validate(" 29710260300314 ").unwrap();
/// assert_eq!(id.as_str(), "29710260300314");
///
/// let err = validate("2971026000314").unwrap_err();
/// assert!(err.message.contains("13"));
/// ```
pub fn validate(raw: &str) -> Result<Identifier, ValidationError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::new("National ID must not be empty", raw));
    }

    let len = trimmed.chars().count();
    if len != NATIONAL_ID_LEN {
        return Err(ValidationError::new(
            format!("National ID must be exactly {NATIONAL_ID_LEN} digits, got {len} characters"),
            raw,
        ));
    }

    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(
            "National ID must contain only digits (0-9)",
            raw,
        ));
    }

    Ok(Identifier(trimmed.to_string()))
}
