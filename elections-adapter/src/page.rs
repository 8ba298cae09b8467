//! Interpretation of the inquiry result page.
//!
//! The page is read as rendered text. Known notices map straight to a
//! status; otherwise the labelled fields are pulled out line by line.
//! Numeric fields may be written with Arabic-Indic digits and are
//! normalized to ASCII.

use std::sync::LazyLock;

use regex::Regex;
use voter_lookup::{AttemptOutcome, LookupStatus, RegistrationRecord, NOT_REGISTERED_NOTICE, UNDERAGE_NOTICE};

/// Any of these in the body means the result has rendered.
pub const RESULT_MARKERS: &[&str] = &["مركزك الإنتخابي", "قسم", "عفوا", "الرقم القومي"];

/// Bodies shorter than this (after trimming) are treated as not yet loaded.
pub const MIN_BODY_CHARS: usize = 10;

pub(crate) const EMPTY_PAGE_REASON: &str = "Page content is empty or incomplete";
pub(crate) const NO_DISTRICT_REASON: &str = "Could not extract district from result page";

struct FieldPatterns {
    electoral_center: Regex,
    district_strict: Regex,
    district: Regex,
    address: Regex,
    subcommittee: Regex,
    list_number: Regex,
    number: Regex,
}

const PATTERN_SOURCES: [&str; 7] = [
    r"مركزك الإنتخابي[:\s]+([^\n]+)",
    r"قسم\s*:\s*([^\n]+)",
    r"قسم[:\s]+([^\n]+)",
    r"العنوان\s*[:\s]+([^\n]+)",
    r"رقم اللجنة الفرعية\s*[:\s]+\s*([^\n]+)",
    r"رقمك في الكشوف الانتخابية\s*[:\s]+\s*([^\n]+)",
    r"[0-9]+",
];

static PATTERNS: LazyLock<Option<FieldPatterns>> = LazyLock::new(|| {
    let compiled: Vec<Regex> = PATTERN_SOURCES
        .iter()
        .filter_map(|src| Regex::new(src).ok())
        .collect();
    let [electoral_center, district_strict, district, address, subcommittee, list_number, number] =
        <[Regex; 7]>::try_from(compiled).ok()?;
    Some(FieldPatterns {
        electoral_center,
        district_strict,
        district,
        address,
        subcommittee,
        list_number,
        number,
    })
});

/// Replaces Arabic-Indic (U+0660..U+0669) and Extended Arabic-Indic
/// (U+06F0..U+06F9) digits with ASCII digits.
#[must_use]
pub fn to_ascii_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from_digit(u32::from(c) - 0x0660, 10).unwrap_or(c),
            '\u{06F0}'..='\u{06F9}' => char::from_digit(u32::from(c) - 0x06F0, 10).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Classifies the rendered body text of the result page.
///
/// Notices win over field extraction. A page that yields no district is
/// transient: the result has not rendered, or the layout changed.
#[must_use]
pub fn interpret(body: &str) -> AttemptOutcome {
    if body.trim().chars().count() < MIN_BODY_CHARS {
        return AttemptOutcome::transient(EMPTY_PAGE_REASON);
    }

    if body.contains(UNDERAGE_NOTICE) {
        return AttemptOutcome::answer(LookupStatus::Underage);
    }
    if body.contains(NOT_REGISTERED_NOTICE) {
        return AttemptOutcome::answer(LookupStatus::NotRegistered);
    }

    let Some(patterns) = PATTERNS.as_ref() else {
        return AttemptOutcome::transient("result page patterns failed to compile");
    };

    let record = extract_record(body, patterns);
    if record.district.is_empty() {
        tracing::debug!(body_chars = body.chars().count(), "no district label on page");
        return AttemptOutcome::transient(NO_DISTRICT_REASON);
    }

    tracing::debug!(?record, "extracted registration record");
    AttemptOutcome::registered(record)
}

fn extract_record(body: &str, patterns: &FieldPatterns) -> RegistrationRecord {
    let district = capture(&patterns.district_strict, body)
        .or_else(|| capture(&patterns.district, body))
        .unwrap_or_default();

    RegistrationRecord {
        electoral_center: capture(&patterns.electoral_center, body).unwrap_or_default(),
        district,
        address: capture(&patterns.address, body).unwrap_or_default(),
        subcommittee_number: capture_number(&patterns.subcommittee, &patterns.number, body),
        electoral_list_number: capture_number(&patterns.list_number, &patterns.number, body),
    }
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn capture_number(label: &Regex, number: &Regex, text: &str) -> String {
    capture(label, text)
        .map(|raw| to_ascii_digits(&raw))
        .and_then(|ascii| number.find(&ascii).map(|m| m.as_str().to_string()))
        .unwrap_or_default()
}
