//! Batch lookups from a text or CSV file.
//!
//! Input is one national ID per line, or a simple comma/semicolon/tab
//! separated table. When the first non-blank line names a national ID
//! column (`الرقم القومي` or `national_id`), that column is used and the
//! line is skipped; otherwise the first column of every line is used.
//! Quoted cells are unwrapped but separators inside quotes are not
//! supported.
//!
//! Output is JSON Lines: one response envelope per input row, in input
//! order.

use anyhow::Context;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use voter_lookup::{LookupResponse, LookupStatus, VoterLookup};

const HEADER_LABELS: &[&str] = &["الرقم القومي", "national_id", "national id"];
const SEPARATORS: &[char] = &[',', ';', '\t'];

/// One national ID cell from the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// 1-based line number in the input file.
    pub line: usize,
    /// Cell content with surrounding whitespace and quotes removed.
    pub raw: String,
}

/// Parsed batch input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    /// Header text of the ID column, when a header line was found.
    pub header: Option<String>,
    /// Zero-based column holding the IDs.
    pub column: usize,
    /// Rows to look up.
    pub rows: Vec<BatchRow>,
}

/// Outcome counts for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Rows processed.
    pub total: usize,
    /// Registered in a target district.
    pub registered: usize,
    /// Registered elsewhere.
    pub out_of_district: usize,
    /// Not in the voter database.
    pub not_registered: usize,
    /// Too young to vote.
    pub underage: usize,
    /// No definitive answer after all attempts.
    pub exhausted: usize,
    /// Rejected by validation.
    pub invalid: usize,
}

impl BatchSummary {
    fn record(&mut self, response: &LookupResponse) {
        self.total += 1;
        match response {
            LookupResponse::Answer(answer) => match answer.status {
                LookupStatus::Registered => self.registered += 1,
                LookupStatus::OutOfDistrict => self.out_of_district += 1,
                LookupStatus::NotRegistered => self.not_registered += 1,
                LookupStatus::Underage => self.underage += 1,
            },
            LookupResponse::Failure(_) => self.exhausted += 1,
            LookupResponse::Invalid(_) => self.invalid += 1,
        }
    }
}

fn split_cells(line: &str) -> Vec<String> {
    line.split(SEPARATORS)
        .map(|cell| cell.trim().trim_matches('"').to_string())
        .collect()
}

fn header_column(cells: &[String]) -> Option<usize> {
    cells.iter().position(|cell| {
        let lowered = cell.to_lowercase();
        HEADER_LABELS.iter().any(|label| lowered.contains(label))
    })
}

/// Parses batch input text.
#[must_use]
pub fn parse_ids(text: &str) -> BatchInput {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
        .peekable();

    let mut header = None;
    let mut column = 0;
    let first_cells = lines.peek().map(|(_, first)| split_cells(first));
    if let Some(cells) = first_cells {
        if let Some(index) = header_column(&cells) {
            header = cells.into_iter().nth(index);
            column = index;
            lines.next();
        }
    }

    let rows = lines
        .map(|(line, content)| BatchRow {
            line,
            raw: split_cells(content)
                .into_iter()
                .nth(column)
                .unwrap_or_default(),
        })
        .collect();

    BatchInput {
        header,
        column,
        rows,
    }
}

/// Reads and parses a batch input file.
///
/// # Errors
///
/// Fails when the file cannot be read as UTF-8 or holds no rows.
pub fn read_ids(path: &Path) -> anyhow::Result<BatchInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading batch input {}", path.display()))?;
    let input = parse_ids(&text);
    anyhow::ensure!(
        !input.rows.is_empty(),
        "no national IDs found in {}",
        path.display()
    );
    tracing::info!(
        path = %path.display(),
        rows = input.rows.len(),
        header = input.header.as_deref().unwrap_or("<none>"),
        column = input.column,
        "loaded batch input"
    );
    Ok(input)
}

/// Looks up every row with at most `concurrency` lookups in flight and
/// writes one JSON line per row, in input order.
///
/// # Errors
///
/// Fails when a response cannot be written to `out`.
pub async fn run_batch<W: Write>(
    service: &VoterLookup,
    rows: Vec<BatchRow>,
    concurrency: usize,
    out: &mut W,
) -> anyhow::Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let mut responses = stream::iter(rows)
        .map(|row| async move {
            let response = service.respond(&row.raw).await;
            (row, response)
        })
        .buffered(concurrency.max(1));

    while let Some((row, response)) = responses.next().await {
        if !response.is_success() {
            tracing::warn!(line = row.line, input = %row.raw, "lookup did not succeed");
        }
        summary.record(&response);
        serde_json::to_writer(&mut *out, &response)
            .with_context(|| format!("writing result for line {}", row.line))?;
        out.write_all(b"\n")
            .with_context(|| format!("writing result for line {}", row.line))?;
    }
    out.flush().context("flushing batch output")?;

    tracing::info!(
        total = summary.total,
        registered = summary.registered,
        out_of_district = summary.out_of_district,
        not_registered = summary.not_registered,
        underage = summary.underage,
        exhausted = summary.exhausted,
        invalid = summary.invalid,
        "batch complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_list() {
        let input = parse_ids("29710260300314\n\n  29901011234567  \n");
        assert_eq!(input.header, None);
        assert_eq!(input.column, 0);
        assert_eq!(
            input.rows,
            vec![
                BatchRow {
                    line: 1,
                    raw: "29710260300314".to_string()
                },
                BatchRow {
                    line: 3,
                    raw: "29901011234567".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_arabic_header_column() {
        let input = parse_ids("\u{feff}الاسم,الرقم القومي,الهاتف\nأحمد,29710260300314,0100\nمنى,\"29901011234567\",0111\n");
        assert_eq!(input.header.as_deref(), Some("الرقم القومي"));
        assert_eq!(input.column, 1);
        let ids: Vec<&str> = input.rows.iter().map(|r| r.raw.as_str()).collect();
        assert_eq!(ids, vec!["29710260300314", "29901011234567"]);
        assert_eq!(input.rows[0].line, 2);
    }

    #[test]
    fn test_english_header_with_semicolons() {
        let input = parse_ids("name;National_ID\nx;29710260300314\ny\n");
        assert_eq!(input.column, 1);
        assert_eq!(input.rows.len(), 2);
        assert_eq!(input.rows[1].raw, "", "short rows keep their place and fail validation");
    }

    #[test]
    fn test_read_ids_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "الرقم القومي\n\n").unwrap();
        let err = read_ids(file.path()).unwrap_err();
        assert!(err.to_string().contains("no national IDs"));
    }

    #[test]
    fn test_read_ids_missing_file_has_context() {
        let err = read_ids(Path::new("/nonexistent/ids.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("reading batch input"));
    }
}
