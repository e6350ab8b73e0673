//! Text encodings for persisted algorithm records
//!
//! Provides the [`HistoryRecordCodec`] seam and [`LegacyTextCodec`], the
//! line-oriented format stored in each `MantidAlgorithm_<n>` entry:
//!
//! ```text
//! Algorithm: Rebin v1
//! Execution Date: 2009-Feb-18 09:43:21.000000
//! Execution Duration: 0.25 seconds
//! Parameters:
//!   Name: InputWorkspace, Value: raw, Default?: No, Direction: Input
//! ```
//!
//! Decoding checks each field separately and reports the first problem as a
//! [`RecordParseError`] so a bulk load can skip just that record.

use crate::algorithm::AlgorithmHistory;
use crate::error::RecordParseError;
use crate::property::{Direction, PropertyHistory};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Date layout written into records
pub const DATE_FORMAT: &str = "%Y-%b-%d %H:%M:%S%.6f";

/// Date layout accepted when reading (fraction optional)
const DATE_PARSE_FORMAT: &str = "%Y-%b-%d %H:%M:%S%.f";

/// Smallest meaningful record: three header lines plus one more
const MIN_RECORD_LINES: usize = 4;

/// Lines holding name, date and duration
const HEADER_LINES: usize = 3;

const PARAMETERS_LINE: &str = "Parameters:";
const PROPERTY_START: &str = "Name: ";

/// Conversion between an [`AlgorithmHistory`] and its stored text
///
/// Child histories are not part of a record; containers nest them.
pub trait HistoryRecordCodec: Send + Sync {
    /// Encode one record
    fn encode(&self, record: &AlgorithmHistory) -> String;

    /// Decode one record
    ///
    /// # Errors
    /// Returns the first field that could not be understood
    fn decode(&self, raw: &str) -> Result<AlgorithmHistory, RecordParseError>;
}

/// The key/value text format used by NeXus history entries
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyTextCodec;

impl HistoryRecordCodec for LegacyTextCodec {
    fn encode(&self, record: &AlgorithmHistory) -> String {
        let mut out = format!(
            "Algorithm: {} v{}\nExecution Date: {}\nExecution Duration: {} seconds\nParameters:\n",
            record.name(),
            record.version(),
            record.execution_date().format(DATE_FORMAT),
            record.execution_duration(),
        );
        for property in record.properties() {
            out.push_str("  ");
            out.push_str(&property.to_string());
            out.push('\n');
        }
        out
    }

    fn decode(&self, raw: &str) -> Result<AlgorithmHistory, RecordParseError> {
        let lines: Vec<&str> = raw.lines().map(|line| line.trim_end_matches('\r')).collect();
        let filled: Vec<(usize, &str)> = lines
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();
        if filled.len() < MIN_RECORD_LINES {
            return Err(RecordParseError::IncorrectRecordSize { lines: filled.len() });
        }

        let (name, version) = parse_header(filled[0].1)?;
        let start = parse_date(labelled_value(filled[1].1, "Execution Date")?)?;
        let duration = parse_duration(labelled_value(filled[2].1, "Execution Duration")?)?;
        let body = filled[HEADER_LINES - 1].0 + 1;

        let mut record = AlgorithmHistory::new(name, version, start, duration);
        for text in property_texts(&lines[body..])? {
            record = record.with_property(parse_property(&text)?);
        }
        Ok(record)
    }
}

/// Group body lines into one text per property
///
/// A property starts at a `Name: ` line; every following line up to the next
/// one belongs to its value, verbatim.
fn property_texts(lines: &[&str]) -> Result<Vec<String>, RecordParseError> {
    let mut texts: Vec<String> = Vec::new();
    for line in lines {
        let start = line.trim_start();
        if start.starts_with(PROPERTY_START) {
            texts.push(start.to_string());
        } else if let Some(current) = texts.last_mut() {
            current.push('\n');
            current.push_str(line);
        } else if !(start.is_empty() || start.trim_end() == PARAMETERS_LINE) {
            return Err(RecordParseError::MalformedProperty((*line).to_string()));
        }
    }
    Ok(texts)
}

/// Value after `label:` on a fixed header line
fn labelled_value<'a>(line: &'a str, label: &'static str) -> Result<&'a str, RecordParseError> {
    match line.trim().split_once(':') {
        Some((key, value)) if key.trim() == label => Ok(value.trim()),
        _ => Err(RecordParseError::MissingField {
            expected: label,
            line: line.to_string(),
        }),
    }
}

fn parse_header(line: &str) -> Result<(String, i32), RecordParseError> {
    let mut tokens = line.split_whitespace();
    let (Some(keyword), Some(name), Some(version)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(RecordParseError::MalformedHeader(line.to_string()));
    };
    if keyword.trim_end_matches(':') != "Algorithm" {
        return Err(RecordParseError::MalformedHeader(line.to_string()));
    }
    let version = version
        .strip_prefix('v')
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(|| RecordParseError::BadVersion(version.to_string()))?;
    Ok((name.to_string(), version))
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, RecordParseError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, DATE_PARSE_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| RecordParseError::BadDate(value.to_string()))
}

fn parse_duration(value: &str) -> Result<f64, RecordParseError> {
    value
        .split_whitespace()
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .ok_or_else(|| RecordParseError::BadDuration(value.to_string()))
}

/// Parse `Name: n, Value: v, Default?: Yes|No, Direction: d`
///
/// Values may themselves contain commas, so the trailing fields are located
/// from the right.
fn parse_property(line: &str) -> Result<PropertyHistory, RecordParseError> {
    const VALUE: &str = ", Value: ";
    const DEFAULT: &str = ", Default?: ";
    const DIRECTION: &str = ", Direction: ";

    let malformed = || RecordParseError::MalformedProperty(line.to_string());

    let rest = line.strip_prefix(PROPERTY_START).ok_or_else(malformed)?;
    let (name, rest) = rest.split_once(VALUE).ok_or_else(malformed)?;
    let (rest, direction) = rest.rsplit_once(DIRECTION).ok_or_else(malformed)?;
    let (value, is_default) = rest.rsplit_once(DEFAULT).ok_or_else(malformed)?;

    let is_default = match is_default.trim() {
        "Yes" | "Y" => true,
        "No" | "N" => false,
        _ => return Err(malformed()),
    };
    let direction: Direction = direction.parse()?;

    Ok(PropertyHistory::new(
        name.trim(),
        value,
        String::new(),
        is_default,
        direction,
    ))
}
