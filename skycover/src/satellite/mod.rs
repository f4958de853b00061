//! Satellite records and element-set parsing.
//!
//! Raw element-set text (three-line "name / line 1 / line 2" groups) is the
//! only external format the engine reads. It is validated here, at the
//! boundary, into [`SatelliteRecord`] values; malformed groups are logged and
//! skipped.
//!
//! # Modules
//!
//! - [`source`]: where element-set text comes from (HTTP, fixtures)
//! - [`catalog`]: time-bounded in-memory cache of parsed records

pub mod catalog;
pub mod source;

pub use catalog::SatelliteCatalog;
pub use source::{
    ElementSetSource, FetchError, FileElementSource, HttpElementSource, StaticElementSource,
    DEFAULT_ELEMENTS_URL, DEFAULT_FETCH_TIMEOUT_SECS,
};

use thiserror::Error;
use tracing::{debug, warn};

/// Default cap on parsed records per fetch.
pub const DEFAULT_MAX_RECORDS: usize = 4000;

/// Length of a two-line element line (without line terminator).
const TLE_LINE_LEN: usize = 69;

/// Reasons an element set is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementSetError {
    #[error("line {line} must start with '{line} '")]
    BadLineNumber { line: u8 },

    #[error("line {line} is {len} characters (expected 69)")]
    BadLength { line: u8, len: usize },

    #[error("catalog numbers differ between lines ('{line1}' vs '{line2}')")]
    CatalogMismatch { line1: String, line2: String },

    #[error("invalid inclination field: '{0}'")]
    BadInclination(String),

    #[error("line {line} checksum is '{found}' (expected {expected})")]
    BadChecksum { line: u8, expected: u8, found: char },
}

/// One validated two-line element set.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSet {
    line1: String,
    line2: String,
    inclination_deg: f64,
}

impl ElementSet {
    /// Validate the structure of a two-line element set.
    ///
    /// Checks line numbers, lengths, the modulo-10 checksum in column 69,
    /// matching catalog numbers, and that the inclination field is a number
    /// in `[0, 180]`. The remaining fields are left to the propagation model.
    pub fn parse(line1: &str, line2: &str) -> Result<Self, ElementSetError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();

        if !line1.starts_with("1 ") {
            return Err(ElementSetError::BadLineNumber { line: 1 });
        }
        if !line2.starts_with("2 ") {
            return Err(ElementSetError::BadLineNumber { line: 2 });
        }
        if line1.len() != TLE_LINE_LEN {
            return Err(ElementSetError::BadLength {
                line: 1,
                len: line1.len(),
            });
        }
        if line2.len() != TLE_LINE_LEN {
            return Err(ElementSetError::BadLength {
                line: 2,
                len: line2.len(),
            });
        }

        verify_checksum(1, line1)?;
        verify_checksum(2, line2)?;

        let catalog1 = line1.get(2..7).unwrap_or_default();
        let catalog2 = line2.get(2..7).unwrap_or_default();
        if catalog1 != catalog2 {
            return Err(ElementSetError::CatalogMismatch {
                line1: catalog1.to_string(),
                line2: catalog2.to_string(),
            });
        }

        let field = line2.get(8..16).unwrap_or_default().trim();
        let inclination_deg: f64 = field
            .parse()
            .map_err(|_| ElementSetError::BadInclination(field.to_string()))?;
        if !(0.0..=180.0).contains(&inclination_deg) {
            return Err(ElementSetError::BadInclination(field.to_string()));
        }

        Ok(Self {
            line1: line1.to_string(),
            line2: line2.to_string(),
            inclination_deg,
        })
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    /// Orbital inclination in degrees.
    pub fn inclination_deg(&self) -> f64 {
        self.inclination_deg
    }
}

/// Modulo-10 checksum of an element line: digits count their value, minus
/// signs count 1, everything else 0. Only the first 68 characters are read.
pub fn line_checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(TLE_LINE_LEN - 1)
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

fn verify_checksum(line: u8, text: &str) -> Result<(), ElementSetError> {
    let expected = line_checksum(text);
    let found = text.chars().nth(TLE_LINE_LEN - 1).unwrap_or(' ');
    if found.to_digit(10) == Some(u32::from(expected)) {
        Ok(())
    } else {
        Err(ElementSetError::BadChecksum {
            line,
            expected,
            found,
        })
    }
}

/// A named satellite with its orbital elements.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteRecord {
    name: String,
    elements: ElementSet,
}

impl SatelliteRecord {
    pub fn new(name: impl Into<String>, elements: ElementSet) -> Self {
        Self {
            name: name.into(),
            elements,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn inclination_deg(&self) -> f64 {
        self.elements.inclination_deg
    }
}

/// Inclusive inclination window in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InclinationRange {
    pub min_deg: f64,
    pub max_deg: f64,
}

impl InclinationRange {
    pub fn new(min_deg: f64, max_deg: f64) -> Self {
        Self { min_deg, max_deg }
    }

    pub fn contains(&self, inclination_deg: f64) -> bool {
        inclination_deg >= self.min_deg && inclination_deg <= self.max_deg
    }
}

impl Default for InclinationRange {
    fn default() -> Self {
        Self::new(0.0, 180.0)
    }
}

/// Keep only satellites whose inclination falls within `range`.
pub fn filter_by_inclination(
    satellites: &[SatelliteRecord],
    range: InclinationRange,
) -> Vec<SatelliteRecord> {
    satellites
        .iter()
        .filter(|s| range.contains(s.inclination_deg()))
        .cloned()
        .collect()
}

/// Outcome of parsing an element-set document.
#[derive(Debug, Clone, Default)]
pub struct ParsedElementSets {
    pub records: Vec<SatelliteRecord>,
    /// Groups that were malformed or incomplete.
    pub skipped: usize,
}

/// Parse three-line element-set text.
///
/// Blank lines are ignored; the remaining lines are read in groups of
/// `name, line 1, line 2`. A malformed group is logged and skipped. Parsing
/// stops once `max_records` records have been collected.
pub fn parse_element_sets(text: &str, max_records: usize) -> ParsedElementSets {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let mut parsed = ParsedElementSets::default();

    for group in lines.chunks(3) {
        if parsed.records.len() >= max_records {
            break;
        }

        let name = normalize_name(group[0]);
        let (line1, line2) = match group {
            [_, line1, line2] => (*line1, *line2),
            _ => {
                warn!(name = %name, "Incomplete element set at end of input");
                parsed.skipped += 1;
                continue;
            }
        };

        match ElementSet::parse(line1, line2) {
            Ok(elements) => parsed.records.push(SatelliteRecord::new(name, elements)),
            Err(e) => {
                warn!(name = %name, error = %e, "Failed to parse element set");
                parsed.skipped += 1;
            }
        }
    }

    debug!(
        records = parsed.records.len(),
        skipped = parsed.skipped,
        "Parsed element sets"
    );
    parsed
}

/// Strip whitespace and the optional "0 " prefix of three-line element sets.
fn normalize_name(line: &str) -> String {
    let trimmed = line.trim();
    trimmed
        .strip_prefix("0 ")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
