//! Raw log records and their decoders.
//!
//! A raw LECS log interleaves three kinds of lines:
//!
//! - **Data** lines (`D:`) carrying one full-rate sample of every channel,
//! - **Status** lines (`S:`) carrying the wall clock, the velocimeter's own clock and
//!   a handful of housekeeping values,
//! - **Position** lines (`$`) carrying NMEA-like GPS text.
//!
//! The `classifier` tags lines, and the `data` and `status` decoders turn the tagged
//! lines into typed tables keyed by the line's original index in the log.

pub mod classifier;
pub mod data;
pub mod status;

use std::fmt;

use serde::Serialize;

pub use classifier::{classify, ClassifiedLines};
pub use data::{decode_data, DataRecord, DataTable, DecodeStats};
pub use status::{decode_status, DateTuple, StatusRecord, StatusStats, StatusTable};

/// One line of the raw log, as produced by the acquisition step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Position of the line in the raw log.
    pub index: usize,
    /// Line text, untrimmed.
    pub text: String,
}

impl RawLine {
    /// Creates a raw line.
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Numbers a sequence of lines in order, starting at zero.
    pub fn enumerate<I, S>(lines: I) -> Vec<RawLine>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lines
            .into_iter()
            .enumerate()
            .map(|(index, text)| RawLine::new(index, text))
            .collect()
    }
}

/// The kind of record a raw line holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordClass {
    /// Full-rate sensor sample.
    Data,
    /// Low-rate status record with clock readings.
    Status,
    /// GPS position sentence.
    Position,
}

impl RecordClass {
    /// Substring that identifies this class in a raw line.
    pub fn marker(self) -> &'static str {
        match self {
            RecordClass::Data => "D:",
            RecordClass::Status => "S:",
            RecordClass::Position => "$",
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordClass::Data => "data",
            RecordClass::Status => "status",
            RecordClass::Position => "position",
        };
        f.write_str(name)
    }
}

/// A trimmed raw line tagged with its record class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// Position of the line in the raw log.
    pub index: usize,
    /// Record class chosen by the classifier.
    pub class: RecordClass,
    /// Trimmed line text, marker included.
    pub text: String,
}

impl ClassifiedLine {
    /// The part of the line after the first occurrence of the class marker.
    pub fn payload(&self) -> &str {
        let marker = self.class.marker();
        self.text
            .split_once(marker)
            .map_or("", |(_, rest)| rest)
    }
}

/// Splits a comma separated payload and parses every field as a float.
///
/// Returns `None` if any field fails to parse.
pub(crate) fn parse_fields<'a, I>(fields: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a str>,
{
    fields
        .into_iter()
        .map(|field| field.trim().parse::<f64>().ok())
        .collect()
}
