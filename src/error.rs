//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the whole crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the kinds of failures that can stop a parsing run, from I/O and configuration
//! issues to invariant violations inside the time reconstructor.
//!
//! ## Error Hierarchy
//!
//! `DaqError` consolidates the following sources:
//!
//! - **`Config`**: Wraps errors from `figment`, typically file parsing or type
//!   mismatches in the configuration file or environment.
//! - **`Configuration`**: Semantic errors in a configuration that parsed fine but is
//!   logically wrong (e.g. a negative sampling frequency). Caught by `validate()`.
//! - **`Io`**: Wraps `std::io::Error`, covering reading raw logs and writing results.
//! - **`Decode`**: No record of a class survived decoding. Stacking an empty record set
//!   has no meaningful result, so this is fatal.
//! - **`NegativeCounterDelta`** / **`NonMonotonicTime`**: Invariant violations raised by
//!   the time reconstructor. Both carry the anchor index of the segment and the index of
//!   the offending record.
//! - **`Calibration`**: Problems with calibration coefficient files.
//! - **`Storage`** / **`Serialization`**: Failures while writing results.
//! - **`Processing`**: Bad input handed to a downstream processing step.
//! - **`FeatureNotEnabled`**: Functionality compiled out via feature flags.
//!
//! Lines that are merely malformed are never errors; they are counted in the decoder
//! statistics and dropped.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::records::RecordClass;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum DaqError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No {class} records survived decoding ({lines_seen} lines seen)")]
    Decode {
        class: RecordClass,
        lines_seen: usize,
    },

    #[error(
        "Negative counter delta in segment anchored at line {segment}: record {index} has count {count_in} below reference {reference}"
    )]
    NegativeCounterDelta {
        segment: usize,
        index: usize,
        count_in: f64,
        reference: f64,
    },

    #[error(
        "Non-monotonic time in segment anchored at line {segment}: record {index} at {next} does not follow {previous}"
    )]
    NonMonotonicTime {
        segment: usize,
        index: usize,
        previous: NaiveDateTime,
        next: NaiveDateTime,
    },

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data processing error: {0}")]
    Processing(String),

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl From<figment::Error> for DaqError {
    fn from(value: figment::Error) -> Self {
        DaqError::Config(Box::new(value))
    }
}

impl From<serde_json::Error> for DaqError {
    fn from(value: serde_json::Error) -> Self {
        DaqError::Serialization(value.to_string())
    }
}

impl DaqError {
    /// Whether this error is an invariant violation from the time reconstructor.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            DaqError::NegativeCounterDelta { .. } | DaqError::NonMonotonicTime { .. }
        )
    }
}
