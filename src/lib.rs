//! # LECS DAQ Core Library
//!
//! Turns the raw line log of a LECS seafloor lander into two timestamped tables:
//! high-rate velocimeter/sensor samples ("data") and low-rate housekeeping records
//! ("status"). The data samples carry only a narrow wrapping counter, so their
//! absolute time is rebuilt from the status clocks.
//!
//! ## Crate Structure
//!
//! - **`acquisition`**: Reads raw lines from text logs or the logger's HTML table.
//! - **`records`**: Line classification plus the data and status decoders.
//! - **`calibration`**: Temperature, dissolved oxygen and pH conversions.
//! - **`timing`**: Time reconstruction from status anchors and the sample counter.
//! - **`pipeline`**: Runs every stage in order and collects a run report.
//! - **`data`**: CSV output and spectral flux estimation on reconstructed data.
//! - **`config`**: Figment-backed configuration (TOML file plus environment).
//! - **`error`**: The crate-wide `DaqError` type.
//! - **`logging`**: `tracing` subscriber setup.

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod records;
pub mod timing;

pub use error::{AppResult, DaqError};
pub use pipeline::{Pipeline, PipelineOutput, PipelineReport};
