//! End-to-end parsing of a raw LECS log.
//!
//! Classify → decode data and status → reconstruct time → keep only timed rows,
//! sorted by time. Any stage failure aborts the run; there is no partial output.
//!
//! # Example
//! ```no_run
//! use lecs_daq::{acquisition, config::LecsConfig, pipeline::Pipeline};
//!
//! # fn main() -> Result<(), lecs_daq::error::DaqError> {
//! let config = LecsConfig::load_from("lecs_daq.toml")?;
//! let lines = acquisition::load_file("raw_log.txt", &config.acquisition)?;
//! let output = Pipeline::new(config)?.run(&lines)?;
//! println!("{} timed samples", output.data.len());
//! # Ok(())
//! # }
//! ```

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span};

use crate::calibration::{CalibrationSet, PhCalibration};
use crate::config::LecsConfig;
use crate::error::AppResult;
use crate::records::{
    classify, decode_data, decode_status, ClassifiedLine, DataRecord, DecodeStats, RawLine,
    StatusRecord, StatusStats,
};
use crate::timing::{ReconstructionParams, ReconstructionStats, TimeReconstructor};

/// Diagnostics for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Raw lines handed to the classifier.
    pub raw_lines: usize,
    /// Lines matching no record marker.
    pub unmatched_lines: usize,
    /// Position lines passed through.
    pub position_lines: usize,
    /// Data decoder counts.
    pub data: DecodeStats,
    /// Status decoder counts.
    pub status: StatusStats,
    /// Reconstructor counts.
    pub reconstruction: ReconstructionStats,
    /// Timed data rows returned.
    pub data_rows: usize,
    /// Timed status rows returned.
    pub status_rows: usize,
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Timed data records sorted by time.
    pub data: Vec<DataRecord>,
    /// Timed status records sorted by time.
    pub status: Vec<StatusRecord>,
    /// Position lines, untouched.
    pub position: Vec<ClassifiedLine>,
    /// Run diagnostics.
    pub report: PipelineReport,
}

/// Configured parser for raw LECS logs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: LecsConfig,
    calibration: CalibrationSet,
    now: Option<NaiveDateTime>,
}

impl Pipeline {
    /// Validates the configuration and loads any calibration files it names.
    pub fn new(config: LecsConfig) -> AppResult<Self> {
        config.validate()?;
        let ph = config
            .calibration
            .ph_coefficients_path
            .as_ref()
            .map(PhCalibration::load)
            .transpose()?;
        let calibration = CalibrationSet {
            temperature: config.calibration.temperature,
            oxygen: config.calibration.oxygen,
            ph,
        };
        Ok(Self {
            config,
            calibration,
            now: None,
        })
    }

    /// Fixes the moment of processing instead of reading the system clock.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &LecsConfig {
        &self.config
    }

    /// Runs every stage over `lines`.
    pub fn run(&self, lines: &[RawLine]) -> AppResult<PipelineOutput> {
        let _span = info_span!("pipeline", lines = lines.len()).entered();
        let now = self.now.unwrap_or_else(|| Utc::now().naive_utc());

        let classified = classify(lines);
        let (mut data, data_stats) = decode_data(&classified.data, &self.calibration)?;
        let (mut status, status_stats) =
            decode_status(&classified.status, &self.config.status, now)?;

        let params =
            ReconstructionParams::from_config(&self.config.timing, self.config.high_time_cutoff_or(now));
        let reconstruction = TimeReconstructor::new(params)?.reconstruct(&mut data, &mut status)?;

        let mut data: Vec<DataRecord> = data
            .into_records()
            .into_iter()
            .filter(|r| r.time.is_some())
            .collect();
        data.sort_by(|a, b| a.time.cmp(&b.time).then(a.index.cmp(&b.index)));

        let mut status: Vec<StatusRecord> = status
            .into_records()
            .into_iter()
            .filter(|r| r.time.is_some())
            .collect();
        status.sort_by(|a, b| a.time.cmp(&b.time).then(a.index.cmp(&b.index)));

        let report = PipelineReport {
            raw_lines: lines.len(),
            unmatched_lines: classified.unmatched,
            position_lines: classified.position.len(),
            data: data_stats,
            status: status_stats,
            reconstruction,
            data_rows: data.len(),
            status_rows: status.len(),
        };
        info!(
            data_rows = report.data_rows,
            status_rows = report.status_rows,
            "Pipeline finished"
        );

        Ok(PipelineOutput {
            data,
            status,
            position: classified.position,
            report,
        })
    }
}
