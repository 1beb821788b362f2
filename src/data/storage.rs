//! CSV writers for reconstructed tables.
//!
//! Timestamps are written as `%Y-%m-%dT%H:%M:%S%.f`; unset values as empty cells.
use crate::{
    error::{AppResult, DaqError},
    pipeline::PipelineOutput,
    records::{DataRecord, StatusRecord},
};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header of the data table.
pub const DATA_HEADER: [&str; 20] = [
    "index",
    "time",
    "count",
    "pressure",
    "u",
    "v",
    "w",
    "amp1",
    "amp2",
    "amp3",
    "corr1",
    "corr2",
    "corr3",
    "sync1",
    "unknown1",
    "ph_raw_voltage",
    "temperature",
    "do_raw_voltage",
    "do_percent",
    "ph",
];

/// Header of the status table.
pub const STATUS_HEADER: [&str; 11] = [
    "index",
    "time",
    "time_aux",
    "battery_voltage",
    "sound_speed",
    "heading",
    "pitch",
    "roll",
    "temp2",
    "primary",
    "device",
];

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn format_time(time: Option<NaiveDateTime>) -> String {
    time.map_or(String::new(), |t| t.format(TIME_FORMAT).to_string())
}

fn data_row(r: &DataRecord) -> Vec<String> {
    let mut row = vec![r.index.to_string(), format_time(r.time)];
    row.extend(
        [
            r.count,
            r.pressure,
            r.u,
            r.v,
            r.w,
            r.amp1,
            r.amp2,
            r.amp3,
            r.corr1,
            r.corr2,
            r.corr3,
            r.sync1,
            r.unknown1,
            r.ph_raw_voltage,
            r.temperature,
            r.do_raw_voltage,
            r.do_percent,
        ]
        .iter()
        .map(f64::to_string),
    );
    row.push(r.ph.map_or(String::new(), |v| v.to_string()));
    row
}

fn status_row(r: &StatusRecord) -> Vec<String> {
    let clock = |t: &crate::records::DateTuple| {
        format!(
            "{}-{}-{} {}:{}:{}",
            t.year, t.month, t.day, t.hour, t.minute, t.second
        )
    };
    let mut row = vec![
        r.index.to_string(),
        format_time(r.time),
        format_time(r.time_aux),
    ];
    row.extend(
        [r.battery_voltage, r.sound_speed, r.heading, r.pitch, r.roll, r.temp2]
            .iter()
            .map(f64::to_string),
    );
    row.push(clock(&r.primary));
    row.push(clock(&r.device));
    row
}

/// Writes data records as CSV.
pub fn write_data_csv<W: Write>(writer: W, records: &[DataRecord]) -> AppResult<()> {
    #[cfg(not(feature = "storage_csv"))]
    {
        let _ = (writer, records);
        return Err(DaqError::FeatureNotEnabled("storage_csv".to_string()));
    }

    #[cfg(feature = "storage_csv")]
    {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(DATA_HEADER)
            .map_err(|e| DaqError::Storage(e.to_string()))?;
        for record in records {
            writer
                .write_record(data_row(record))
                .map_err(|e| DaqError::Storage(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| DaqError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Writes status records as CSV.
pub fn write_status_csv<W: Write>(writer: W, records: &[StatusRecord]) -> AppResult<()> {
    #[cfg(not(feature = "storage_csv"))]
    {
        let _ = (writer, records);
        return Err(DaqError::FeatureNotEnabled("storage_csv".to_string()));
    }

    #[cfg(feature = "storage_csv")]
    {
        let mut writer = csv::Writer::from_writer(writer);
        writer
            .write_record(STATUS_HEADER)
            .map_err(|e| DaqError::Storage(e.to_string()))?;
        for record in records {
            writer
                .write_record(status_row(record))
                .map_err(|e| DaqError::Storage(e.to_string()))?;
        }
        writer
            .flush()
            .map_err(|e| DaqError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Paths written by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct OutputFiles {
    /// Data table.
    pub data: PathBuf,
    /// Status table.
    pub status: PathBuf,
    /// Run report, if requested.
    pub report: Option<PathBuf>,
}

/// Writes `data.csv`, `status.csv` and optionally `report.json` into `dir`.
pub fn write_outputs(
    dir: &Path,
    output: &PipelineOutput,
    with_report: bool,
) -> AppResult<OutputFiles> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| DaqError::Storage(e.to_string()))?;
    }

    let data = dir.join("data.csv");
    write_data_csv(File::create(&data)?, &output.data)?;
    let status = dir.join("status.csv");
    write_status_csv(File::create(&status)?, &output.status)?;

    let report = if with_report {
        let path = dir.join("report.json");
        let json = serde_json::to_string_pretty(&output.report)?;
        std::fs::write(&path, json)?;
        Some(path)
    } else {
        None
    };

    tracing::info!("Wrote results to '{}'.", dir.display());
    Ok(OutputFiles {
        data,
        status,
        report,
    })
}
