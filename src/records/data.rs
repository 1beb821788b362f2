//! Data line decoder.
//!
//! A data line looks like
//!
//! ```text
//! D:count,pressure,u,v,w,amp1,amp2,amp3,corr1,corr2,corr3,sync1,unknown1,ph,temp,do.
//! ```
//!
//! with an optional trailing period. Only lines with exactly [`DATA_WIDTH`] fields are
//! accepted; a partial line cannot be mapped onto named channels safely. Accepted lines
//! are calibrated on the way in, so a [`DataRecord`] always holds physical units.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::RangeBounds;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use super::{parse_fields, ClassifiedLine, RecordClass};
use crate::calibration::CalibrationSet;
use crate::error::{AppResult, DaqError};

/// Column names of a raw data line, in order.
pub const DATA_FIELD_NAMES: [&str; 16] = [
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
    "temp",
    "DO",
];

/// Number of comma separated fields in a well-formed data line.
pub const DATA_WIDTH: usize = DATA_FIELD_NAMES.len();

/// Velocities arrive in mm/s.
const VELOCITY_SCALE: f64 = 1e-3;

/// Optional character closing a data line.
const LINE_TERMINATOR: char = '.';

/// One decoded and calibrated data sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRecord {
    /// Position of the line in the raw log.
    pub index: usize,
    /// Narrow sample counter; wraps below 256.
    pub count: f64,
    /// Pressure.
    pub pressure: f64,
    /// Velocity components in m/s.
    pub u: f64,
    #[allow(missing_docs)]
    pub v: f64,
    #[allow(missing_docs)]
    pub w: f64,
    /// Beam amplitudes.
    pub amp1: f64,
    #[allow(missing_docs)]
    pub amp2: f64,
    #[allow(missing_docs)]
    pub amp3: f64,
    /// Beam correlations.
    pub corr1: f64,
    #[allow(missing_docs)]
    pub corr2: f64,
    #[allow(missing_docs)]
    pub corr3: f64,
    /// Synchronization field of unknown meaning.
    pub sync1: f64,
    /// Unidentified field.
    pub unknown1: f64,
    /// Raw pH electrode voltage.
    pub ph_raw_voltage: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Raw optode voltage.
    pub do_raw_voltage: f64,
    /// Dissolved oxygen in percent saturation.
    pub do_percent: f64,
    /// Calibrated pH, when a pH regression is configured.
    pub ph: Option<f64>,
    /// Reconstructed absolute time; `None` until a status anchor covers the sample.
    pub time: Option<NaiveDateTime>,
}

impl DataRecord {
    /// Builds a calibrated record from the sixteen raw field values.
    pub fn from_raw(index: usize, raw: &[f64; DATA_WIDTH], calibration: &CalibrationSet) -> Self {
        let temperature = calibration.temperature.to_celsius(raw[14]);
        let do_percent = calibration.oxygen.to_percent_saturation(raw[15], temperature);
        let ph = calibration
            .ph
            .as_ref()
            .map(|cal| cal.to_ph(raw[13], temperature));

        Self {
            index,
            count: raw[0],
            pressure: raw[1],
            u: raw[2] * VELOCITY_SCALE,
            v: raw[3] * VELOCITY_SCALE,
            w: raw[4] * VELOCITY_SCALE,
            amp1: raw[5],
            amp2: raw[6],
            amp3: raw[7],
            corr1: raw[8],
            corr2: raw[9],
            corr3: raw[10],
            sync1: raw[11],
            unknown1: raw[12],
            ph_raw_voltage: raw[13],
            temperature,
            do_raw_voltage: raw[15],
            do_percent,
            ph,
            time: None,
        }
    }
}

/// Data records keyed by original line index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    records: BTreeMap<usize, DataRecord>,
}

impl DataTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any record at the same index.
    pub fn insert(&mut self, record: DataRecord) {
        self.records.insert(record.index, record);
    }

    /// Record at an original line index.
    pub fn get(&self, index: usize) -> Option<&DataRecord> {
        self.records.get(&index)
    }

    /// Mutable record at an original line index.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut DataRecord> {
        self.records.get_mut(&index)
    }

    /// Records whose index falls in `range`, in index order.
    pub fn range_mut<R>(&mut self, range: R) -> btree_map::RangeMut<'_, usize, DataRecord>
    where
        R: RangeBounds<usize>,
    {
        self.records.range_mut(range)
    }

    /// All records in index order.
    pub fn iter(&self) -> impl Iterator<Item = &DataRecord> {
        self.records.values()
    }

    /// All records in index order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DataRecord> {
        self.records.values_mut()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consumes the table, yielding records in index order.
    pub fn into_records(self) -> Vec<DataRecord> {
        self.records.into_values().collect()
    }
}

impl FromIterator<DataRecord> for DataTable {
    fn from_iter<T: IntoIterator<Item = DataRecord>>(iter: T) -> Self {
        let mut table = DataTable::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

/// Counts kept by the data decoder, by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    /// Data lines handed to the decoder.
    pub lines_seen: usize,
    /// Lines turned into records.
    pub accepted: usize,
    /// Lines with a field count other than [`DATA_WIDTH`].
    pub wrong_width: usize,
    /// Lines with the right width but a non-numeric field.
    pub unparseable: usize,
}

enum LineOutcome {
    Accepted([f64; DATA_WIDTH]),
    WrongWidth(usize),
    Unparseable,
}

fn decode_line(line: &ClassifiedLine) -> LineOutcome {
    let payload = line.payload();
    let payload = payload.strip_suffix(LINE_TERMINATOR).unwrap_or(payload);

    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() != DATA_WIDTH {
        return LineOutcome::WrongWidth(fields.len());
    }

    match parse_fields(fields).and_then(|values| <[f64; DATA_WIDTH]>::try_from(values).ok()) {
        Some(values) => LineOutcome::Accepted(values),
        None => LineOutcome::Unparseable,
    }
}

/// Decodes and calibrates data lines into a table keyed by original index.
///
/// Malformed lines are dropped and counted. If nothing survives, the result is a
/// [`DaqError::Decode`] error rather than an empty table.
pub fn decode_data(
    lines: &[ClassifiedLine],
    calibration: &CalibrationSet,
) -> AppResult<(DataTable, DecodeStats)> {
    let mut stats = DecodeStats {
        lines_seen: lines.len(),
        ..DecodeStats::default()
    };
    let mut table = DataTable::new();

    for line in lines {
        match decode_line(line) {
            LineOutcome::Accepted(raw) => {
                table.insert(DataRecord::from_raw(line.index, &raw, calibration));
                stats.accepted += 1;
            }
            LineOutcome::WrongWidth(width) => {
                debug!(index = line.index, width, "Dropping data line with wrong field count");
                stats.wrong_width += 1;
            }
            LineOutcome::Unparseable => {
                debug!(index = line.index, "Dropping data line with non-numeric field");
                stats.unparseable += 1;
            }
        }
    }

    if table.is_empty() {
        return Err(DaqError::Decode {
            class: RecordClass::Data,
            lines_seen: stats.lines_seen,
        });
    }

    info!(
        accepted = stats.accepted,
        wrong_width = stats.wrong_width,
        unparseable = stats.unparseable,
        "Decoded data lines"
    );
    Ok((table, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_line(index: usize, text: &str) -> ClassifiedLine {
        ClassifiedLine {
            index,
            class: RecordClass::Data,
            text: text.to_string(),
        }
    }

    const GOOD: &str = "D:17,10.5,100,-200,30,120,121,122,90,91,92,0,1,2.1,1.0,1.5.";

    #[test]
    fn test_decodes_sixteen_field_line() {
        let lines = vec![data_line(4, GOOD)];
        let (table, stats) = decode_data(&lines, &CalibrationSet::default()).unwrap();

        assert_eq!(stats.accepted, 1);
        let rec = table.get(4).unwrap();
        assert_eq!(rec.count, 17.0);
        assert!((rec.u - 0.1).abs() < 1e-12);
        assert!((rec.v + 0.2).abs() < 1e-12);
        assert!((rec.w - 0.03).abs() < 1e-12);
        assert_eq!(rec.ph_raw_voltage, 2.1);
        assert_eq!(rec.do_raw_voltage, 1.5);
        assert!(rec.ph.is_none());
        assert!(rec.time.is_none());
    }

    #[test]
    fn test_applies_temperature_and_oxygen_calibration() {
        let cal = CalibrationSet::default();
        let lines = vec![data_line(0, GOOD)];
        let (table, _) = decode_data(&lines, &cal).unwrap();
        let rec = table.get(0).unwrap();

        let temp = cal.temperature.to_celsius(1.0);
        assert_eq!(rec.temperature, temp);
        assert_eq!(rec.do_percent, cal.oxygen.to_percent_saturation(1.5, temp));
    }

    #[test]
    fn test_terminator_is_optional() {
        let without = GOOD.trim_end_matches('.');
        let lines = vec![data_line(0, GOOD), data_line(1, without)];
        let (table, _) = decode_data(&lines, &CalibrationSet::default()).unwrap();
        let with_terminator = table.get(0).unwrap();
        let without_terminator = table.get(1).unwrap();
        assert_eq!(with_terminator.do_raw_voltage, 1.5);
        assert_eq!(without_terminator.do_raw_voltage, 1.5);
        assert_eq!(with_terminator.do_percent, without_terminator.do_percent);
    }

    #[test]
    fn test_wrong_width_is_dropped_and_counted() {
        let lines = vec![
            data_line(0, "D:1,2,3"),
            data_line(1, GOOD),
            data_line(2, "D:17,10.5,100,-200,30,120,121,122,90,91,92,0,1,2.1,1.0,1.5,9"),
        ];
        let (table, stats) = decode_data(&lines, &CalibrationSet::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get(1).is_some());
        assert_eq!(stats.wrong_width, 2);
        assert_eq!(stats.lines_seen, 3);
    }

    #[test]
    fn test_non_numeric_field_is_dropped() {
        let lines = vec![
            data_line(0, "D:17,10.5,xx,-200,30,120,121,122,90,91,92,0,1,2.1,1.0,1.5"),
            data_line(1, GOOD),
        ];
        let (table, stats) = decode_data(&lines, &CalibrationSet::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(stats.unparseable, 1);
    }

    #[test]
    fn test_empty_result_is_decode_error() {
        let lines = vec![data_line(0, "D:1,2,3.")];
        let err = decode_data(&lines, &CalibrationSet::default()).unwrap_err();
        assert!(matches!(
            err,
            DaqError::Decode {
                class: RecordClass::Data,
                lines_seen: 1
            }
        ));
    }
}
