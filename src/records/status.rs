//! Status line decoder.
//!
//! A status line carries two independently sampled clocks followed by housekeeping
//! values:
//!
//! ```text
//! S:hour,minute,second,day,month,year,
//!   minute_dev,second_dev,day_dev,hour_dev,year_dev,month_dev,
//!   battery_voltage,sound_speed,heading,pitch,roll,temp2[,...]
//! ```
//!
//! The first tuple is the logger's wall clock (`time`); the second is the velocimeter's
//! own clock (`time_aux`), with a two-digit year. Only the first [`STATUS_WIDTH`] fields
//! are read and anything after them is ignored.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use super::{parse_fields, ClassifiedLine, RecordClass};
use crate::config::StatusConfig;
use crate::error::{AppResult, DaqError};

/// Column names of a raw status line, in order.
pub const STATUS_FIELD_NAMES: [&str; 18] = [
    "hour",
    "minute",
    "second",
    "day",
    "month",
    "year",
    "minute_device",
    "second_device",
    "day_device",
    "hour_device",
    "year_device",
    "month_device",
    "battery_voltage",
    "sound_speed",
    "heading",
    "pitch",
    "roll",
    "temp2",
];

/// Number of leading fields read from a status line.
pub const STATUS_WIDTH: usize = STATUS_FIELD_NAMES.len();

const NANOS_PER_SECOND: f64 = 1e9;

/// A calendar reading as floats, straight from the log.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateTuple {
    pub year: f64,
    pub month: f64,
    pub day: f64,
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl DateTuple {
    /// Loose plausibility check: year in range, month at most 12, day at most 31.
    ///
    /// Day-of-month is not checked against the month; composition catches that.
    pub fn is_plausible(&self, min_year: i32, max_year: i32) -> bool {
        self.year >= f64::from(min_year)
            && self.year <= f64::from(max_year)
            && self.month <= 12.0
            && self.day <= 31.0
    }

    /// Composes an absolute timestamp. Fractional seconds are kept.
    ///
    /// Returns `None` for non-integral or out-of-range calendar fields.
    pub fn compose(&self) -> Option<NaiveDateTime> {
        let year = whole(self.year)?;
        let month = whole(self.month)?;
        let day = whole(self.day)?;
        let hour = whole(self.hour)?;
        let minute = whole(self.minute)?;
        if !self.second.is_finite() || self.second < 0.0 {
            return None;
        }

        let secs = self.second.trunc();
        let nanos = ((self.second - secs) * NANOS_PER_SECOND).round().min(NANOS_PER_SECOND - 1.0);

        NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, u32::try_from(month).ok()?, u32::try_from(day).ok()?)?
            .and_hms_nano_opt(
                u32::try_from(hour).ok()?,
                u32::try_from(minute).ok()?,
                secs as u32,
                nanos as u32,
            )
    }
}

/// Non-negative integral float as an integer.
fn whole(value: f64) -> Option<i64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// One decoded status record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRecord {
    /// Position of the line in the raw log.
    pub index: usize,
    /// Logger wall clock reading.
    pub primary: DateTuple,
    /// Velocimeter clock reading, year already offset to four digits.
    pub device: DateTuple,
    #[allow(missing_docs)]
    pub battery_voltage: f64,
    #[allow(missing_docs)]
    pub sound_speed: f64,
    #[allow(missing_docs)]
    pub heading: f64,
    #[allow(missing_docs)]
    pub pitch: f64,
    #[allow(missing_docs)]
    pub roll: f64,
    #[allow(missing_docs)]
    pub temp2: f64,
    /// Timestamp composed from the wall clock.
    pub time: Option<NaiveDateTime>,
    /// Timestamp composed from the velocimeter clock.
    pub time_aux: Option<NaiveDateTime>,
}

impl StatusRecord {
    fn from_raw(index: usize, raw: &[f64; STATUS_WIDTH], device_year_offset: f64) -> Self {
        Self {
            index,
            primary: DateTuple {
                hour: raw[0],
                minute: raw[1],
                second: raw[2],
                day: raw[3],
                month: raw[4],
                year: raw[5],
            },
            device: DateTuple {
                minute: raw[6],
                second: raw[7],
                day: raw[8],
                hour: raw[9],
                year: raw[10] + device_year_offset,
                month: raw[11],
            },
            battery_voltage: raw[12],
            sound_speed: raw[13],
            heading: raw[14],
            pitch: raw[15],
            roll: raw[16],
            temp2: raw[17],
            time: None,
            time_aux: None,
        }
    }

    /// Clears both timestamps. The two are always set or unset together.
    pub fn unset_times(&mut self) {
        self.time = None;
        self.time_aux = None;
    }

    /// Whether both timestamps are set.
    pub fn is_timed(&self) -> bool {
        self.time.is_some() && self.time_aux.is_some()
    }
}

/// Status records in original line order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTable {
    records: Vec<StatusRecord>,
}

impl StatusTable {
    /// Builds a table, sorting records by original index.
    pub fn from_records(mut records: Vec<StatusRecord>) -> Self {
        records.sort_by_key(|r| r.index);
        Self { records }
    }

    /// Records in index order.
    pub fn records(&self) -> &[StatusRecord] {
        &self.records
    }

    /// Records in index order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StatusRecord> {
        self.records.iter_mut()
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
    pub fn into_records(self) -> Vec<StatusRecord> {
        self.records
    }
}

/// Counts kept by the status decoder, by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusStats {
    /// Status lines handed to the decoder.
    pub lines_seen: usize,
    /// Records kept (timed or not).
    pub accepted: usize,
    /// Lines with fewer than [`STATUS_WIDTH`] fields.
    pub short_record: usize,
    /// Lines with a non-numeric field among the first [`STATUS_WIDTH`].
    pub unparseable: usize,
    /// Records dropped by the calendar range filter.
    pub out_of_range_calendar: usize,
    /// Records kept with unset times because a date could not be composed.
    pub invalid_calendar: usize,
    /// Records kept with unset times because a clock read later than now.
    pub future_time: usize,
}

/// Decodes status lines and composes their timestamps.
///
/// Records whose clocks fall outside the configured year range are dropped. Records
/// that pass the range check but cannot be composed, or that lie in the future
/// relative to `now`, are kept with both times unset so they still delimit segments.
pub fn decode_status(
    lines: &[ClassifiedLine],
    config: &StatusConfig,
    now: NaiveDateTime,
) -> AppResult<(StatusTable, StatusStats)> {
    let mut stats = StatusStats {
        lines_seen: lines.len(),
        ..StatusStats::default()
    };
    let mut records = Vec::with_capacity(lines.len());

    for line in lines {
        let fields: Vec<&str> = line.payload().split(',').take(STATUS_WIDTH).collect();
        if fields.len() < STATUS_WIDTH {
            debug!(index = line.index, width = fields.len(), "Dropping short status line");
            stats.short_record += 1;
            continue;
        }
        let Some(raw) = parse_fields(fields).and_then(|v| <[f64; STATUS_WIDTH]>::try_from(v).ok())
        else {
            debug!(index = line.index, "Dropping status line with non-numeric field");
            stats.unparseable += 1;
            continue;
        };

        let mut record = StatusRecord::from_raw(line.index, &raw, f64::from(config.device_year_offset));
        if !record.primary.is_plausible(config.min_year, config.max_year)
            || !record.device.is_plausible(config.min_year, config.max_year)
        {
            stats.out_of_range_calendar += 1;
            continue;
        }

        match (record.primary.compose(), record.device.compose()) {
            (Some(time), Some(time_aux)) if time < now && time_aux < now => {
                record.time = Some(time);
                record.time_aux = Some(time_aux);
            }
            (Some(_), Some(_)) => {
                debug!(index = line.index, "Status clock reads in the future");
                stats.future_time += 1;
            }
            _ => {
                debug!(index = line.index, "Status clock does not form a valid date");
                stats.invalid_calendar += 1;
            }
        }

        stats.accepted += 1;
        records.push(record);
    }

    if records.is_empty() {
        return Err(DaqError::Decode {
            class: RecordClass::Status,
            lines_seen: stats.lines_seen,
        });
    }

    info!(
        accepted = stats.accepted,
        out_of_range = stats.out_of_range_calendar,
        invalid = stats.invalid_calendar,
        future = stats.future_time,
        "Decoded status lines"
    );
    Ok((StatusTable::from_records(records), stats))
}
