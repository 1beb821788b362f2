//! Time reconstruction for data records.
//!
//! Data lines carry no timestamp, only a narrow sample counter that wraps below 256 and
//! is occasionally corrupt. Absolute time arrives with the sparse status records. The
//! reconstructor walks consecutive pairs of status anchors and dead-reckons a time for
//! every data record between them:
//!
//! 1. The data record immediately after the anchor (`anchor.index + 1`) gets the anchor
//!    clock. Its counter becomes the segment's reference count. If there is no data
//!    record at that index, the segment is skipped entirely.
//! 2. Every later record up to the next anchor advances one time step.
//! 3. When the counter is above the reference, the record is pushed forward by the
//!    counter difference, which accounts for samples missing from the log.
//! 4. When the counter is below the reference, the counter has wrapped. The reference
//!    becomes the current count and the record is placed one step past the running time.
//! 5. Counters at or above the corrupt threshold leave the record untimed and do not
//!    touch the running state.
//!
//! After all segments, data and status rows outside the plausible window are cleared.
//!
//! A negative counter difference or a timestamp that fails to advance is an invariant
//! violation and aborts the run with the segment and record that triggered it.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TimingConfig;
use crate::error::{AppResult, DaqError};
use crate::records::{DataTable, StatusRecord, StatusTable};

const NANOS_PER_SECOND: f64 = 1e9;

/// Which status clock seeds each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorClock {
    /// Logger wall clock (`time`).
    Primary,
    /// Velocimeter clock (`time_aux`).
    #[default]
    Auxiliary,
}

impl AnchorClock {
    /// Reads the selected clock from a status record.
    pub fn read(self, record: &StatusRecord) -> Option<NaiveDateTime> {
        match self {
            AnchorClock::Primary => record.time,
            AnchorClock::Auxiliary => record.time_aux,
        }
    }
}

/// How the sample counter is used between anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterPolicy {
    /// Correct the nominal step with counter differences and handle wraps.
    #[default]
    Track,
    /// Advance exactly one step per record and never read the counter.
    Ignore,
}

/// Parameters for one reconstruction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionParams {
    /// Nominal sample rate in Hz.
    pub sampling_frequency_hz: f64,
    /// Clock used to seed segments.
    pub anchor_clock: AnchorClock,
    /// Counter handling.
    pub counter_policy: CounterPolicy,
    /// Counter values at or above this are corrupt.
    pub corrupt_count_threshold: f64,
    /// Earliest plausible time.
    pub low_time_cutoff: NaiveDateTime,
    /// Latest plausible time.
    pub high_time_cutoff: NaiveDateTime,
}

impl ReconstructionParams {
    /// Builds parameters from configuration, with `high_time_cutoff` resolved by the caller.
    pub fn from_config(config: &TimingConfig, high_time_cutoff: NaiveDateTime) -> Self {
        Self {
            sampling_frequency_hz: config.sampling_frequency_hz,
            anchor_clock: config.anchor_clock,
            counter_policy: config.counter_policy,
            corrupt_count_threshold: config.corrupt_count_threshold,
            low_time_cutoff: config.low_time_cutoff,
            high_time_cutoff,
        }
    }

    fn in_window(&self, time: NaiveDateTime) -> bool {
        time >= self.low_time_cutoff && time <= self.high_time_cutoff
    }
}

/// Counts kept by the reconstructor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconstructionStats {
    /// Anchor pairs visited.
    pub segments: usize,
    /// Segments that produced at least the seed time.
    pub seeded_segments: usize,
    /// Segments whose anchor clock was unset.
    pub unanchored_segments: usize,
    /// Segments with no data record right after the anchor.
    pub segments_without_data: usize,
    /// Data records that received a time.
    pub timed_records: usize,
    /// Records skipped for a corrupt counter.
    pub corrupt_counter: usize,
    /// Counter wraps observed.
    pub wraps: usize,
    /// Data records cleared by the plausible window.
    pub outside_window_data: usize,
    /// Status records cleared by the plausible window.
    pub outside_window_status: usize,
}

/// Outcome of feeding one counter value to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tick {
    Corrupt,
    Counted(NaiveDateTime),
    Wrapped(NaiveDateTime),
}

/// Running state inside one anchor-to-anchor segment.
#[derive(Debug, Clone)]
struct SegmentCursor {
    segment: usize,
    step_nanos: i64,
    new_time: NaiveDateTime,
    /// Counter of the seed record; fixed for the life of the segment.
    segment_start_count: f64,
    /// Counter observed at the most recent wrap, if any.
    wrap_reference: Option<f64>,
}

impl SegmentCursor {
    fn new(segment: usize, seed_time: NaiveDateTime, seed_count: f64, step_nanos: i64) -> Self {
        Self {
            segment,
            step_nanos,
            new_time: seed_time,
            segment_start_count: seed_count,
            wrap_reference: None,
        }
    }

    /// Count that deltas are measured against.
    fn reference_count(&self) -> f64 {
        self.wrap_reference.unwrap_or(self.segment_start_count)
    }

    /// Advances the running time by one nominal step.
    fn tick(&mut self, index: usize) -> AppResult<NaiveDateTime> {
        self.new_time = shift(self.new_time, self.step_nanos, 1.0, self.segment, index)?;
        Ok(self.new_time)
    }

    fn advance(&mut self, index: usize, count_in: f64, threshold: f64) -> AppResult<Tick> {
        if count_in.is_nan() || count_in >= threshold {
            return Ok(Tick::Corrupt);
        }

        self.tick(index)?;

        let reference = self.reference_count();
        if count_in > reference {
            let delta = counter_delta(self.segment, index, count_in, reference)?;
            self.new_time = shift(self.new_time, self.step_nanos, delta, self.segment, index)?;
            Ok(Tick::Counted(self.new_time))
        } else if count_in < reference {
            self.wrap_reference = Some(count_in);
            // Measured against the post-wrap reference, so always zero.
            let wrap_delta = counter_delta(self.segment, index, count_in, self.reference_count())?;
            let wrapped = shift(
                self.new_time,
                self.step_nanos,
                wrap_delta + 1.0,
                self.segment,
                index,
            )?;
            ensure_advances(self.segment, index, self.new_time, wrapped)?;
            Ok(Tick::Wrapped(wrapped))
        } else {
            Ok(Tick::Counted(self.new_time))
        }
    }
}

/// Counter difference against a reference. Negative differences are invariant violations.
pub fn counter_delta(segment: usize, index: usize, count_in: f64, reference: f64) -> AppResult<f64> {
    let delta = count_in - reference;
    if delta < 0.0 {
        return Err(DaqError::NegativeCounterDelta {
            segment,
            index,
            count_in,
            reference,
        });
    }
    Ok(delta)
}

/// Requires `next` to lie strictly after `previous`.
pub fn ensure_advances(
    segment: usize,
    index: usize,
    previous: NaiveDateTime,
    next: NaiveDateTime,
) -> AppResult<()> {
    if next <= previous {
        return Err(DaqError::NonMonotonicTime {
            segment,
            index,
            previous,
            next,
        });
    }
    Ok(())
}

/// Checks that the times assigned within a segment never decrease.
///
/// `assigned` holds `(index, time)` pairs in index order.
pub fn verify_monotonic(segment: usize, assigned: &[(usize, NaiveDateTime)]) -> AppResult<()> {
    for pair in assigned.windows(2) {
        let (_, previous) = pair[0];
        let (index, next) = pair[1];
        if next < previous {
            return Err(DaqError::NonMonotonicTime {
                segment,
                index,
                previous,
                next,
            });
        }
    }
    Ok(())
}

fn shift(
    time: NaiveDateTime,
    step_nanos: i64,
    steps: f64,
    segment: usize,
    index: usize,
) -> AppResult<NaiveDateTime> {
    let nanos = (step_nanos as f64 * steps).round() as i64;
    time.checked_add_signed(TimeDelta::nanoseconds(nanos))
        .ok_or_else(|| {
            DaqError::Processing(format!(
                "Time overflow in segment anchored at line {segment}, record {index}"
            ))
        })
}

/// Rebuilds absolute time for data records from status anchors.
#[derive(Debug, Clone)]
pub struct TimeReconstructor {
    params: ReconstructionParams,
    step_nanos: i64,
}

impl TimeReconstructor {
    /// Creates a reconstructor, rejecting a non-positive sampling frequency.
    pub fn new(params: ReconstructionParams) -> AppResult<Self> {
        let hz = params.sampling_frequency_hz;
        if !hz.is_finite() || hz <= 0.0 {
            return Err(DaqError::Configuration(format!(
                "sampling_frequency_hz must be positive and finite, got {hz}"
            )));
        }
        let step_nanos = (NANOS_PER_SECOND / hz).round() as i64;
        if step_nanos <= 0 {
            return Err(DaqError::Configuration(format!(
                "sampling_frequency_hz {hz} gives a sub-nanosecond time step"
            )));
        }
        Ok(Self { params, step_nanos })
    }

    /// Duration of one counter tick.
    pub fn time_step(&self) -> TimeDelta {
        TimeDelta::nanoseconds(self.step_nanos)
    }

    /// Parameters of this reconstructor.
    pub fn params(&self) -> &ReconstructionParams {
        &self.params
    }

    /// Assigns times to `data` from the anchors in `status`, then clears data and status
    /// rows outside the plausible window.
    pub fn reconstruct(
        &self,
        data: &mut DataTable,
        status: &mut StatusTable,
    ) -> AppResult<ReconstructionStats> {
        let mut stats = ReconstructionStats::default();

        for anchors in status.records().windows(2) {
            let (anchor, next) = (&anchors[0], &anchors[1]);
            stats.segments += 1;
            self.reconstruct_segment(anchor, next.index, data, &mut stats)?;
        }

        self.apply_window(data, status, &mut stats);

        info!(
            segments = stats.segments,
            seeded = stats.seeded_segments,
            timed = stats.timed_records,
            corrupt = stats.corrupt_counter,
            wraps = stats.wraps,
            "Reconstructed data times"
        );
        Ok(stats)
    }

    fn reconstruct_segment(
        &self,
        anchor: &StatusRecord,
        end: usize,
        data: &mut DataTable,
        stats: &mut ReconstructionStats,
    ) -> AppResult<()> {
        let segment = anchor.index;
        let seed_index = segment + 1;

        let Some(seed) = data.get_mut(seed_index) else {
            stats.segments_without_data += 1;
            return Ok(());
        };
        let Some(seed_time) = self.params.anchor_clock.read(anchor) else {
            warn!(segment, "Anchor clock unset, segment left untimed");
            stats.unanchored_segments += 1;
            return Ok(());
        };

        seed.time = Some(seed_time);
        let mut cursor = SegmentCursor::new(segment, seed_time, seed.count, self.step_nanos);
        let mut assigned = vec![(seed_index, seed_time)];

        let first = seed_index + 1;
        for (&index, record) in data.range_mut(first..end.max(first)) {
            let time = match self.params.counter_policy {
                CounterPolicy::Ignore => Some(cursor.tick(index)?),
                CounterPolicy::Track => {
                    match cursor.advance(index, record.count, self.params.corrupt_count_threshold)? {
                        Tick::Corrupt => {
                            stats.corrupt_counter += 1;
                            None
                        }
                        Tick::Counted(time) => Some(time),
                        Tick::Wrapped(time) => {
                            stats.wraps += 1;
                            Some(time)
                        }
                    }
                }
            };
            record.time = time;
            if let Some(time) = time {
                assigned.push((index, time));
            }
        }

        verify_monotonic(segment, &assigned)?;

        debug!(
            segment,
            records = assigned.len(),
            end,
            "Segment reconstructed"
        );
        stats.seeded_segments += 1;
        stats.timed_records += assigned.len();
        Ok(())
    }

    fn apply_window(
        &self,
        data: &mut DataTable,
        status: &mut StatusTable,
        stats: &mut ReconstructionStats,
    ) {
        for record in data.iter_mut() {
            if let Some(time) = record.time {
                if !self.params.in_window(time) {
                    record.time = None;
                    stats.outside_window_data += 1;
                }
            }
        }

        for record in status.iter_mut() {
            let outside = [record.time, record.time_aux]
                .into_iter()
                .flatten()
                .any(|time| !self.params.in_window(time));
            if outside {
                record.unset_times();
                stats.outside_window_status += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationSet;
    use crate::records::{DataRecord, DateTuple};
    use chrono::NaiveDate;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 7, 14)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    fn params() -> ReconstructionParams {
        ReconstructionParams {
            sampling_frequency_hz: 16.0,
            anchor_clock: AnchorClock::Auxiliary,
            counter_policy: CounterPolicy::Track,
            corrupt_count_threshold: 256.0,
            low_time_cutoff: NaiveDate::from_ymd_opt(2022, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap(),
            high_time_cutoff: NaiveDate::from_ymd_opt(2025, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap(),
        }
    }

    fn steps(n: i64) -> TimeDelta {
        TimeDelta::nanoseconds(62_500_000 * n)
    }

    fn record(index: usize, count: f64) -> DataRecord {
        let mut raw = [0.0; 16];
        raw[0] = count;
        raw[14] = 1.0;
        raw[15] = 1.5;
        DataRecord::from_raw(index, &raw, &CalibrationSet::default())
    }

    fn anchor(index: usize, time_aux: Option<NaiveDateTime>) -> StatusRecord {
        let tuple = DateTuple {
            year: 2023.0,
            month: 7.0,
            day: 14.0,
            hour: 12.0,
            minute: 0.0,
            second: 0.0,
        };
        StatusRecord {
            index,
            primary: tuple,
            device: tuple,
            battery_voltage: 12.0,
            sound_speed: 1500.0,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
            temp2: 10.0,
            time: time_aux.map(|t| t - TimeDelta::seconds(2)),
            time_aux,
        }
    }

    fn run(
        counts: &[(usize, f64)],
        anchors: Vec<StatusRecord>,
        params: ReconstructionParams,
    ) -> AppResult<(DataTable, StatusTable, ReconstructionStats)> {
        let mut data: DataTable = counts.iter().map(|&(i, c)| record(i, c)).collect();
        let mut status = StatusTable::from_records(anchors);
        let stats = TimeReconstructor::new(params)?.reconstruct(&mut data, &mut status)?;
        Ok((data, status, stats))
    }

    fn time_at(data: &DataTable, index: usize) -> Option<NaiveDateTime> {
        data.get(index).and_then(|r| r.time)
    }

    #[test]
    fn test_time_step_is_one_over_frequency() {
        let rec = TimeReconstructor::new(params()).unwrap();
        assert_eq!(rec.time_step(), TimeDelta::milliseconds(62) + TimeDelta::microseconds(500));
    }

    #[test]
    fn test_counter_advance_adds_step_and_delta() {
        let (data, _, stats) = run(
            &[(6, 100.0), (7, 101.0), (8, 102.0)],
            vec![anchor(5, Some(t0())), anchor(20, Some(t0()))],
            params(),
        )
        .unwrap();

        assert_eq!(time_at(&data, 6), Some(t0()));
        assert_eq!(time_at(&data, 7), Some(t0() + steps(2)));
        assert_eq!(time_at(&data, 8), Some(t0() + steps(5)));
        assert_eq!(stats.timed_records, 3);
        assert_eq!(stats.seeded_segments, 1);
    }

    #[test]
    fn test_counter_wrap_advances_one_step() {
        let (data, _, stats) = run(
            &[(1, 10.0), (2, 11.0), (3, 12.0), (4, 3.0), (5, 4.0)],
            vec![anchor(0, Some(t0())), anchor(10, Some(t0()))],
            params(),
        )
        .unwrap();

        let at_12 = time_at(&data, 3).unwrap();
        let at_wrap = time_at(&data, 4).unwrap();
        assert_eq!(at_12, t0() + steps(5));
        // Unconditional step plus one wrap step.
        assert_eq!(at_wrap, at_12 + steps(2));
        assert!(at_wrap > at_12);
        // After the wrap, deltas are measured from the wrapped count.
        assert_eq!(time_at(&data, 5), Some(t0() + steps(8)));
        assert_eq!(stats.wraps, 1);
    }

    #[test]
    fn test_equal_count_advances_single_step() {
        let (data, _, _) = run(
            &[(1, 50.0), (2, 50.0), (3, 50.0)],
            vec![anchor(0, Some(t0())), anchor(4, Some(t0()))],
            params(),
        )
        .unwrap();
        assert_eq!(time_at(&data, 2), Some(t0() + steps(1)));
        assert_eq!(time_at(&data, 3), Some(t0() + steps(2)));
    }

    #[test]
    fn test_corrupt_counter_is_skipped_without_perturbing_state() {
        let (data, _, stats) = run(
            &[(1, 10.0), (2, 11.0), (3, 300.0), (4, 12.0)],
            vec![anchor(0, Some(t0())), anchor(10, Some(t0()))],
            params(),
        )
        .unwrap();

        assert_eq!(time_at(&data, 3), None);
        assert_eq!(time_at(&data, 2), Some(t0() + steps(2)));
        // Same as if record 3 had never existed.
        assert_eq!(time_at(&data, 4), Some(t0() + steps(5)));
        assert_eq!(stats.corrupt_counter, 1);
    }

    #[test]
    fn test_counter_256_is_corrupt() {
        let (data, _, _) = run(
            &[(1, 10.0), (2, 256.0), (3, 255.0)],
            vec![anchor(0, Some(t0())), anchor(10, Some(t0()))],
            params(),
        )
        .unwrap();
        assert_eq!(time_at(&data, 2), None);
        assert!(time_at(&data, 3).is_some());
    }

    #[test]
    fn test_anchor_without_following_data_is_skipped() {
        let (data, _, stats) = run(
            &[(3, 10.0), (4, 11.0)],
            vec![anchor(0, Some(t0())), anchor(8, Some(t0()))],
            params(),
        )
        .unwrap();
        assert_eq!(time_at(&data, 3), None);
        assert_eq!(time_at(&data, 4), None);
        assert_eq!(stats.segments_without_data, 1);
    }

    #[test]
    fn test_segment_stops_before_next_anchor() {
        let (data, _, _) = run(
            &[(1, 10.0), (2, 11.0), (4, 12.0), (5, 13.0)],
            vec![
                anchor(0, Some(t0())),
                anchor(3, Some(t0() + TimeDelta::seconds(60))),
                anchor(9, Some(t0())),
            ],
            params(),
        )
        .unwrap();
        assert_eq!(time_at(&data, 2), Some(t0() + steps(2)));
        // Second segment re-seeds from its own anchor.
        assert_eq!(time_at(&data, 4), Some(t0() + TimeDelta::seconds(60)));
        assert_eq!(
            time_at(&data, 5),
            Some(t0() + TimeDelta::seconds(60) + steps(2))
        );
    }

    #[test]
    fn test_last_anchor_contributes_nothing() {
        let (data, _, stats) = run(
            &[(1, 10.0), (6, 11.0), (7, 12.0)],
            vec![anchor(0, Some(t0())), anchor(5, Some(t0()))],
            params(),
        )
        .unwrap();
        assert!(time_at(&data, 1).is_some());
        assert_eq!(time_at(&data, 6), None);
        assert_eq!(time_at(&data, 7), None);
        assert_eq!(stats.segments, 1);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_unset_anchor_clock_leaves_segment_untimed() {
        let (data, _, stats) = run(
            &[(1, 10.0), (2, 11.0)],
            vec![anchor(0, None), anchor(5, Some(t0()))],
            params(),
        )
        .unwrap();
        assert_eq!(time_at(&data, 1), None);
        assert_eq!(time_at(&data, 2), None);
        assert_eq!(stats.unanchored_segments, 1);
        assert!(logs_contain("Anchor clock unset"));
    }

    #[test]
    fn test_primary_clock_selection() {
        let mut p = params();
        p.anchor_clock = AnchorClock::Primary;
        let (data, _, _) = run(
            &[(1, 10.0)],
            vec![anchor(0, Some(t0())), anchor(5, Some(t0()))],
            p,
        )
        .unwrap();
        assert_eq!(time_at(&data, 1), Some(t0() - TimeDelta::seconds(2)));
    }

    #[test]
    fn test_ignore_policy_steps_once_per_record() {
        let mut p = params();
        p.counter_policy = CounterPolicy::Ignore;
        let (data, _, stats) = run(
            &[(1, 10.0), (2, 40.0), (3, 300.0), (4, 2.0)],
            vec![anchor(0, Some(t0())), anchor(5, Some(t0()))],
            p,
        )
        .unwrap();
        assert_eq!(time_at(&data, 2), Some(t0() + steps(1)));
        assert_eq!(time_at(&data, 3), Some(t0() + steps(2)));
        assert_eq!(time_at(&data, 4), Some(t0() + steps(3)));
        assert_eq!(stats.corrupt_counter, 0);
    }

    #[test]
    fn test_window_clears_data_and_status() {
        let early = NaiveDate::from_ymd_opt(2021, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let (data, status, stats) = run(
            &[(1, 10.0), (2, 11.0), (6, 10.0)],
            vec![
                anchor(0, Some(early)),
                anchor(5, Some(t0())),
                anchor(9, Some(t0())),
            ],
            params(),
        )
        .unwrap();
        assert_eq!(time_at(&data, 1), None);
        assert_eq!(time_at(&data, 2), None);
        assert_eq!(time_at(&data, 6), Some(t0()));
        assert_eq!(stats.outside_window_data, 2);
        assert!(!status.records()[0].is_timed());
        assert!(status.records()[1].is_timed());
        assert_eq!(stats.outside_window_status, 1);
    }

    #[test]
    fn test_counter_delta_rejects_negative() {
        let err = counter_delta(40, 45, 3.0, 10.0).unwrap_err();
        match err {
            DaqError::NegativeCounterDelta {
                segment,
                index,
                count_in,
                reference,
            } => {
                assert_eq!(segment, 40);
                assert_eq!(index, 45);
                assert_eq!(count_in, 3.0);
                assert_eq!(reference, 10.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(counter_delta(40, 45, 12.0, 10.0).unwrap(), 2.0);
    }

    #[test]
    fn test_ensure_advances_rejects_equal_and_backwards() {
        assert!(ensure_advances(0, 1, t0(), t0() + steps(1)).is_ok());
        assert!(ensure_advances(0, 1, t0(), t0()).is_err());
        let err = ensure_advances(0, 1, t0(), t0() - steps(1)).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_verify_monotonic_flags_decreasing_sequence() {
        let assigned = vec![
            (1, t0()),
            (2, t0() + steps(3)),
            (3, t0() + steps(1)),
        ];
        let err = verify_monotonic(7, &assigned).unwrap_err();
        match err {
            DaqError::NonMonotonicTime { segment, index, .. } => {
                assert_eq!(segment, 7);
                assert_eq!(index, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(verify_monotonic(7, &assigned[..2]).is_ok());
    }

    #[test]
    fn test_segments_are_monotonic_across_many_wraps() {
        let counts: Vec<(usize, f64)> = (1..600)
            .map(|i| (i, ((i * 3) % 256) as f64))
            .collect();
        let (data, _, stats) = run(
            &counts,
            vec![anchor(0, Some(t0())), anchor(600, Some(t0()))],
            params(),
        )
        .unwrap();
        let times: Vec<NaiveDateTime> = data.iter().filter_map(|r| r.time).collect();
        assert_eq!(times.len(), 599);
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
        assert!(stats.wraps > 0);
    }

    #[test]
    fn test_rejects_non_positive_frequency() {
        let mut p = params();
        p.sampling_frequency_hz = 0.0;
        assert!(TimeReconstructor::new(p).is_err());
    }
}
