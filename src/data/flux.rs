//! Spectral eddy-covariance flux.
//!
//! Groups timestamped data records into fixed averaging bins and, for each bin with
//! enough samples, integrates the co-spectrum (real part of the cross spectral density)
//! of two channels over a frequency band. The result is scaled to an hourly flux.
//!
//! The cross spectral density is estimated with Welch's method: Hann-windowed segments
//! of half the bin length with 50% overlap, mean removed per segment, one-sided
//! density scaling.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use num_complex::Complex;
use rustfft::FftPlanner;
use serde::Serialize;
use tracing::debug;

use crate::config::FluxConfig;
use crate::error::{AppResult, DaqError};
use crate::records::DataRecord;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// A physical channel of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChannel {
    /// Pressure.
    Pressure,
    /// East velocity.
    U,
    /// North velocity.
    V,
    /// Vertical velocity.
    W,
    /// Calibrated temperature.
    Temperature,
    /// Dissolved oxygen saturation.
    DoPercent,
    /// Raw pH voltage.
    PhRawVoltage,
    /// Calibrated pH.
    Ph,
}

impl DataChannel {
    /// Value of this channel in a record.
    pub fn value(self, record: &DataRecord) -> Option<f64> {
        match self {
            DataChannel::Pressure => Some(record.pressure),
            DataChannel::U => Some(record.u),
            DataChannel::V => Some(record.v),
            DataChannel::W => Some(record.w),
            DataChannel::Temperature => Some(record.temperature),
            DataChannel::DoPercent => Some(record.do_percent),
            DataChannel::PhRawVoltage => Some(record.ph_raw_voltage),
            DataChannel::Ph => record.ph,
        }
    }
}

impl FromStr for DataChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pressure" => Ok(DataChannel::Pressure),
            "u" => Ok(DataChannel::U),
            "v" => Ok(DataChannel::V),
            "w" => Ok(DataChannel::W),
            "temperature" | "temp" => Ok(DataChannel::Temperature),
            "do_percent" | "do" => Ok(DataChannel::DoPercent),
            "ph_raw_voltage" => Ok(DataChannel::PhRawVoltage),
            "ph" => Ok(DataChannel::Ph),
            other => Err(format!("Unknown data channel '{other}'")),
        }
    }
}

impl fmt::Display for DataChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataChannel::Pressure => "pressure",
            DataChannel::U => "u",
            DataChannel::V => "v",
            DataChannel::W => "w",
            DataChannel::Temperature => "temperature",
            DataChannel::DoPercent => "do_percent",
            DataChannel::PhRawVoltage => "ph_raw_voltage",
            DataChannel::Ph => "ph",
        };
        f.write_str(name)
    }
}

/// Parameters of a flux computation.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxParams {
    /// Sample rate of the data in Hz.
    pub sampling_frequency_hz: f64,
    /// Averaging bin length in minutes.
    pub averaging_minutes: u32,
    /// A bin needs more than this many minutes of samples.
    pub window_minutes: u32,
    /// Lower integration bound in Hz.
    pub low_frequency_hz: f64,
    /// Upper integration bound in Hz.
    pub high_frequency_hz: f64,
}

impl FluxParams {
    /// Builds parameters from configuration.
    pub fn from_config(config: &FluxConfig, sampling_frequency_hz: f64) -> Self {
        Self {
            sampling_frequency_hz,
            averaging_minutes: config.averaging_minutes,
            window_minutes: config.window_minutes,
            low_frequency_hz: config.low_frequency_hz,
            high_frequency_hz: config.high_frequency_hz,
        }
    }

    fn min_samples(&self) -> f64 {
        f64::from(self.window_minutes) * 60.0 * self.sampling_frequency_hz
    }
}

/// Flux for one averaging bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FluxEstimate {
    /// Mean timestamp of the samples in the bin.
    pub time: NaiveDateTime,
    /// Integrated co-spectrum, per hour.
    pub flux: f64,
    /// Samples used.
    pub samples: usize,
}

/// One-sided cross spectral density of `x` and `y` by Welch's method.
///
/// Returns the frequency of each bin and `conj(X) * Y` averaged over segments.
pub fn cross_spectral_density(
    x: &[f64],
    y: &[f64],
    fs: f64,
    nperseg: usize,
) -> AppResult<(Vec<f64>, Vec<Complex<f64>>)> {
    if x.len() != y.len() {
        return Err(DaqError::Processing(format!(
            "CSD inputs differ in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    if nperseg < 2 || nperseg > x.len() {
        return Err(DaqError::Processing(format!(
            "CSD segment length {} invalid for {} samples",
            nperseg,
            x.len()
        )));
    }

    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let n_freqs = nperseg / 2 + 1;

    // Periodic Hann window.
    let window: Vec<f64> = (0..nperseg)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / nperseg as f64).cos())
        .collect();
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(nperseg);

    let windowed = |segment: &[f64]| -> Vec<Complex<f64>> {
        let mean = segment.iter().sum::<f64>() / segment.len() as f64;
        segment
            .iter()
            .zip(window.iter())
            .map(|(&v, &w)| Complex::new((v - mean) * w, 0.0))
            .collect()
    };

    let mut accum = vec![Complex::new(0.0, 0.0); n_freqs];
    let mut segments = 0usize;
    let mut start = 0usize;
    while start + nperseg <= x.len() {
        let mut xs = windowed(&x[start..start + nperseg]);
        let mut ys = windowed(&y[start..start + nperseg]);
        fft.process(&mut xs);
        fft.process(&mut ys);
        for (acc, (xk, yk)) in accum.iter_mut().zip(xs.iter().zip(ys.iter())) {
            *acc += xk.conj() * yk;
        }
        segments += 1;
        start += step;
    }

    let last = n_freqs - 1;
    let density: Vec<Complex<f64>> = accum
        .into_iter()
        .enumerate()
        .map(|(k, sum)| {
            let one_sided = if k == 0 || (nperseg % 2 == 0 && k == last) {
                1.0
            } else {
                2.0
            };
            sum * (scale * one_sided / segments as f64)
        })
        .collect();
    let freqs = (0..n_freqs)
        .map(|k| k as f64 * fs / nperseg as f64)
        .collect();

    debug!(nperseg, segments, "Computed cross spectral density");
    Ok((freqs, density))
}

/// Trapezoidal integral of the real part of `density` over `[low, high]`.
pub fn integrate_band(freqs: &[f64], density: &[Complex<f64>], low: f64, high: f64) -> f64 {
    let band: Vec<(f64, f64)> = freqs
        .iter()
        .zip(density.iter())
        .filter(|&(&f, _)| f >= low && f <= high)
        .map(|(&f, d)| (f, d.re))
        .collect();
    band.windows(2)
        .map(|pair| {
            let ((f0, y0), (f1, y1)) = (pair[0], pair[1]);
            0.5 * (y0 + y1) * (f1 - f0)
        })
        .sum()
}

/// Hourly co-spectral flux between two channels, one estimate per averaging bin.
///
/// Records without a time, or with a non-finite value in either channel, are ignored.
/// Bins are aligned to multiples of the averaging length since the Unix epoch.
pub fn spectral_flux(
    records: &[DataRecord],
    x: DataChannel,
    y: DataChannel,
    params: &FluxParams,
) -> AppResult<Vec<FluxEstimate>> {
    if !(params.sampling_frequency_hz > 0.0) || params.averaging_minutes == 0 {
        return Err(DaqError::Processing(
            "Flux needs a positive sampling frequency and averaging length".to_string(),
        ));
    }
    let bin_seconds = i64::from(params.averaging_minutes) * 60;

    let mut bins: BTreeMap<i64, Vec<(NaiveDateTime, f64, f64)>> = BTreeMap::new();
    for record in records {
        let (Some(time), Some(xv), Some(yv)) = (record.time, x.value(record), y.value(record))
        else {
            continue;
        };
        if !xv.is_finite() || !yv.is_finite() {
            continue;
        }
        let key = time.and_utc().timestamp().div_euclid(bin_seconds);
        bins.entry(key).or_default().push((time, xv, yv));
    }

    let mut estimates = Vec::new();
    for (key, mut samples) in bins {
        if samples.len() as f64 <= params.min_samples() {
            debug!(bin = key, samples = samples.len(), "Too few samples for flux");
            continue;
        }
        samples.sort_by_key(|s| s.0);

        let xs: Vec<f64> = samples.iter().map(|s| s.1).collect();
        let ys: Vec<f64> = samples.iter().map(|s| s.2).collect();
        let (freqs, density) =
            cross_spectral_density(&xs, &ys, params.sampling_frequency_hz, samples.len() / 2)?;
        let flux = integrate_band(
            &freqs,
            &density,
            params.low_frequency_hz,
            params.high_frequency_hz,
        ) * SECONDS_PER_HOUR;

        estimates.push(FluxEstimate {
            time: mean_time(&samples),
            flux,
            samples: samples.len(),
        });
    }
    Ok(estimates)
}

fn mean_time(samples: &[(NaiveDateTime, f64, f64)]) -> NaiveDateTime {
    let first = samples[0].0;
    let total: f64 = samples
        .iter()
        .map(|s| (s.0 - first).num_nanoseconds().unwrap_or(0) as f64)
        .sum();
    first + TimeDelta::nanoseconds((total / samples.len() as f64).round() as i64)
}
