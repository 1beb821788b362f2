//! Configuration system using Figment
//!
//! This module provides strongly-typed configuration loading for a parsing run.
//! Configuration is loaded from:
//! 1. a TOML file (base configuration)
//! 2. Environment variables (prefixed with `LECS_DAQ_`, sections separated by `__`)
//!
//! Every field has a default, so an empty or missing file yields a working
//! configuration for a 16 Hz LECS deployment.
//!
//! # Example
//! ```no_run
//! use lecs_daq::config::LecsConfig;
//!
//! let config = LecsConfig::load()?;
//! println!("Sampling at {} Hz", config.timing.sampling_frequency_hz);
//! # Ok::<(), lecs_daq::error::DaqError>(())
//! ```
//!
//! Override a single value from the environment:
//! ```bash
//! LECS_DAQ_TIMING__SAMPLING_FREQUENCY_HZ=32 lecs_daq process raw.txt
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::calibration::{OxygenCoefficients, TemperatureCoefficients};
use crate::error::{AppResult, DaqError};
use crate::timing::{AnchorClock, CounterPolicy};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/lecs_daq.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "LECS_DAQ_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LecsConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Time reconstruction settings
    pub timing: TimingConfig,
    /// Status record plausibility settings
    pub status: StatusConfig,
    /// Calibration coefficients
    pub calibration: CalibrationConfig,
    /// Raw input handling
    pub acquisition: AcquisitionConfig,
    /// Spectral flux settings
    pub flux: FluxConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "LECS DAQ".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Time reconstruction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Nominal data line rate in Hz
    pub sampling_frequency_hz: f64,
    /// Which status clock seeds each segment
    pub anchor_clock: AnchorClock,
    /// Whether the sample counter drives time between anchors
    pub counter_policy: CounterPolicy,
    /// Counter values at or above this are treated as corrupt
    pub corrupt_count_threshold: f64,
    /// Earliest plausible reconstructed time
    pub low_time_cutoff: NaiveDateTime,
    /// Latest plausible reconstructed time (unset = time of processing)
    pub high_time_cutoff: Option<NaiveDateTime>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sampling_frequency_hz: 16.0,
            anchor_clock: AnchorClock::Auxiliary,
            counter_policy: CounterPolicy::Track,
            corrupt_count_threshold: 256.0,
            low_time_cutoff: default_low_time_cutoff(),
            high_time_cutoff: None,
        }
    }
}

fn default_low_time_cutoff() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Status record plausibility configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Earliest accepted calendar year
    pub min_year: i32,
    /// Latest accepted calendar year
    pub max_year: i32,
    /// Added to the device clock's two-digit year
    pub device_year_offset: i32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            min_year: 2022,
            max_year: 2024,
            device_year_offset: 2000,
        }
    }
}

/// Calibration configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Thermistor polynomial
    pub temperature: TemperatureCoefficients,
    /// Optode coefficients
    pub oxygen: OxygenCoefficients,
    /// JSON file with pH regression coefficients
    pub ph_coefficients_path: Option<PathBuf>,
}

/// Raw input configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Leading rows discarded before classification
    pub skip_rows: usize,
    /// Input is an HTML page with one record per table cell
    pub html_table: bool,
}

/// Spectral flux configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluxConfig {
    /// Length of each flux averaging bin in minutes
    pub averaging_minutes: u32,
    /// Minimum data span per bin in minutes
    pub window_minutes: u32,
    /// Lower integration bound in Hz
    pub low_frequency_hz: f64,
    /// Upper integration bound in Hz
    pub high_frequency_hz: f64,
}

impl Default for FluxConfig {
    fn default() -> Self {
        Self {
            averaging_minutes: 60,
            window_minutes: 30,
            low_frequency_hz: 1.0 / (15.0 * 60.0),
            high_frequency_hz: 0.125,
        }
    }
}

impl LecsConfig {
    /// Load configuration from the default path and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment overrides apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: LecsConfig = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Render this configuration as TOML
    pub fn to_toml_string(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| DaqError::Serialization(e.to_string()))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let timing = &self.timing;
        if !timing.sampling_frequency_hz.is_finite() || timing.sampling_frequency_hz <= 0.0 {
            return Err(DaqError::Configuration(format!(
                "sampling_frequency_hz must be positive and finite, got {}",
                timing.sampling_frequency_hz
            )));
        }
        if !(timing.corrupt_count_threshold > 0.0) {
            return Err(DaqError::Configuration(format!(
                "corrupt_count_threshold must be positive, got {}",
                timing.corrupt_count_threshold
            )));
        }
        if let Some(high) = timing.high_time_cutoff {
            if high <= timing.low_time_cutoff {
                return Err(DaqError::Configuration(format!(
                    "high_time_cutoff {} must be after low_time_cutoff {}",
                    high, timing.low_time_cutoff
                )));
            }
        }

        if self.status.min_year > self.status.max_year {
            return Err(DaqError::Configuration(format!(
                "Invalid status year range {}..={}",
                self.status.min_year, self.status.max_year
            )));
        }

        let flux = &self.flux;
        if flux.averaging_minutes == 0 {
            return Err(DaqError::Configuration(
                "flux averaging_minutes must be at least 1".to_string(),
            ));
        }
        if !(flux.low_frequency_hz >= 0.0 && flux.low_frequency_hz < flux.high_frequency_hz) {
            return Err(DaqError::Configuration(format!(
                "Invalid flux band {}..{} Hz",
                flux.low_frequency_hz, flux.high_frequency_hz
            )));
        }

        Ok(())
    }

    /// Latest plausible time, falling back to `now` when no cutoff is configured
    pub fn high_time_cutoff_or(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.timing.high_time_cutoff.unwrap_or(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LecsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.sampling_frequency_hz, 16.0);
        assert_eq!(config.timing.anchor_clock, AnchorClock::Auxiliary);
        assert_eq!(config.timing.counter_policy, CounterPolicy::Track);
        assert_eq!(config.status.min_year, 2022);
        assert_eq!(config.status.max_year, 2024);
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = LecsConfig::default();
        config.application.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_year_range_rejected() {
        let mut config = LecsConfig::default();
        config.status.min_year = 2025;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("year range"));
    }

    #[test]
    fn test_inverted_time_window_rejected() {
        let mut config = LecsConfig::default();
        config.timing.high_time_cutoff = Some(config.timing.low_time_cutoff);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let mut config = LecsConfig::default();
        config.timing.corrupt_count_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_flux_band_rejected() {
        let mut config = LecsConfig::default();
        config.flux.low_frequency_hz = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_high_cutoff_falls_back_to_now() {
        let config = LecsConfig::default();
        let now = NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(config.high_time_cutoff_or(now), now);
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let config = LecsConfig::default();
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("sampling_frequency_hz"));
        let back: LecsConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
