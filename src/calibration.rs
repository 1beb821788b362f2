//! Sensor calibration formulas.
//!
//! All calibrations are pure functions of their inputs and an explicit coefficient
//! record. Defaults are the RINKO temperature and dissolved-oxygen (sensing film A)
//! coefficients shipped with the instrument.
//!
//! # Example Configuration (`.toml`)
//!
//! ```toml
//! [calibration.temperature]
//! a = -12.19367
//! b = 21.34089
//! c = -3.559172
//! d = 0.6691104
//!
//! [calibration]
//! ph_coefficients_path = "cal/seaphox_ph.json"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppResult, DaqError};

/// Reference temperature of the oxygen film calibration in degrees Celsius.
const OXYGEN_REFERENCE_TEMP_C: f64 = 25.0;

/// Third-order polynomial from thermistor voltage to degrees Celsius.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for TemperatureCoefficients {
    fn default() -> Self {
        Self {
            a: -1.219367e1,
            b: 2.134089e1,
            c: -3.559172e00,
            d: 6.691104e-01,
        }
    }
}

impl TemperatureCoefficients {
    /// Converts a raw temperature voltage to degrees Celsius.
    pub fn to_celsius(&self, volt: f64) -> f64 {
        self.a + self.b * volt + self.c * volt.powi(2) + self.d * volt.powi(3)
    }
}

/// Stern-Volmer style calibration from optode voltage to percent saturation.
///
/// `e` is part of the published coefficient set but does not enter the formula.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OxygenCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub g: f64,
    pub h: f64,
}

impl Default for OxygenCoefficients {
    fn default() -> Self {
        Self {
            a: -4.382235e01,
            b: 1.398755e02,
            c: -4.119456e-01,
            d: 9.934000e-03,
            e: 4.000000e-03,
            f: 4.440000e-05,
            g: 0.000000e+00,
            h: 1.000000e+00,
        }
    }
}

impl OxygenCoefficients {
    /// Converts a raw oxygen voltage at the given temperature to percent saturation.
    pub fn to_percent_saturation(&self, volt: f64, temp_c: f64) -> f64 {
        let temp_term = 1.0 + self.d * (temp_c - OXYGEN_REFERENCE_TEMP_C);
        let p_prime = self.a / temp_term + self.b / ((volt - self.f) * temp_term + self.c + self.f);
        self.g + self.h * p_prime
    }
}

/// Linear regression of pH on raw pH voltage and temperature.
///
/// Loaded from the JSON file written when the regression was fit against a
/// reference sensor:
///
/// ```json
/// { "coef_": [0.52, -0.011], "intercept_": 7.9 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhCalibration {
    /// Coefficients for `[raw_voltage, temperature]`.
    #[serde(rename = "coef_")]
    pub coefficients: Vec<f64>,
    /// Regression intercept.
    #[serde(rename = "intercept_")]
    pub intercept: f64,
}

impl PhCalibration {
    /// Loads and checks a regression coefficient file.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            DaqError::Calibration(format!(
                "Failed to read pH coefficients '{}': {}",
                path.display(),
                e
            ))
        })?;
        let calibration: PhCalibration = serde_json::from_str(&text).map_err(|e| {
            DaqError::Calibration(format!(
                "Invalid pH coefficients '{}': {}",
                path.display(),
                e
            ))
        })?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Requires exactly one coefficient per regressor.
    pub fn validate(&self) -> AppResult<()> {
        if self.coefficients.len() != 2 {
            return Err(DaqError::Calibration(format!(
                "pH regression needs 2 coefficients (raw voltage, temperature), got {}",
                self.coefficients.len()
            )));
        }
        Ok(())
    }

    /// Predicts pH from a raw voltage and a temperature.
    ///
    /// Returns NaN for a regression that fails [`validate`](Self::validate).
    pub fn to_ph(&self, raw_voltage: f64, temp_c: f64) -> f64 {
        match self.coefficients.as_slice() {
            [c_raw, c_temp] => self.intercept + c_raw * raw_voltage + c_temp * temp_c,
            _ => f64::NAN,
        }
    }
}

/// Every calibration applied while decoding data records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationSet {
    /// Thermistor polynomial.
    pub temperature: TemperatureCoefficients,
    /// Optode calibration.
    pub oxygen: OxygenCoefficients,
    /// pH regression, when a coefficient file is configured.
    pub ph: Option<PhCalibration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_temperature_polynomial() {
        let coeffs = TemperatureCoefficients::default();
        assert_eq!(coeffs.to_celsius(0.0), coeffs.a);
        let expected = coeffs.a + coeffs.b + coeffs.c + coeffs.d;
        assert!((coeffs.to_celsius(1.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_temperature_is_deterministic() {
        let coeffs = TemperatureCoefficients::default();
        for volt in [0.0, 0.731, 1.25, 2.5, -0.3] {
            assert_eq!(
                coeffs.to_celsius(volt).to_bits(),
                coeffs.to_celsius(volt).to_bits()
            );
        }
    }

    #[test]
    fn test_oxygen_at_reference_temperature() {
        let coeffs = OxygenCoefficients::default();
        // At 25 C the temperature term is exactly one.
        let volt = 1.5;
        let expected = coeffs.a + coeffs.b / ((volt - coeffs.f) + coeffs.c + coeffs.f);
        let got = coeffs.to_percent_saturation(volt, 25.0);
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_oxygen_uses_g_and_h() {
        let coeffs = OxygenCoefficients {
            g: 2.0,
            h: 0.5,
            ..OxygenCoefficients::default()
        };
        let base = OxygenCoefficients::default().to_percent_saturation(1.2, 12.0);
        let scaled = coeffs.to_percent_saturation(1.2, 12.0);
        assert!((scaled - (2.0 + 0.5 * base)).abs() < 1e-9);
    }

    #[test]
    fn test_ph_load_and_predict() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"coef_": [0.5, -0.01], "intercept_": 7.0}}"#).unwrap();

        let cal = PhCalibration::load(file.path()).unwrap();
        let ph = cal.to_ph(2.0, 10.0);
        assert!((ph - (7.0 + 1.0 - 0.1)).abs() < 1e-12);
    }

    #[test]
    fn test_ph_rejects_wrong_coefficient_count() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"coef_": [0.5], "intercept_": 7.0}}"#).unwrap();

        let err = PhCalibration::load(file.path()).unwrap_err();
        assert!(matches!(err, DaqError::Calibration(_)));
        assert!(err.to_string().contains("2 coefficients"));
    }

    #[test]
    fn test_ph_missing_file() {
        let err = PhCalibration::load("/nonexistent/ph.json").unwrap_err();
        assert!(matches!(err, DaqError::Calibration(_)));
    }
}
