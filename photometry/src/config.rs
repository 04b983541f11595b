//! Default survey parameters and the photometric exposure configuration
//!
//! All quantities here are plain numbers passed explicitly into each
//! calculation; nothing in this module holds global state.

use std::f64::consts::PI;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{PhotometryError, Result};

/// Default lower bound of the wavelength grid in nanometers
pub const MIN_WAVELENGTH_NM: f64 = 300.0;

/// Default upper bound of the wavelength grid in nanometers
pub const MAX_WAVELENGTH_NM: f64 = 1200.0;

/// Default wavelength grid spacing in nanometers
pub const WAVELENGTH_STEP_NM: f64 = 0.1;

/// Default single exposure time in seconds
pub const EXPOSURE_TIME_S: f64 = 15.0;

/// Default number of exposures per visit
pub const NUM_EXPOSURES: u32 = 2;

/// Default detector gain in electrons per ADU
pub const GAIN: f64 = 2.3;

/// Primary mirror diameter in centimeters
pub const MIRROR_DIAMETER_CM: f64 = 650.0;

/// Default read noise in electrons per pixel per exposure
pub const READ_NOISE: f64 = 5.0;

/// Default dark current in electrons per pixel per second
pub const DARK_CURRENT: f64 = 0.2;

/// Default other noise in electrons per pixel per exposure
pub const OTHER_NOISE: f64 = 4.69;

/// Default plate scale in arcseconds per pixel
pub const PLATE_SCALE: f64 = 0.2;

/// Effective collecting area of the unobstructed primary mirror in cm²
pub fn default_effective_area_cm2() -> f64 {
    PI * (MIRROR_DIAMETER_CM / 2.0).powi(2)
}

/// Survey broadband filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    U,
    G,
    R,
    I,
    Z,
    Y,
}

impl Filter {
    pub const ALL: [Filter; 6] = [
        Filter::U,
        Filter::G,
        Filter::R,
        Filter::I,
        Filter::Z,
        Filter::Y,
    ];

    /// Typical delivered seeing FWHM in arcseconds for this band
    pub fn default_seeing(&self) -> f64 {
        match self {
            Filter::U => 0.77,
            Filter::G => 0.73,
            Filter::R => 0.70,
            Filter::I => 0.67,
            Filter::Z => 0.65,
            Filter::Y => 0.63,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Filter::U => "u",
            Filter::G => "g",
            Filter::R => "r",
            Filter::I => "i",
            Filter::Z => "z",
            Filter::Y => "y",
        };
        write!(f, "{name}")
    }
}

/// Exposure and detector parameters for zeropoint and limiting magnitude calculations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotometricConfig {
    /// Duration of a single exposure
    pub exposure_time: Duration,

    /// Number of exposures combined per visit
    pub num_exposures: u32,

    /// Electrons per ADU; set to 1.0 to work in photoelectrons
    pub gain: f64,

    /// Effective collecting area in cm²
    pub effective_area_cm2: f64,

    /// Read noise in electrons per pixel per exposure
    pub read_noise: f64,

    /// Dark current in electrons per pixel per second
    pub dark_current: f64,

    /// Additional noise in electrons per pixel per exposure
    pub other_noise: f64,

    /// Seeing FWHM in arcseconds
    pub seeing_arcsec: f64,

    /// Plate scale in arcseconds per pixel
    pub plate_scale: f64,
}

impl PhotometricConfig {
    /// Default configuration with the seeing of the given band
    pub fn for_filter(filter: Filter) -> Self {
        Self {
            seeing_arcsec: filter.default_seeing(),
            ..Self::default()
        }
    }

    /// Total integration time across all exposures
    ///
    /// # Errors
    ///
    /// Returns `PhotometryError::InvalidConfig` if the product overflows `Duration`.
    pub fn total_exposure(&self) -> Result<Duration> {
        self.exposure_time
            .checked_mul(self.num_exposures)
            .ok_or_else(|| {
                PhotometryError::InvalidConfig(format!(
                    "{} exposures of {:?} overflow the total exposure time",
                    self.num_exposures, self.exposure_time
                ))
            })
    }

    /// Check that every parameter is physically meaningful
    ///
    /// Exposure time, exposure count, gain, area, seeing and plate scale must
    /// be positive. Noise terms may be zero but not negative.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PhotometryError::InvalidConfig(msg));

        if self.exposure_time.is_zero() {
            return invalid("exposure_time must be positive".to_string());
        }
        if self.num_exposures == 0 {
            return invalid("num_exposures must be at least 1".to_string());
        }
        self.total_exposure()?;
        for (name, value) in [
            ("gain", self.gain),
            ("effective_area_cm2", self.effective_area_cm2),
            ("seeing_arcsec", self.seeing_arcsec),
            ("plate_scale", self.plate_scale),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return invalid(format!("{name} must be positive, got {value}"));
            }
        }
        for (name, value) in [
            ("read_noise", self.read_noise),
            ("dark_current", self.dark_current),
            ("other_noise", self.other_noise),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return invalid(format!("{name} must be non-negative, got {value}"));
            }
        }
        Ok(())
    }

    /// Save to a pretty-printed JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| PhotometryError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| PhotometryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from a JSON file; omitted fields take their default values
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| PhotometryError::MissingFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| PhotometryError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for PhotometricConfig {
    fn default() -> Self {
        Self {
            exposure_time: Duration::from_secs_f64(EXPOSURE_TIME_S),
            num_exposures: NUM_EXPOSURES,
            gain: GAIN,
            effective_area_cm2: default_effective_area_cm2(),
            read_noise: READ_NOISE,
            dark_current: DARK_CURRENT,
            other_noise: OTHER_NOISE,
            seeing_arcsec: Filter::R.default_seeing(),
            plate_scale: PLATE_SCALE,
        }
    }
}
