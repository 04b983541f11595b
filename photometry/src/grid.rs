//! Regular wavelength grids and resampling of curves onto them
//!
//! Every gridded curve in this crate is sampled on an inclusive arithmetic
//! lattice `min + i * step` for `i in 0..len`, with
//! `len = round((max - min) / step) + 1`. Samples are computed by
//! multiplication rather than accumulation, so two grids built from the same
//! parameters always agree bit-for-bit.

use float_cmp::approx_eq;
use log::debug;

use crate::algo::{interp_zero_fill, validate_curve};
use crate::config::{MAX_WAVELENGTH_NM, MIN_WAVELENGTH_NM, WAVELENGTH_STEP_NM};
use crate::error::{PhotometryError, Result};

/// Upper bound on grid size, guards against absurd step/range combinations
const MAX_GRID_SAMPLES: usize = 100_000_000;

/// An inclusive, evenly spaced wavelength lattice in nanometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthGrid {
    min: f64,
    max: f64,
    step: f64,
    len: usize,
}

impl WavelengthGrid {
    /// Create a new grid from its bounds and step
    ///
    /// # Arguments
    ///
    /// * `min` - First wavelength in nanometers, must be positive
    /// * `max` - Last wavelength in nanometers, must exceed `min`
    /// * `step` - Sample spacing in nanometers, must be positive
    ///
    /// # Errors
    ///
    /// Returns `PhotometryError::InvalidGrid` for non-finite values, a
    /// non-positive step, inverted or empty bounds, non-positive wavelengths,
    /// or a step too coarse to place two samples in the range.
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        let invalid = |reason| PhotometryError::InvalidGrid {
            min,
            max,
            step,
            reason,
        };

        if !min.is_finite() || !max.is_finite() || !step.is_finite() {
            return Err(invalid("grid parameters must be finite"));
        }
        if step <= 0.0 {
            return Err(invalid("step must be positive"));
        }
        if max <= min {
            return Err(invalid("max must be greater than min"));
        }
        if min <= 0.0 {
            return Err(invalid("wavelengths must be positive"));
        }

        let intervals = ((max - min) / step).round();
        if intervals < 1.0 {
            return Err(invalid("step is larger than the wavelength range"));
        }
        if intervals >= MAX_GRID_SAMPLES as f64 {
            return Err(invalid("grid has too many samples"));
        }

        Ok(Self {
            min,
            max,
            step,
            len: intervals as usize + 1,
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    /// Requested upper bound; see [`WavelengthGrid::last`] for the final sample
    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of samples on the grid
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false, a valid grid has at least two samples
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Wavelength of sample `index`
    pub fn wavelength(&self, index: usize) -> f64 {
        self.min + index as f64 * self.step
    }

    /// Final lattice point, equal to `max` when `max` lies on the lattice
    pub fn last(&self) -> f64 {
        self.wavelength(self.len - 1)
    }

    /// Build the ordered sequence of grid wavelengths
    pub fn wavelengths(&self) -> Vec<f64> {
        (0..self.len).map(|i| self.wavelength(i)).collect()
    }

    /// Index of the grid sample closest to `wavelength`, clamped to the grid
    pub fn nearest_index(&self, wavelength: f64) -> usize {
        let t = ((wavelength - self.min) / self.step).round();
        if t <= 0.0 {
            0
        } else {
            (t as usize).min(self.len - 1)
        }
    }

    /// Check whether a wavelength array already matches this grid
    ///
    /// True when the lengths agree and every sample lies on the corresponding
    /// lattice point within a tolerance of `1e-9 * step` (or 4 ULPs).
    pub fn is_aligned(&self, wavelengths: &[f64]) -> bool {
        if wavelengths.len() != self.len {
            return false;
        }

        let epsilon = self.step * 1e-9;
        wavelengths
            .iter()
            .enumerate()
            .all(|(i, &w)| approx_eq!(f64, w, self.wavelength(i), epsilon = epsilon, ulps = 4))
    }

    /// Resample a curve onto this grid with zero fill outside its domain
    ///
    /// # Arguments
    ///
    /// * `wavelengths` - Source wavelengths, ascending; a repeated wavelength is a step
    /// * `values` - Source values at each wavelength
    ///
    /// # Returns
    ///
    /// A `(wavelengths, values)` pair sampled on this grid. Grid points
    /// outside the source domain are exactly 0.0.
    ///
    /// # Errors
    ///
    /// Returns `PhotometryError::InvalidCurve` if the source curve fails validation.
    pub fn resample(&self, wavelengths: &[f64], values: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        Ok((self.wavelengths(), self.resample_values(wavelengths, values)?))
    }

    /// Like [`WavelengthGrid::resample`] but returns only the gridded values
    pub fn resample_values(&self, wavelengths: &[f64], values: &[f64]) -> Result<Vec<f64>> {
        validate_curve(wavelengths, values)?;

        if self.is_aligned(wavelengths) {
            debug!("Curve already on grid {self}, copying values");
            return Ok(values.to_vec());
        }

        debug!(
            "Resampling {} samples spanning {}..{} nm onto grid {self}",
            wavelengths.len(),
            wavelengths[0],
            wavelengths[wavelengths.len() - 1]
        );

        Ok((0..self.len)
            .map(|i| interp_zero_fill(self.wavelength(i), wavelengths, values))
            .collect())
    }
}

impl Default for WavelengthGrid {
    /// Standard 300-1200 nm grid with 0.1 nm spacing
    fn default() -> Self {
        let intervals = ((MAX_WAVELENGTH_NM - MIN_WAVELENGTH_NM) / WAVELENGTH_STEP_NM).round();
        Self {
            min: MIN_WAVELENGTH_NM,
            max: MAX_WAVELENGTH_NM,
            step: WAVELENGTH_STEP_NM,
            len: intervals as usize + 1,
        }
    }
}

impl std::fmt::Display for WavelengthGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}] nm step {} ({} samples)",
            self.min,
            self.last(),
            self.step,
            self.len
        )
    }
}

/// Build the wavelength sequence for `min..=max` at `step` spacing
pub fn build_grid(min: f64, max: f64, step: f64) -> Result<Vec<f64>> {
    Ok(WavelengthGrid::new(min, max, step)?.wavelengths())
}
