//! Gridded bandpass throughput curves
//!
//! A [`Throughput`] holds the system transmission `sb` sampled on a
//! [`WavelengthGrid`], plus the normalized system response `phi` derived from
//! it. `phi` is memoised: it is computed on first use (or by an explicit call
//! to [`Throughput::derive_normalized_response`]) and discarded by every
//! operation that changes the wavelength or transmission samples.

use std::path::Path;

use log::{debug, info};
use once_cell::sync::OnceCell;
use rayon::prelude::*;

use crate::algo::{neumaier_sum, validate_curve};
use crate::error::{PhotometryError, Result};
use crate::grid::WavelengthGrid;
use crate::io::{read_table, write_table};

/// A bandpass transmission curve on a regular wavelength grid.
///
/// Wavelengths are in nanometers and transmission is a unitless fraction,
/// nominally in `[0, 1]` though this is not enforced.
#[derive(Debug, Clone)]
pub struct Throughput {
    grid: WavelengthGrid,
    wavelength: Vec<f64>,
    transmission: Vec<f64>,
    phi: OnceCell<Vec<f64>>,
}

impl Throughput {
    /// Create a throughput from wavelength/transmission samples
    ///
    /// The samples are copied and resampled onto `grid`; wavelengths outside
    /// the measured range get zero transmission.
    ///
    /// # Errors
    ///
    /// Returns `PhotometryError::InvalidCurve` if the arrays differ in length,
    /// have fewer than 2 samples, or have wavelengths that decrease or span no
    /// range. Repeated wavelengths are allowed and the later row wins there.
    pub fn from_curve(
        wavelength: &[f64],
        transmission: &[f64],
        grid: &WavelengthGrid,
    ) -> Result<Self> {
        let transmission = grid.resample_values(wavelength, transmission)?;
        Ok(Self::on_grid(*grid, transmission))
    }

    /// Create an idealized throughput that passes light at a single wavelength
    ///
    /// Transmission is 1.0 at the grid sample nearest `wavelength_nm` and 0.0
    /// everywhere else. Wavelengths beyond the grid select the closest edge
    /// sample.
    pub fn from_monochromatic(wavelength_nm: f64, grid: &WavelengthGrid) -> Result<Self> {
        if !wavelength_nm.is_finite() {
            return Err(PhotometryError::invalid_curve(
                1,
                1,
                format!("monochromatic wavelength must be finite, got {wavelength_nm}"),
            ));
        }

        let mut transmission = vec![0.0; grid.len()];
        transmission[grid.nearest_index(wavelength_nm)] = 1.0;
        Ok(Self::on_grid(*grid, transmission))
    }

    /// Read a two-column wavelength/transmission table and grid it
    ///
    /// # Errors
    ///
    /// * `PhotometryError::MissingFile` - the file cannot be opened
    /// * `PhotometryError::Parse` - a data line holds non-numeric values
    /// * `PhotometryError::InvalidCurve` - the table does not form a valid curve
    pub fn from_file(path: &Path, grid: &WavelengthGrid) -> Result<Self> {
        let (wavelength, transmission) = read_table(path)?;
        Self::from_curve(&wavelength, &transmission, grid)
    }

    /// Build a system throughput by multiplying component files together
    ///
    /// Starts from unit transmission on `grid` and multiplies in each
    /// component in list order. Files are read in parallel, but the product
    /// is folded sequentially, so the result is identical to a sequential
    /// run and any error reported is that of the first failing path in
    /// list order.
    pub fn from_composed_files<P>(paths: &[P], grid: &WavelengthGrid) -> Result<Self>
    where
        P: AsRef<Path> + Sync,
    {
        let components: Vec<Result<Self>> = paths
            .par_iter()
            .map(|path| Self::from_file(path.as_ref(), grid))
            .collect();

        let mut transmission = vec![1.0; grid.len()];
        for component in components {
            let component = component?;
            for (total, sb) in transmission.iter_mut().zip(&component.transmission) {
                *total *= sb;
            }
        }

        info!("Composed throughput from {} components on {grid}", paths.len());

        Ok(Self::on_grid(*grid, transmission))
    }

    fn on_grid(grid: WavelengthGrid, transmission: Vec<f64>) -> Self {
        Self {
            grid,
            wavelength: grid.wavelengths(),
            transmission,
            phi: OnceCell::new(),
        }
    }

    pub fn grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    /// Wavelength samples in nanometers
    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    /// Transmission (sb) at each wavelength sample
    pub fn transmission(&self) -> &[f64] {
        &self.transmission
    }

    /// Owned copies of the wavelength and transmission arrays
    pub fn curve(&self) -> (Vec<f64>, Vec<f64>) {
        (self.wavelength.clone(), self.transmission.clone())
    }

    /// The normalized response if it has already been derived
    pub fn normalized_response(&self) -> Option<&[f64]> {
        self.phi.get().map(Vec::as_slice)
    }

    /// The normalized response, deriving and caching it if needed
    pub fn phi(&self) -> Result<&[f64]> {
        self.phi
            .get_or_try_init(|| self.compute_normalized_response())
            .map(Vec::as_slice)
    }

    /// Recompute and cache the normalized response `phi`
    ///
    /// `phi[i] = (sb[i] / wavelength[i]) / (step * sum(sb / wavelength))`, so
    /// that `sum(phi) * step == 1`.
    ///
    /// # Errors
    ///
    /// Returns `PhotometryError::DegenerateThroughput` when the transmission is
    /// zero everywhere (or the normalization integral is not finite).
    pub fn derive_normalized_response(&mut self) -> Result<&[f64]> {
        let phi = self.compute_normalized_response()?;
        self.phi = OnceCell::with_value(phi);
        self.phi()
    }

    fn compute_normalized_response(&self) -> Result<Vec<f64>> {
        let unnormalized: Vec<f64> = self
            .transmission
            .iter()
            .zip(&self.wavelength)
            .map(|(sb, w)| sb / w)
            .collect();

        let norm = neumaier_sum(unnormalized.iter().copied()) * self.grid.step();
        if norm == 0.0 {
            return Err(PhotometryError::DegenerateThroughput(
                "transmission is zero at every wavelength",
            ));
        }
        if !norm.is_finite() {
            return Err(PhotometryError::DegenerateThroughput(
                "normalization integral is not finite",
            ));
        }

        Ok(unnormalized.into_iter().map(|p| p / norm).collect())
    }

    /// Replace the curve with new samples resampled onto `grid`
    ///
    /// Clears any cached normalized response. On error `self` is unchanged.
    pub fn set_curve(
        &mut self,
        wavelength: &[f64],
        transmission: &[f64],
        grid: &WavelengthGrid,
    ) -> Result<()> {
        *self = Self::from_curve(wavelength, transmission, grid)?;
        Ok(())
    }

    /// Resample this throughput onto a different grid in place
    ///
    /// Clears the cached normalized response when the grid changes.
    pub fn resample_onto(&mut self, grid: &WavelengthGrid) -> Result<()> {
        if self.grid == *grid {
            return Ok(());
        }
        debug!("Regridding throughput from {} to {grid}", self.grid);
        let transmission = grid.resample_values(&self.wavelength, &self.transmission)?;
        *self = Self::on_grid(*grid, transmission);
        Ok(())
    }

    /// Multiply this throughput by another curve without modifying `self`
    ///
    /// The other curve is resampled onto this throughput's grid (zero fill
    /// outside its domain) unless it is already aligned.
    ///
    /// # Returns
    ///
    /// A new `(wavelength, transmission)` pair on this throughput's grid.
    pub fn multiply_against(
        &self,
        other_wavelength: &[f64],
        other_transmission: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let product: Vec<f64> = if self.grid.is_aligned(other_wavelength) {
            validate_curve(other_wavelength, other_transmission)?;
            self.transmission
                .iter()
                .zip(other_transmission)
                .map(|(a, b)| a * b)
                .collect()
        } else {
            let other = self.grid.resample_values(other_wavelength, other_transmission)?;
            self.transmission
                .iter()
                .zip(&other)
                .map(|(a, b)| a * b)
                .collect()
        };

        Ok((self.wavelength.clone(), product))
    }

    /// Intensity-weighted mean wavelengths of the bandpass
    ///
    /// # Returns
    ///
    /// `(weighted by phi, weighted by sb)`, each
    /// `sum(wavelength * weight) / sum(weight)`.
    pub fn effective_wavelengths(&self) -> Result<(f64, f64)> {
        let phi = self.phi()?;
        let by_phi = weighted_mean(&self.wavelength, phi);
        let by_sb = weighted_mean(&self.wavelength, &self.transmission);

        match (by_phi, by_sb) {
            (Some(by_phi), Some(by_sb)) => Ok((by_phi, by_sb)),
            _ => Err(PhotometryError::DegenerateThroughput(
                "transmission weights sum to zero",
            )),
        }
    }

    /// Write the throughput as a text table
    ///
    /// Columns are wavelength and transmission, followed by phi when
    /// `include_normalized_response` is set (derived first if needed).
    pub fn write(&self, path: &Path, include_normalized_response: bool) -> Result<()> {
        if include_normalized_response {
            let phi = self.phi()?;
            write_table(
                path,
                "Wavelength(nm)  Throughput  Phi",
                &self.wavelength,
                &[&self.transmission, phi],
            )
        } else {
            write_table(
                path,
                "Wavelength(nm)  Throughput",
                &self.wavelength,
                &[&self.transmission],
            )
        }
    }
}

fn weighted_mean(values: &[f64], weights: &[f64]) -> Option<f64> {
    let total = neumaier_sum(weights.iter().copied());
    if total == 0.0 || !total.is_finite() {
        return None;
    }
    Some(neumaier_sum(values.iter().zip(weights).map(|(v, w)| v * w)) / total)
}
