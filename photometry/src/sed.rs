//! Spectral energy distributions observed through a throughput
//!
//! The [`SpectralEnergyDistribution`] trait is the contract the photometric
//! calculator relies on: detector counts and magnitudes of a spectrum through
//! a [`Throughput`], plus construction of fresh flat reference sources.
//! [`GriddedSed`] is the crate's implementation, an F_nu curve in Jansky
//! sampled on a [`WavelengthGrid`].

use std::borrow::Cow;
use std::path::Path;
use std::time::Duration;

use crate::algo::neumaier_sum;
use crate::error::{PhotometryError, Result};
use crate::grid::WavelengthGrid;
use crate::io::read_table;
use crate::throughput::Throughput;

/// Constants in CGS units
pub struct CGS {}

impl CGS {
    /// AB magnitude system zero-point flux density
    /// Units: 3631e-23 erg s⁻¹ cm⁻² Hz⁻¹
    pub const AB_ZERO_POINT_FLUX_DENSITY: f64 = 3631e-23;

    /// 1 Jansky in CGS units
    /// Units: 1e-23 erg s⁻¹ cm⁻² Hz⁻¹
    pub const JANSKY_IN_CGS: f64 = 1e-23;

    /// Planck's constant
    /// Units: 6.62607015e-27 erg⋅s (erg-seconds in CGS)
    pub const PLANCK_CONSTANT: f64 = 6.62607015e-27;
}

/// AB magnitude zero point flux density in Jansky
pub const AB_ZERO_POINT_JANSKY: f64 = CGS::AB_ZERO_POINT_FLUX_DENSITY / CGS::JANSKY_IN_CGS;

/// A source spectrum that can be observed through a throughput.
///
/// Implementations never mutate themselves: rescaling returns a new instance.
pub trait SpectralEnergyDistribution: Sized {
    /// Error type of the implementation; crate errors convert into it so
    /// callers can mix the two with `?`
    type Error: std::error::Error + From<PhotometryError>;

    /// Detector counts (ADU) this spectrum produces through `throughput`
    ///
    /// # Arguments
    ///
    /// * `throughput` - System transmission the light passes through
    /// * `exposure_time` - Integration time
    /// * `effective_area_cm2` - Collecting area in cm²
    /// * `gain` - Electrons per ADU
    fn count_rate(
        &self,
        throughput: &Throughput,
        exposure_time: Duration,
        effective_area_cm2: f64,
        gain: f64,
    ) -> std::result::Result<f64, Self::Error>;

    /// AB magnitude of this spectrum observed through `throughput`
    ///
    /// Uses the throughput's normalized response, deriving it if needed.
    fn magnitude(&self, throughput: &Throughput) -> std::result::Result<f64, Self::Error>;

    /// A copy of this spectrum with its flux multiplied by `factor`
    fn scaled(&self, factor: f64) -> Self;

    /// A new flat-in-frequency reference spectrum
    fn flat_reference(&self) -> Self;

    /// A copy of this spectrum rescaled to produce exactly `target` counts
    ///
    /// # Errors
    ///
    /// Fails with `PhotometryError::InvalidSed` if this spectrum produces zero
    /// or non-finite counts through `throughput`, since no rescaling can fix that.
    fn scaled_to_count_rate(
        &self,
        target: f64,
        throughput: &Throughput,
        exposure_time: Duration,
        effective_area_cm2: f64,
        gain: f64,
    ) -> std::result::Result<Self, Self::Error> {
        let counts = self.count_rate(throughput, exposure_time, effective_area_cm2, gain)?;
        if counts == 0.0 || !counts.is_finite() {
            return Err(PhotometryError::InvalidSed(format!(
                "cannot rescale a spectrum producing {counts} counts to {target}"
            ))
            .into());
        }
        Ok(self.scaled(target / counts))
    }
}

/// A spectrum given as F_nu in Jansky on a regular wavelength grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedSed {
    grid: WavelengthGrid,
    fnu_jansky: Vec<f64>,
}

impl GriddedSed {
    /// Create a spectrum from wavelength/F_nu samples, resampled onto `grid`
    ///
    /// Wavelengths outside the sampled range get zero flux.
    pub fn from_curve(
        wavelength: &[f64],
        fnu_jansky: &[f64],
        grid: &WavelengthGrid,
    ) -> Result<Self> {
        Ok(Self {
            grid: *grid,
            fnu_jansky: grid.resample_values(wavelength, fnu_jansky)?,
        })
    }

    /// Create a spectrum with constant F_nu across the grid
    pub fn flat(grid: &WavelengthGrid, fnu_jansky: f64) -> Self {
        Self {
            grid: *grid,
            fnu_jansky: vec![fnu_jansky; grid.len()],
        }
    }

    /// Create a flat spectrum with the given AB magnitude
    ///
    /// F_ν = 3631 Jy × 10^(-0.4 × AB)
    pub fn from_ab_magnitude(grid: &WavelengthGrid, ab_mag: f64) -> Self {
        Self::flat(grid, AB_ZERO_POINT_JANSKY * 10f64.powf(-0.4 * ab_mag))
    }

    /// Read a two-column wavelength (nm) / F_nu (Jy) table
    pub fn from_file(path: &Path, grid: &WavelengthGrid) -> Result<Self> {
        let (wavelength, fnu) = read_table(path)?;
        Self::from_curve(&wavelength, &fnu, grid)
    }

    pub fn grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    /// F_nu in Jansky at each grid sample
    pub fn fnu(&self) -> &[f64] {
        &self.fnu_jansky
    }

    // F_nu sampled on the throughput's grid
    fn fnu_on(&self, throughput: &Throughput) -> Result<Cow<'_, [f64]>> {
        if self.grid == *throughput.grid() {
            Ok(Cow::Borrowed(&self.fnu_jansky))
        } else {
            let wavelength = self.grid.wavelengths();
            Ok(Cow::Owned(
                throughput
                    .grid()
                    .resample_values(&wavelength, &self.fnu_jansky)?,
            ))
        }
    }
}

impl SpectralEnergyDistribution for GriddedSed {
    type Error = PhotometryError;

    fn count_rate(
        &self,
        throughput: &Throughput,
        exposure_time: Duration,
        effective_area_cm2: f64,
        gain: f64,
    ) -> Result<f64> {
        if gain <= 0.0 || !gain.is_finite() {
            return Err(PhotometryError::InvalidConfig(format!(
                "gain must be positive, got {gain}"
            )));
        }

        let fnu = self.fnu_on(throughput)?;

        // Photons per unit ln(λ): F_ν / h. The nm units of dλ and λ cancel.
        let photons_per_cm2_s = neumaier_sum(
            fnu.iter()
                .zip(throughput.transmission())
                .zip(throughput.wavelength())
                .map(|((f, sb), w)| f * sb / w),
        ) * throughput.grid().step()
            * CGS::JANSKY_IN_CGS
            / CGS::PLANCK_CONSTANT;

        Ok(photons_per_cm2_s * exposure_time.as_secs_f64() * effective_area_cm2 / gain)
    }

    fn magnitude(&self, throughput: &Throughput) -> Result<f64> {
        let phi = throughput.phi()?;
        let fnu = self.fnu_on(throughput)?;

        let flux = neumaier_sum(fnu.iter().zip(phi).map(|(f, p)| f * p)) * throughput.grid().step();
        if flux <= 0.0 || !flux.is_finite() {
            return Err(PhotometryError::InvalidSed(format!(
                "band-averaged flux must be positive to define a magnitude, got {flux} Jy"
            )));
        }

        Ok(-2.5 * (flux / AB_ZERO_POINT_JANSKY).log10())
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            grid: self.grid,
            fnu_jansky: self.fnu_jansky.iter().map(|f| f * factor).collect(),
        }
    }

    fn flat_reference(&self) -> Self {
        Self::flat(&self.grid, AB_ZERO_POINT_JANSKY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_throughput(grid: &WavelengthGrid) -> Throughput {
        Throughput::from_curve(&[grid.min(), grid.last()], &[1.0, 1.0], grid).unwrap()
    }

    #[test]
    fn test_ab_zero_point() {
        assert_relative_eq!(AB_ZERO_POINT_JANSKY, 3631.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_reference_is_magnitude_zero() {
        let grid = WavelengthGrid::new(400.0, 700.0, 0.5).unwrap();
        let band = Throughput::from_curve(&[450.0, 550.0, 650.0], &[0.0, 1.0, 0.0], &grid).unwrap();
        let reference = GriddedSed::flat(&grid, 1.0).flat_reference();

        assert_relative_eq!(reference.magnitude(&band).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ab_magnitude_round_trip() {
        let grid = WavelengthGrid::new(300.0, 1200.0, 0.1).unwrap();
        let band = unit_throughput(&grid);
        for mag in [-1.0, 0.0, 12.5, 24.0] {
            let sed = GriddedSed::from_ab_magnitude(&grid, mag);
            assert_relative_eq!(sed.magnitude(&band).unwrap(), mag, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_count_rate_matches_analytic_flat_source() {
        // ∫ dλ/λ over [300, 1200] is ln(4)
        let grid = WavelengthGrid::new(300.0, 1200.0, 0.1).unwrap();
        let band = unit_throughput(&grid);
        let sed = GriddedSed::flat(&grid, 1.0);

        let counts = sed
            .count_rate(&band, Duration::from_secs(1), 1.0, 1.0)
            .unwrap();
        let expected = CGS::JANSKY_IN_CGS / CGS::PLANCK_CONSTANT * 4f64.ln();
        assert_relative_eq!(counts, expected, max_relative = 1e-3);
    }

    #[test]
    fn test_count_rate_scales_linearly() {
        let grid = WavelengthGrid::new(300.0, 1200.0, 1.0).unwrap();
        let band = unit_throughput(&grid);
        let sed = GriddedSed::flat(&grid, 2.0);

        let base = sed
            .count_rate(&band, Duration::from_secs(1), 1.0, 1.0)
            .unwrap();
        let scaled = sed
            .count_rate(&band, Duration::from_secs(30), 10.0, 2.0)
            .unwrap();
        assert_relative_eq!(scaled, base * 30.0 * 10.0 / 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_count_rate_rejects_bad_gain() {
        let grid = WavelengthGrid::new(300.0, 1200.0, 1.0).unwrap();
        let band = unit_throughput(&grid);
        let sed = GriddedSed::flat(&grid, 1.0);
        assert!(matches!(
            sed.count_rate(&band, Duration::from_secs(1), 1.0, 0.0),
            Err(PhotometryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_scaled_to_count_rate_hits_target_without_mutating() {
        let grid = WavelengthGrid::new(300.0, 1200.0, 0.5).unwrap();
        let band = unit_throughput(&grid);
        let sed = GriddedSed::flat(&grid, 5.0);
        let exposure = Duration::from_secs(15);

        let rescaled = sed
            .scaled_to_count_rate(42.0, &band, exposure, 100.0, 2.3)
            .unwrap();

        assert_relative_eq!(
            rescaled.count_rate(&band, exposure, 100.0, 2.3).unwrap(),
            42.0,
            max_relative = 1e-12
        );
        assert!(sed.fnu().iter().all(|&f| f == 5.0));
    }

    #[test]
    fn test_scaled_to_count_rate_rejects_dark_source() {
        let grid = WavelengthGrid::new(300.0, 1200.0, 1.0).unwrap();
        let band = unit_throughput(&grid);
        let dark = GriddedSed::flat(&grid, 0.0);
        assert!(matches!(
            dark.scaled_to_count_rate(1.0, &band, Duration::from_secs(1), 1.0, 1.0),
            Err(PhotometryError::InvalidSed(_))
        ));
    }

    #[test]
    fn test_magnitude_of_dark_source_fails() {
        let grid = WavelengthGrid::new(300.0, 1200.0, 1.0).unwrap();
        let band = unit_throughput(&grid);
        assert!(matches!(
            GriddedSed::flat(&grid, 0.0).magnitude(&band),
            Err(PhotometryError::InvalidSed(_))
        ));
    }

    #[test]
    fn test_sed_on_different_grid_is_resampled() {
        let band_grid = WavelengthGrid::new(300.0, 1200.0, 1.0).unwrap();
        let sed_grid = WavelengthGrid::new(300.0, 1200.0, 0.1).unwrap();
        let band = unit_throughput(&band_grid);

        let coarse = GriddedSed::from_ab_magnitude(&band_grid, 20.0);
        let fine = GriddedSed::from_ab_magnitude(&sed_grid, 20.0);

        assert_relative_eq!(
            coarse.magnitude(&band).unwrap(),
            fine.magnitude(&band).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_sed_from_curve_zero_fills() {
        let grid = WavelengthGrid::new(300.0, 1200.0, 1.0).unwrap();
        let sed = GriddedSed::from_curve(&[500.0, 600.0], &[10.0, 10.0], &grid).unwrap();
        assert_eq!(sed.fnu()[grid.nearest_index(450.0)], 0.0);
        assert_eq!(sed.fnu()[grid.nearest_index(550.0)], 10.0);
    }
}
