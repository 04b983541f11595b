//! Calibration quantities derived from a throughput and an exposure configuration
//!
//! Zeropoints and 5-sigma limiting magnitudes are both computed by scaling a
//! fresh flat reference source to a target number of counts and reading off
//! its magnitude. The SED collaborator passed in is only used as a factory
//! and is never modified.

use std::time::Duration;

use log::debug;
use rayon::prelude::*;

use crate::config::PhotometricConfig;
use crate::sed::SpectralEnergyDistribution;
use crate::throughput::Throughput;

/// Signal-to-noise ratio that defines the limiting magnitude
pub const LIMITING_SNR: f64 = 5.0;

/// Effective number of pixels per seeing disk area in pixels² for a
/// double-Gaussian PSF
pub const NEFF_COEFFICIENT: f64 = 2.436;

/// Instrumental noise variance per pixel over all exposures, in electrons²
///
/// `n·read_noise² + dark_current·t·n + n·other_noise²`
pub fn instrumental_noise_variance(config: &PhotometricConfig) -> f64 {
    let n = config.num_exposures as f64;
    let t = config.exposure_time.as_secs_f64();
    n * config.read_noise.powi(2) + config.dark_current * t * n + n * config.other_noise.powi(2)
}

/// Effective number of noise pixels under the seeing disk
pub fn effective_pixel_count(config: &PhotometricConfig) -> f64 {
    NEFF_COEFFICIENT * (config.seeing_arcsec / config.plate_scale).powi(2)
}

/// Counts needed to reach `snr` against `total_variance`
///
/// Positive root of the quadratic in detected counts:
/// `snr²/(2·gain) + sqrt(snr⁴/(4·gain²) + snr²·total_variance)`
pub fn count_threshold(snr: f64, gain: f64, total_variance: f64) -> f64 {
    let snr2 = snr * snr;
    snr2 / (2.0 * gain) + (snr2 * snr2 / (4.0 * gain * gain) + snr2 * total_variance).sqrt()
}

// Magnitude through `throughput` of a flat source producing `counts`
fn flat_source_magnitude<S: SpectralEnergyDistribution>(
    factory: &S,
    throughput: &Throughput,
    counts: f64,
    exposure_time: Duration,
    config: &PhotometricConfig,
) -> Result<f64, S::Error> {
    let source = factory.flat_reference().scaled_to_count_rate(
        counts,
        throughput,
        exposure_time,
        config.effective_area_cm2,
        config.gain,
    )?;
    source.magnitude(throughput)
}

/// Instrumental zeropoint of a throughput
///
/// The AB magnitude of a flat-spectrum source producing exactly one count
/// per single exposure through `throughput`.
///
/// # Arguments
///
/// * `throughput` - Full system throughput; its normalized response is derived if absent
/// * `sed` - Collaborator used to create the flat reference source
/// * `config` - Exposure and detector parameters
pub fn zeropoint<S: SpectralEnergyDistribution>(
    throughput: &Throughput,
    sed: &S,
    config: &PhotometricConfig,
) -> Result<f64, S::Error> {
    config.validate()?;
    throughput.phi()?;

    let zp = flat_source_magnitude(sed, throughput, 1.0, config.exposure_time, config)?;
    debug!(
        "Zeropoint {zp:.4} for {:?} exposure, area {:.1} cm², gain {}",
        config.exposure_time, config.effective_area_cm2, config.gain
    );
    Ok(zp)
}

/// 5-sigma limiting magnitude of a point source
///
/// # Arguments
///
/// * `throughput` - Full system throughput, including the atmosphere
/// * `sky_sed` - Sky surface brightness per arcsec²; also the factory for the flat source
/// * `hardware` - Hardware-only throughput used for the sky counts
/// * `config` - Exposure, detector, seeing and plate scale parameters
pub fn limiting_magnitude<S: SpectralEnergyDistribution>(
    throughput: &Throughput,
    sky_sed: &S,
    hardware: &Throughput,
    config: &PhotometricConfig,
) -> Result<f64, S::Error> {
    config.validate()?;
    throughput.phi()?;

    let total_exposure = config.total_exposure()?;

    let instrumental = instrumental_noise_variance(config);
    let neff = effective_pixel_count(config);

    let sky_counts = sky_sed.count_rate(
        hardware,
        total_exposure,
        config.effective_area_cm2,
        config.gain,
    )? * config.plate_scale.powi(2);
    let sky_variance = sky_counts / config.gain;

    let total_variance = neff * (sky_variance + instrumental);
    let counts = count_threshold(LIMITING_SNR, config.gain, total_variance);

    debug!(
        "Noise budget: sky {sky_counts:.3} counts/pixel, instrumental {instrumental:.3} e⁻², \
         neff {neff:.3}, threshold {counts:.3} counts"
    );

    flat_source_magnitude(sky_sed, throughput, counts, total_exposure, config)
}

/// Magnitudes of several spectra through one throughput, in input order
///
/// The normalized response is derived once before the spectra are evaluated in parallel.
pub fn many_magnitudes<S>(throughput: &Throughput, seds: &[S]) -> Result<Vec<f64>, S::Error>
where
    S: SpectralEnergyDistribution + Sync,
    S::Error: Send,
{
    throughput.phi()?;

    let results: Vec<Result<f64, S::Error>> =
        seds.par_iter().map(|sed| sed.magnitude(throughput)).collect();
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhotometryError;
    use crate::grid::WavelengthGrid;
    use crate::sed::GriddedSed;
    use approx::assert_relative_eq;

    fn flat_band(grid: &WavelengthGrid) -> Throughput {
        Throughput::from_curve(&[grid.min(), grid.last()], &[1.0, 1.0], grid).unwrap()
    }

    fn coarse_grid() -> WavelengthGrid {
        WavelengthGrid::new(300.0, 1200.0, 1.0).unwrap()
    }

    #[test]
    fn test_instrumental_noise_variance_defaults() {
        // 2·25 + 0.2·15·2 + 2·4.69²
        let expected = 50.0 + 6.0 + 2.0 * 4.69 * 4.69;
        assert_relative_eq!(
            instrumental_noise_variance(&PhotometricConfig::default()),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_effective_pixel_count() {
        let config = PhotometricConfig {
            seeing_arcsec: 0.7,
            plate_scale: 0.2,
            ..PhotometricConfig::default()
        };
        assert_relative_eq!(effective_pixel_count(&config), 2.436 * 12.25, epsilon = 1e-12);
    }

    #[test]
    fn test_count_threshold_without_noise() {
        assert_relative_eq!(count_threshold(5.0, 2.3, 0.0), 25.0 / 2.3, epsilon = 1e-12);
    }

    #[test]
    fn test_count_threshold_satisfies_quadratic() {
        let (snr, gain, variance) = (5.0, 2.3, 1234.5);
        let c = count_threshold(snr, gain, variance);
        // snr = c / sqrt(c/gain + variance)
        assert_relative_eq!(c / (c / gain + variance).sqrt(), snr, epsilon = 1e-9);
    }

    #[test]
    fn test_zeropoint_area_doubling() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let sed = GriddedSed::flat(&grid, 1.0);
        let config = PhotometricConfig::default();
        let doubled = PhotometricConfig {
            effective_area_cm2: 2.0 * config.effective_area_cm2,
            ..config.clone()
        };

        let zp = zeropoint(&band, &sed, &config).unwrap();
        let zp2 = zeropoint(&band, &sed, &doubled).unwrap();
        assert_relative_eq!(zp2 - zp, 2.5 * 2f64.log10(), epsilon = 1e-9);
    }

    #[test]
    fn test_zeropoint_of_degenerate_throughput_fails() {
        let grid = coarse_grid();
        let dark = Throughput::from_curve(&[300.0, 1200.0], &[0.0, 0.0], &grid).unwrap();
        let sed = GriddedSed::flat(&grid, 1.0);
        assert!(matches!(
            zeropoint(&dark, &sed, &PhotometricConfig::default()),
            Err(PhotometryError::DegenerateThroughput(_))
        ));
    }

    #[test]
    fn test_zeropoint_rejects_invalid_config() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let sed = GriddedSed::flat(&grid, 1.0);
        let config = PhotometricConfig {
            num_exposures: 0,
            ..PhotometricConfig::default()
        };
        assert!(matches!(
            zeropoint(&band, &sed, &config),
            Err(PhotometryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_limiting_magnitude_without_noise() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let dark_sky = GriddedSed::flat(&grid, 0.0);
        let config = PhotometricConfig {
            read_noise: 0.0,
            dark_current: 0.0,
            other_noise: 0.0,
            ..PhotometricConfig::default()
        };

        // With no noise the threshold is snr²/gain counts over the full visit
        let visit = PhotometricConfig {
            exposure_time: config.total_exposure().unwrap(),
            num_exposures: 1,
            ..config.clone()
        };
        let zp_visit = zeropoint(&band, &dark_sky, &visit).unwrap();
        let expected = zp_visit - 2.5 * (25.0 / config.gain).log10();

        let m5 = limiting_magnitude(&band, &dark_sky, &band, &config).unwrap();
        assert_relative_eq!(m5, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_limiting_magnitude_trends() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let config = PhotometricConfig::default();

        let sky = GriddedSed::from_ab_magnitude(&grid, 21.0);
        let darker_sky = GriddedSed::from_ab_magnitude(&grid, 22.0);

        let m5 = limiting_magnitude(&band, &sky, &band, &config).unwrap();
        let m5_dark = limiting_magnitude(&band, &darker_sky, &band, &config).unwrap();
        assert!(m5_dark > m5);

        let longer = PhotometricConfig {
            num_exposures: 4,
            ..config.clone()
        };
        let m5_long = limiting_magnitude(&band, &sky, &band, &longer).unwrap();
        assert!(m5_long > m5);

        let zp = zeropoint(&band, &sky, &config).unwrap();
        assert!(m5 < zp);
    }

    #[test]
    fn test_limiting_magnitude_rejects_overflowing_exposure() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let sky = GriddedSed::from_ab_magnitude(&grid, 21.0);
        let config = PhotometricConfig {
            exposure_time: Duration::from_secs(u64::MAX / 2 + 1),
            ..PhotometricConfig::default()
        };
        assert!(matches!(
            limiting_magnitude(&band, &sky, &band, &config),
            Err(PhotometryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_limiting_magnitude_leaves_inputs_untouched() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let hardware = Throughput::from_curve(&[300.0, 1200.0], &[0.5, 0.5], &grid).unwrap();
        let sky = GriddedSed::from_ab_magnitude(&grid, 21.0);
        let sky_before = sky.clone();

        limiting_magnitude(&band, &sky, &hardware, &PhotometricConfig::default()).unwrap();

        assert_eq!(sky, sky_before);
        assert!(hardware.normalized_response().is_none());
        assert!(hardware.transmission().iter().all(|&t| t == 0.5));
    }

    #[test]
    fn test_many_magnitudes_preserves_order() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let mags = [18.0, 25.0, 12.0, 21.5];
        let seds: Vec<GriddedSed> = mags
            .iter()
            .map(|&m| GriddedSed::from_ab_magnitude(&grid, m))
            .collect();

        let result = many_magnitudes(&band, &seds).unwrap();
        for (got, want) in result.iter().zip(mags) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_many_magnitudes_propagates_failure() {
        let grid = coarse_grid();
        let band = flat_band(&grid);
        let seds = vec![
            GriddedSed::from_ab_magnitude(&grid, 20.0),
            GriddedSed::flat(&grid, 0.0),
        ];
        assert!(matches!(
            many_magnitudes(&band, &seds),
            Err(PhotometryError::InvalidSed(_))
        ));
    }
}
