//! Miscellaneous numerical utilities for sampled curves.
//!
//! This module provides the low-level pieces the gridding code is built on:
//!
//! - **Curve validation**: length, sample count, finiteness and ordering checks
//! - **Linear interpolation**: 1D interpolation that treats the outside of the
//!   sampled domain as zero
//! - **Compensated summation**: Neumaier summation for grid integrals

use crate::error::{PhotometryError, Result};

/// Validate a sampled curve before it is interpolated or multiplied.
///
/// # Arguments
///
/// * `xs` - Sample positions (wavelengths), must be finite and non-decreasing
///   with a non-empty span. A repeated position marks a step, such as a filter edge
/// * `ys` - Sample values, must be finite and match the length of `xs`
///
/// # Errors
///
/// Returns `PhotometryError::InvalidCurve` if:
/// - The slices have different lengths
/// - Fewer than 2 samples are present
/// - Any value is NaN or infinite
/// - Sample positions decrease anywhere, or the first and last are equal
pub fn validate_curve(xs: &[f64], ys: &[f64]) -> Result<()> {
    if xs.len() != ys.len() {
        return Err(PhotometryError::invalid_curve(
            xs.len(),
            ys.len(),
            "wavelength and value arrays must have the same length",
        ));
    }

    if xs.len() < 2 {
        return Err(PhotometryError::invalid_curve(
            xs.len(),
            ys.len(),
            "at least 2 samples are required",
        ));
    }

    if let Some(i) = xs.iter().chain(ys).position(|v| !v.is_finite()) {
        return Err(PhotometryError::invalid_curve(
            xs.len(),
            ys.len(),
            format!("non-finite value at flattened index {i}"),
        ));
    }

    for i in 1..xs.len() {
        if xs[i] < xs[i - 1] {
            return Err(PhotometryError::invalid_curve(
                xs.len(),
                ys.len(),
                format!(
                    "wavelengths must be ascending ({} followed by {} at index {})",
                    xs[i - 1],
                    xs[i],
                    i
                ),
            ));
        }
    }

    if xs[xs.len() - 1] == xs[0] {
        return Err(PhotometryError::invalid_curve(
            xs.len(),
            ys.len(),
            format!("wavelengths span no range (all equal to {})", xs[0]),
        ));
    }

    Ok(())
}

/// Linearly interpolate a validated curve, returning 0.0 outside its domain.
///
/// Query points exactly on a sample take that sample's value. Where a
/// position repeats, the later sample wins, so a two-row filter edge acts
/// as a step.
/// Points strictly outside `[xs[0], xs[n-1]]` evaluate to exactly 0.0, so
/// unmeasured wavelength ranges behave as opaque rather than extrapolated.
///
/// The caller is responsible for having run [`validate_curve`] on `xs`/`ys`.
///
/// # Examples
///
/// ```rust
/// use photometry::algo::misc::interp_zero_fill;
///
/// let xs = vec![400.0, 500.0, 600.0];
/// let ys = vec![0.2, 0.6, 1.0];
///
/// assert_eq!(interp_zero_fill(500.0, &xs, &ys), 0.6);
/// assert!((interp_zero_fill(450.0, &xs, &ys) - 0.4).abs() < 1e-12);
/// assert_eq!(interp_zero_fill(350.0, &xs, &ys), 0.0);
/// assert_eq!(interp_zero_fill(650.0, &xs, &ys), 0.0);
/// ```
pub fn interp_zero_fill(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n == 0 || x < xs[0] || x > xs[n - 1] {
        return 0.0;
    }

    // First sample strictly past x; the one before it is the last sample <= x
    let idx = xs.partition_point(|&p| p <= x);
    if xs[idx - 1] == x {
        return ys[idx - 1];
    }

    let (x1, x2) = (xs[idx - 1], xs[idx]);
    let (y1, y2) = (ys[idx - 1], ys[idx]);

    let t = (x - x1) / (x2 - x1);
    y1 + t * (y2 - y1)
}

/// Sum values with Neumaier's compensated summation.
///
/// Grid integrals add thousands of terms of similar magnitude; compensation
/// keeps the normalization of phi accurate to a few ULPs.
pub fn neumaier_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;

    for v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }

    sum + compensation
}
