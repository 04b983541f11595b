//! Numerical algorithms shared by the throughput and SED models
//!
//! This module provides curve validation, zero-filled linear interpolation,
//! and compensated summation used for grid integrals.

pub mod misc;

pub use misc::{interp_zero_fill, neumaier_sum, validate_curve};
