//! Bandpass throughputs and photometric calibration
//!
//! This crate represents wavelength-indexed throughput curves on a common
//! wavelength grid, combines component curves multiplicatively, and derives
//! calibration quantities from them: effective wavelengths, instrumental
//! zeropoints and 5-sigma limiting magnitudes.

pub mod algo;
pub mod calculator;
pub mod config;
pub mod error;
pub mod grid;
pub mod io;
pub mod sed;
pub mod shared_args;
pub mod throughput;

pub use calculator::{limiting_magnitude, many_magnitudes, zeropoint};
pub use config::{Filter, PhotometricConfig};
pub use error::{PhotometryError, Result};
pub use grid::{build_grid, WavelengthGrid};
pub use sed::{GriddedSed, SpectralEnergyDistribution};
pub use throughput::Throughput;
