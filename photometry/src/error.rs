//! Error types for bandpass and photometry operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type for photometry operations
pub type Result<T> = std::result::Result<T, PhotometryError>;

/// Errors that can occur while building throughputs or deriving photometric quantities
#[derive(Debug, Error)]
pub enum PhotometryError {
    /// Wavelength/value pairs that cannot describe a curve
    #[error("Invalid curve ({wavelength_len} wavelengths, {value_len} values): {reason}")]
    InvalidCurve {
        wavelength_len: usize,
        value_len: usize,
        reason: String,
    },

    /// Grid bounds or step that cannot produce a wavelength lattice
    #[error("Invalid wavelength grid (min {min}, max {max}, step {step}): {reason}")]
    InvalidGrid {
        min: f64,
        max: f64,
        step: f64,
        reason: &'static str,
    },

    #[error("The throughput file {} could not be opened: {source}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Normalized response is undefined for this transmission
    #[error("Degenerate throughput: {0}")]
    DegenerateThroughput(&'static str),

    /// A data line whose leading tokens are not numbers
    #[error("Malformed data in {} at line {line}: {content:?}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spectrum cannot yield a usable count rate or flux
    #[error("Invalid SED: {0}")]
    InvalidSed(String),

    /// Exposure or detector parameters outside their physical range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PhotometryError {
    pub(crate) fn invalid_curve(
        wavelength_len: usize,
        value_len: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidCurve {
            wavelength_len,
            value_len,
            reason: reason.into(),
        }
    }
}
