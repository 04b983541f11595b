use crate::config::{MAX_WAVELENGTH_NM, MIN_WAVELENGTH_NM, WAVELENGTH_STEP_NM};
use crate::error::Result;
use crate::grid::WavelengthGrid;
use clap::Args;
use std::time::Duration;

/// Parse duration string with units (e.g., "15s", "500ms", "2m", "1h")
fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();

    // Extract numeric part and scale to seconds; bare numbers are seconds
    let (num_str, seconds_per_unit) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1e-3)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60.0)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3600.0)
    } else {
        (s, 1.0)
    };

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid numeric value: {}", num_str))?;

    if !value.is_finite() || value <= 0.0 {
        return Err("Exposure duration must be positive".to_string());
    }

    Duration::try_from_secs_f64(value * seconds_per_unit)
        .map_err(|e| format!("Invalid exposure duration {}: {}", s, e))
}

/// Wrapper for Duration that implements Clone and has a nice Display
#[derive(Debug, Clone, PartialEq)]
pub struct DurationArg(pub Duration);

impl std::str::FromStr for DurationArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_duration(s).map(DurationArg)
    }
}

impl std::fmt::Display for DurationArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        let total_ms = duration.as_millis();

        if total_ms >= 1000 && total_ms % 1000 == 0 {
            write!(f, "{}s", total_ms / 1000)
        } else if total_ms >= 1000 {
            write!(f, "{:.3}s", duration.as_secs_f64())
        } else {
            write!(f, "{}ms", total_ms)
        }
    }
}

/// Wavelength grid arguments shared by binaries
#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Lower wavelength bound in nanometers
    #[arg(long = "min", default_value_t = MIN_WAVELENGTH_NM)]
    pub min_nm: f64,

    /// Upper wavelength bound in nanometers (inclusive)
    #[arg(long = "max", default_value_t = MAX_WAVELENGTH_NM)]
    pub max_nm: f64,

    /// Grid spacing in nanometers
    #[arg(long = "step", default_value_t = WAVELENGTH_STEP_NM)]
    pub step_nm: f64,
}

impl GridArgs {
    /// Build the validated grid
    pub fn to_grid(&self) -> Result<WavelengthGrid> {
        WavelengthGrid::new(self.min_nm, self.max_nm, self.step_nm)
    }
}
