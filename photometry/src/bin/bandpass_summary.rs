//! Bandpass summary for a stack of throughput components
//!
//! Multiplies the component throughput files together on a common wavelength
//! grid and reports the calibration quantities of the combined bandpass: the
//! two effective wavelengths, the instrumental zeropoint, and optionally the
//! 5-sigma limiting magnitude against a sky spectrum.
//!
//! Set `RUST_LOG=debug` to see resampling and noise budget details.

use clap::Parser;
use log::info;
use photometry::calculator::{limiting_magnitude, zeropoint};
use photometry::config::{Filter, PhotometricConfig};
use photometry::sed::GriddedSed;
use photometry::shared_args::{DurationArg, GridArgs};
use photometry::throughput::Throughput;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Bandpass Summary",
    about = "Combines throughput components and reports effective wavelengths, zeropoint and m5",
    long_about = None
)]
struct Args {
    /// Throughput component files, multiplied together in order
    #[arg(required = true)]
    components: Vec<PathBuf>,

    #[command(flatten)]
    grid: GridArgs,

    /// Band whose default seeing is used (ignored when --config is given)
    #[arg(long, value_enum, default_value_t = Filter::R)]
    filter: Filter,

    /// JSON exposure configuration; omitted fields take default values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Single exposure time (e.g., "15s", "500ms"), overrides the configuration
    #[arg(long)]
    exposure: Option<DurationArg>,

    /// Number of exposures per visit, overrides the configuration
    #[arg(long)]
    exposures: Option<u32>,

    /// Sky spectrum (wavelength nm, F_nu Jy per arcsec²) for the limiting magnitude
    #[arg(long)]
    sky: Option<PathBuf>,

    /// Hardware-only components used for the sky counts (defaults to all components)
    #[arg(long, num_args = 1..)]
    hardware: Vec<PathBuf>,

    /// Write the combined throughput to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Include the normalized response column in the output file
    #[arg(long, requires = "output")]
    write_phi: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let grid = args.grid.to_grid()?;

    let mut config = match &args.config {
        Some(path) => PhotometricConfig::load_from_file(path)?,
        None => PhotometricConfig::for_filter(args.filter),
    };
    if let Some(exposure) = &args.exposure {
        config.exposure_time = exposure.0;
    }
    if let Some(n) = args.exposures {
        config.num_exposures = n;
    }
    config.validate()?;

    info!("Composing {} components on {}", args.components.len(), grid);
    let throughput = Throughput::from_composed_files(&args.components, &grid)?;

    let (eff_phi, eff_sb) = throughput.effective_wavelengths()?;
    let flat = GriddedSed::flat(&grid, 1.0);
    let zp = zeropoint(&throughput, &flat, &config)?;

    println!("Bandpass Summary");
    println!("================");
    println!();
    println!("Grid:               {grid}");
    for path in &args.components {
        println!("Component:          {}", path.display());
    }
    println!(
        "Exposure:           {} x {}",
        config.num_exposures,
        DurationArg(config.exposure_time)
    );
    println!("Gain:               {} e⁻/ADU", config.gain);
    println!("Effective area:     {:.1} cm²", config.effective_area_cm2);
    println!();
    println!("Effective λ (phi):  {eff_phi:.3} nm");
    println!("Effective λ (sb):   {eff_sb:.3} nm");
    println!("Zeropoint:          {zp:.4} mag (1 count per exposure)");

    if let Some(sky_path) = &args.sky {
        let sky = GriddedSed::from_file(sky_path, &grid)?;
        let hardware_paths = if args.hardware.is_empty() {
            &args.components
        } else {
            &args.hardware
        };
        let hardware = Throughput::from_composed_files(hardware_paths, &grid)?;

        let m5 = limiting_magnitude(&throughput, &sky, &hardware, &config)?;
        println!(
            "m5:                 {m5:.4} mag (seeing {:.2}\")",
            config.seeing_arcsec
        );
    }

    if let Some(output) = &args.output {
        throughput.write(output, args.write_phi)?;
        println!();
        println!("Wrote combined throughput to {}", output.display());
    }

    Ok(())
}
