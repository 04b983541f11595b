//! Plain-text throughput and spectrum tables
//!
//! Tables are whitespace-delimited columns with the wavelength in nanometers
//! first. Lines starting with `#` are comments and may hold any bytes, not
//! just UTF-8. Lines with fewer than two tokens (including blank lines) are
//! skipped. Extra columns are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{info, trace};

use crate::error::{PhotometryError, Result};

/// Read the first two columns of a table as `(wavelengths, values)`
///
/// # Errors
///
/// * `PhotometryError::MissingFile` - the file cannot be opened
/// * `PhotometryError::Io` - reading fails part way through
/// * `PhotometryError::Parse` - a data line is not UTF-8 or its first two tokens are not numbers
pub fn read_table(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
    let file = File::open(path).map_err(|source| PhotometryError::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;

    let mut wavelengths = Vec::new();
    let mut values = Vec::new();

    // Split on raw bytes so comment lines never need to be valid UTF-8
    for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
        let line = line.map_err(|source| PhotometryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if line.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'#') {
            continue;
        }

        let parse_error = || PhotometryError::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            content: String::from_utf8_lossy(&line).trim_end().to_string(),
        };
        let line = std::str::from_utf8(&line).map_err(|_| parse_error())?;

        let mut tokens = line.split_whitespace();
        let (Some(first), Some(second)) = (tokens.next(), tokens.next()) else {
            trace!("Skipping short line {} in {}", index + 1, path.display());
            continue;
        };

        let wavelength: f64 = first.parse().map_err(|_| parse_error())?;
        let value: f64 = second.parse().map_err(|_| parse_error())?;

        wavelengths.push(wavelength);
        values.push(value);
    }

    info!("Read {} samples from {}", wavelengths.len(), path.display());

    Ok((wavelengths, values))
}

/// Write a header comment and one row per wavelength
///
/// Each row holds the wavelength followed by the value of every column at
/// that index. Floats use shortest round-trip formatting, so a table written
/// here reads back bit-identically.
///
/// # Arguments
///
/// * `path` - Destination file, created or truncated
/// * `header` - Header text, written after a leading `# `
/// * `wavelengths` - Wavelength column
/// * `columns` - Additional columns, each the same length as `wavelengths`
pub fn write_table(
    path: &Path,
    header: &str,
    wavelengths: &[f64],
    columns: &[&[f64]],
) -> Result<()> {
    if let Some(bad) = columns.iter().find(|c| c.len() != wavelengths.len()) {
        return Err(PhotometryError::invalid_curve(
            wavelengths.len(),
            bad.len(),
            "every written column must match the wavelength column",
        ));
    }

    let io_error = |source| PhotometryError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# {header}").map_err(io_error)?;
    for (i, wavelength) in wavelengths.iter().enumerate() {
        write!(writer, "{wavelength}").map_err(io_error)?;
        for column in columns {
            write!(writer, " {}", column[i]).map_err(io_error)?;
        }
        writeln!(writer).map_err(io_error)?;
    }
    writer.flush().map_err(io_error)?;

    info!("Wrote {} rows to {}", wavelengths.len(), path.display());

    Ok(())
}
