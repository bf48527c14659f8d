// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read and write "André Offringa style" calibration solutions, as
//! produced by `calibrate` and consumed by `applysolutions`.
//!
//! The layout is: 8 bytes of magic ("MWAOCAL\0"), ten little-endian 32-bit
//! integers of header (file type, structure type, nsol, nant, nchan, npol,
//! then a start and end time stored as two doubles), then
//! `nsol * nant * nchan * npol` complex doubles (real, imaginary).

use std::f64::consts::SQRT_2;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};
use ndarray::prelude::*;
use num_complex::Complex64;

use super::{AOSolutionsError, AOSolutions};

/// The number of leading bytes that are skipped when reading.
const MAGIC_LEN: u64 = 8;
/// The number of 32-bit integers in the header.
const HEADER_LEN: usize = 10;
/// Two 8-byte floats per complex value.
const BYTES_PER_VALUE: u64 = 16;

const MAGIC: &[u8; 8] = b"MWAOCAL\0";

/// The names of the header values, for error messages.
const HEADER_NAMES: [&str; 6] = ["file type", "structure type", "nsol", "nant", "nchan", "npol"];

/// Convert a raw value in a solutions file to a gain. The solutions store
/// inverse gains scaled by sqrt(2); this scaling has never been explained, but
/// it must be kept for compatibility with the files that `calibrate` writes.
///
/// A raw zero produces an infinite gain (inf + NaN i), never an error.
pub(crate) fn raw_to_gain(raw: Complex64) -> Complex64 {
    if raw.re == 0.0 && raw.im == 0.0 {
        Complex64::new(f64::INFINITY, f64::NAN)
    } else {
        SQRT_2 / raw
    }
}

/// The inverse of [`raw_to_gain`].
pub(crate) fn gain_to_raw(gain: Complex64) -> Complex64 {
    if gain.re.is_infinite() || gain.im.is_infinite() {
        Complex64::new(0.0, 0.0)
    } else if gain.re == 0.0 && gain.im == 0.0 {
        Complex64::new(f64::INFINITY, f64::NAN)
    } else {
        SQRT_2 / gain
    }
}

/// Read an AO-style calibration solutions file. Nothing is returned unless
/// the whole file could be read; a file that is shorter than its header
/// claims is rejected before any data is read.
pub fn decode<P: AsRef<Path>>(file: P) -> Result<AOSolutions, AOSolutionsError> {
    decode_inner(file.as_ref())
}

fn decode_inner(file: &Path) -> Result<AOSolutions, AOSolutionsError> {
    let file_str = file.display().to_string();
    if !file.exists() {
        return Err(AOSolutionsError::NotFound { file: file_str });
    }
    if !file.is_file() {
        return Err(AOSolutionsError::NotAFile { file: file_str });
    }
    info!("Loading {file_str}");

    let file_len = std::fs::metadata(file)?.len();
    let header_end = MAGIC_LEN + (HEADER_LEN as u64) * 4;
    if file_len < header_end {
        return Err(AOSolutionsError::Truncated {
            file: file_str,
            expected: header_end,
            actual: file_len,
        });
    }

    let mut bin_file = BufReader::new(File::open(file)?);
    let mut magic = [0; MAGIC_LEN as usize];
    bin_file.read_exact(&mut magic)?;
    let mut header = [0_i32; HEADER_LEN];
    bin_file.read_i32_into::<LittleEndian>(&mut header)?;
    debug!("Header extracted: {header:?}");

    for (index, &name) in HEADER_NAMES.iter().enumerate().take(2) {
        if header[index] != 0 {
            return Err(AOSolutionsError::BadHeaderTag {
                file: file_str,
                index,
                name,
                got: header[index],
            });
        }
    }

    let mut dims = [0_usize; 4];
    for (i, dim) in dims.iter_mut().enumerate() {
        let got = header[i + 2];
        *dim = usize::try_from(got).map_err(|_| AOSolutionsError::NegativeCount {
            file: file_str.clone(),
            name: HEADER_NAMES[i + 2],
            got,
        })?;
    }
    let [nsol, nant, nchan, npol] = dims;

    let too_large = || AOSolutionsError::TooLarge {
        file: file_str.clone(),
        nsol,
        nant,
        nchan,
        npol,
    };
    let num_values = dims
        .iter()
        .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(too_large)?;
    let expected = (num_values as u64)
        .checked_mul(BYTES_PER_VALUE)
        .and_then(|n| n.checked_add(header_end))
        .ok_or_else(too_large)?;
    if file_len < expected {
        return Err(AOSolutionsError::Truncated {
            file: file_str,
            expected,
            actual: file_len,
        });
    }

    let mut raw = vec![0.0; num_values * 2];
    bin_file.read_f64_into::<LittleEndian>(&mut raw)?;
    let gains = raw
        .chunks_exact(2)
        .map(|pair| raw_to_gain(Complex64::new(pair[0], pair[1])))
        .collect::<Vec<_>>();
    let bandpass = Array4::from_shape_vec((nsol, nant, nchan, npol), gains)
        .map_err(|_| too_large())?;
    info!("Loaded solutions of shape {:?}", bandpass.dim());

    Ok(AOSolutions::new(file, bandpass))
}

/// Write an AO-style calibration solutions file. The start and end times are
/// written as zeros, as `calibrate` does.
pub fn encode<P: AsRef<Path>>(sols: &AOSolutions, file: P) -> Result<(), AOSolutionsError> {
    encode_inner(sols, file.as_ref())
}

fn encode_inner(sols: &AOSolutions, file: &Path) -> Result<(), AOSolutionsError> {
    let (nsol, nant, nchan, npol) = sols.bandpass.dim();
    let too_large = || AOSolutionsError::TooLarge {
        file: file.display().to_string(),
        nsol,
        nant,
        nchan,
        npol,
    };
    let header = [
        0,
        0,
        i32::try_from(nsol).map_err(|_| too_large())?,
        i32::try_from(nant).map_err(|_| too_large())?,
        i32::try_from(nchan).map_err(|_| too_large())?,
        i32::try_from(npol).map_err(|_| too_large())?,
    ];

    let mut bin_file = BufWriter::new(File::create(file)?);
    bin_file.write_all(MAGIC)?;
    for h in header {
        bin_file.write_i32::<LittleEndian>(h)?;
    }
    // Start and end times.
    bin_file.write_f64::<LittleEndian>(0.0)?;
    bin_file.write_f64::<LittleEndian>(0.0)?;

    for &gain in sols.bandpass.iter() {
        let raw = gain_to_raw(gain);
        bin_file.write_f64::<LittleEndian>(raw.re)?;
        bin_file.write_f64::<LittleEndian>(raw.im)?;
    }
    bin_file.flush()?;
    debug!("Wrote solutions of shape {:?} to {}", sols.bandpass.dim(), file.display());
    Ok(())
}
