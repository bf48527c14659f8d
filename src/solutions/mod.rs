// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read, write, flag and plot AO-style calibration solutions.

pub mod ao;
mod error;
pub mod flag;
#[cfg(feature = "plotting")]
pub mod plot;

pub use error::*;
pub use flag::{flag_aosolutions_file, flag_solutions, FlagOptions};

use std::path::{Path, PathBuf};

use ndarray::prelude::*;
use num_complex::Complex64;

/// The suffix given to solutions files written by `calibrate`.
pub const CALIBRATE_SUFFIX: &str = ".calibrate.bin";

/// The suffix given to solutions files after they have been flagged.
pub const PREFLAGGED_SUFFIX: &str = ".preflagged.bin";

/// Calibration solutions read from an AO-style solutions file. The dimension
/// counts are always derived from the gains, so they can't disagree.
#[derive(Debug, Clone)]
pub struct AOSolutions {
    /// The file these solutions were read from (or will be written to).
    path: PathBuf,

    /// Complex antenna gains. The dimensions are (num. time solutions,
    /// num. antennas, num. channels, num. polarisations). Flagged gains are
    /// NaN.
    bandpass: Array4<Complex64>,
}

impl AOSolutions {
    pub fn new<P: AsRef<Path>>(path: P, bandpass: Array4<Complex64>) -> AOSolutions {
        AOSolutions {
            path: path.as_ref().to_path_buf(),
            bandpass,
        }
    }

    /// Read in an AO-style solutions file. See [`ao::decode`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AOSolutions, AOSolutionsError> {
        ao::decode(path)
    }

    /// Write these solutions to `path`. See [`ao::encode`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AOSolutionsError> {
        ao::encode(self, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of time solutions.
    pub fn nsol(&self) -> usize {
        self.bandpass.len_of(Axis(0))
    }

    /// Number of antennas.
    pub fn nant(&self) -> usize {
        self.bandpass.len_of(Axis(1))
    }

    /// Number of channels.
    pub fn nchan(&self) -> usize {
        self.bandpass.len_of(Axis(2))
    }

    /// Number of polarisations.
    pub fn npol(&self) -> usize {
        self.bandpass.len_of(Axis(3))
    }

    pub fn bandpass(&self) -> ArrayView4<Complex64> {
        self.bandpass.view()
    }

    /// Consume the solutions, returning the gains.
    pub fn into_bandpass(self) -> Array4<Complex64> {
        self.bandpass
    }

    /// Get a copy of these solutions associated with a different path.
    pub fn with_path<P: AsRef<Path>>(&self, path: P) -> AOSolutions {
        AOSolutions::new(path, self.bandpass.clone())
    }

    /// The number of gains that are NaN or infinite.
    pub fn num_flagged(&self) -> usize {
        self.bandpass
            .iter()
            .filter(|g| !(g.re.is_finite() && g.im.is_finite()))
            .count()
    }
}
