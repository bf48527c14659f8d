// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading, writing or flagging calibration solutions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AOSolutionsError {
    #[error("The calibration solutions file '{file}' does not exist")]
    NotFound { file: String },

    #[error("'{file}' is not a regular file; cannot read it as calibration solutions")]
    NotAFile { file: String },

    #[error(
        "When reading {file}, expected header value {name} (index {index}) to be 0, but got '{got}' instead!"
    )]
    BadHeaderTag {
        file: String,
        index: usize,
        name: &'static str,
        got: i32,
    },

    #[error("When reading {file}, the header value {name} was negative ({got})")]
    NegativeCount {
        file: String,
        name: &'static str,
        got: i32,
    },

    #[error(
        "{file} is truncated: based on its header, expected at least {expected} bytes, but it has {actual}"
    )]
    Truncated {
        file: String,
        expected: u64,
        actual: u64,
    },

    #[error("The dimensions in the header of {file} are too large ({nsol}x{nant}x{nchan}x{npol})")]
    TooLarge {
        file: String,
        nsol: usize,
        nant: usize,
        nchan: usize,
        npol: usize,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FlagError {
    #[error("The reference antenna ({ref_ant}) is not available; there are only {nant} antennas")]
    BadRefAnt { ref_ant: usize, nant: usize },

    #[error("Cannot flag polarisation index {pol}; the solutions only have {npol} polarisations")]
    BadPolarisation { pol: usize, npol: usize },

    #[error("The flag cut must be a positive number, but got {0}")]
    BadFlagCut(f64),

    #[error(transparent)]
    Solutions(#[from] AOSolutionsError),

    #[cfg(feature = "plotting")]
    #[error(transparent)]
    Plot(#[from] super::plot::PlotError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
