// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with running pipeline steps.

use thiserror::Error;

use crate::solutions::FlagError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Measurement set {0} does not have a nominated data column")]
    NoColumn(String),

    #[error("Measurement set {0} was not found")]
    MsNotFound(String),

    #[error("Calibrate model {0} was not found")]
    ModelNotFound(String),

    #[error("Solutions file {0} was not found")]
    SolutionsNotFound(String),

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("Expected to find {expected} measurement sets in {dir}, found {found}")]
    WrongNumberOfMs {
        dir: String,
        expected: usize,
        found: usize,
    },

    #[error("Couldn't determine the beam number of {0}; expected 'beamNN' in its name")]
    NoBeam(String),

    #[error("No solutions were found for beam {beam} (measurement set {ms})")]
    NoSolutionsForBeam { beam: u32, ms: String },

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Flag(#[from] FlagError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Container image {0} does not exist")]
    ImageNotFound(String),

    #[error("Couldn't run '{program}': {err}")]
    Spawn {
        program: String,
        err: std::io::Error,
    },

    #[error("'{command}' failed (exit code {code:?}): {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

#[derive(Error, Debug)]
/// Error type associated with glob helper functions.
pub enum GlobError {
    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
}
