// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all flint-related errors. This should be the *only* error
//! enum that is publicly visible.

use thiserror::Error;

#[cfg(feature = "plotting")]
use crate::solutions::plot::PlotError;
use crate::{
    pipeline::{ContainerError, GlobError, PipelineError},
    solutions::{AOSolutionsError, FlagError},
    strategy::StrategyError,
};

/// The *only* publicly visible error from flint. Each error message should
/// include a hint on where to go next, unless it's "generic".
#[derive(Error, Debug)]
pub enum FlintError {
    /// An error related to strategy files.
    #[error("{0}\n\nA strategy file with every option at its default can be written with `flint strategy-create`")]
    Strategy(String),

    /// Generic error surrounding calibration solutions.
    #[error("{0}\n\nCalibration solutions are expected in the binary format written by `calibrate`")]
    Solutions(String),

    /// An error related to solutions-flag.
    #[error("{0}\n\nSee `flint solutions-flag --help` for the flagging options")]
    SolutionsFlag(String),

    /// An error related to solutions-plot.
    #[error("{0}\n\nSee `flint solutions-plot --help`")]
    SolutionsPlot(String),

    /// An error related to finding measurement sets and running the
    /// calibration steps.
    #[error("{0}\n\nSee `flint calibrate-apply --help` or `flint bandpass-apply --help`")]
    Pipeline(String),

    /// An error from running something in a container.
    #[error("{0}\n\nCheck that the container image provides `calibrate` and `applysolutions`, and that singularity is available")]
    Container(String),

    /// An error related to argument files.
    #[error("{0}")]
    ArgFile(String),

    /// A generic error that can't be clarified further with documentation,
    /// e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

impl From<StrategyError> for FlintError {
    fn from(e: StrategyError) -> Self {
        match e {
            StrategyError::IO(_) => Self::Generic(e.to_string()),
            _ => Self::Strategy(e.to_string()),
        }
    }
}

impl From<AOSolutionsError> for FlintError {
    fn from(e: AOSolutionsError) -> Self {
        match e {
            AOSolutionsError::IO(_) => Self::Generic(e.to_string()),
            _ => Self::Solutions(e.to_string()),
        }
    }
}

impl From<FlagError> for FlintError {
    fn from(e: FlagError) -> Self {
        match e {
            FlagError::Solutions(e) => Self::from(e),
            #[cfg(feature = "plotting")]
            FlagError::Plot(e) => Self::from(e),
            FlagError::IO(_) => Self::Generic(e.to_string()),
            FlagError::BadRefAnt { .. }
            | FlagError::BadPolarisation { .. }
            | FlagError::BadFlagCut(_) => Self::SolutionsFlag(e.to_string()),
        }
    }
}

#[cfg(feature = "plotting")]
impl From<PlotError> for FlintError {
    fn from(e: PlotError) -> Self {
        Self::SolutionsPlot(e.to_string())
    }
}

impl From<ContainerError> for FlintError {
    fn from(e: ContainerError) -> Self {
        Self::Container(e.to_string())
    }
}

impl From<PipelineError> for FlintError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Container(e) => Self::from(e),
            PipelineError::Flag(e) => Self::from(e),
            PipelineError::Glob(GlobError::GlobCrate(_)) | PipelineError::IO(_) => {
                Self::Generic(e.to_string())
            }
            _ => Self::Pipeline(e.to_string()),
        }
    }
}

impl From<std::io::Error> for FlintError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<serde_yaml::Error> for FlintError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<toml::ser::Error> for FlintError {
    fn from(e: toml::ser::Error) -> Self {
        Self::ArgFile(e.to_string())
    }
}
