// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with strategies.

use thiserror::Error;

use super::{options::Mode, MODES, STAGES};

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("No strategy file was supplied")]
    NoStrategyFile,

    #[error("Strategy file '{0}' does not exist")]
    NotFound(String),

    #[error("Couldn't parse strategy file '{file}': {err}")]
    Yaml {
        file: String,
        err: serde_yaml::Error,
    },

    #[error("The strategy is not a layered mapping of stages to modes to options: {0}")]
    NotLayered(String),

    #[error("'{value}' is not a valid round; expected \"initial\" or a non-negative integer")]
    BadRound { value: String },

    #[error("Unknown stage '{stage}'; the supported stages are: {}", *STAGES)]
    UnknownStage { stage: String },

    #[error("Unknown mode '{mode}' in stage '{stage}'; the supported modes are: {}", *MODES)]
    UnknownMode { mode: String, stage: String },

    #[error("'{key}' is not a {mode} option (stage '{stage}')")]
    UnknownOption {
        key: String,
        mode: Mode,
        stage: String,
    },

    #[error("Bad value for {mode} option '{key}' (stage '{stage}'): {reason}")]
    BadOptionValue {
        key: String,
        mode: Mode,
        stage: String,
        reason: String,
    },

    #[error("Not overwriting existing file '{0}'")]
    AlreadyExists(String),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Errors from applying an options mapping to a mode's schema. These don't
/// know which stage the options came from; see [`OptionsError::in_stage`].
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("'{key}' is not a {mode} option")]
    Unknown { key: String, mode: Mode },

    #[error("Bad value for {mode} option '{key}': {reason}")]
    BadValue {
        key: String,
        mode: Mode,
        reason: String,
    },
}

impl OptionsError {
    pub(crate) fn in_stage(self, stage: &str) -> StrategyError {
        match self {
            OptionsError::Unknown { key, mode } => StrategyError::UnknownOption {
                key,
                mode,
                stage: stage.to_string(),
            },
            OptionsError::BadValue { key, mode, reason } => StrategyError::BadOptionValue {
                key,
                mode,
                stage: stage.to_string(),
                reason,
            },
        }
    }
}
