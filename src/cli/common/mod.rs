// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces. The `calibrate-apply` and
//! `bandpass-apply` subcommands both run things in a container, so the same
//! container arguments are shared between them.

mod printers;

pub(super) use printers::InfoPrinter;
pub(crate) use printers::{display_warnings, Warn};

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use super::FlintError;
use crate::pipeline::{ContainerRunner, DryRun, Singularity};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(FlintError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(FlintError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(FlintError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

/// Arguments for running `calibrate` and `applysolutions`.
#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ContainerArgs {
    /// The container image providing `calibrate` and `applysolutions`.
    #[clap(short = 'c', long, help_heading = "CONTAINER")]
    pub(super) calibrate_container: Option<PathBuf>,

    /// The singularity executable to run the container with. Default:
    /// singularity
    #[clap(long, help_heading = "CONTAINER")]
    pub(super) singularity: Option<String>,

    /// The column of the measurement sets to calibrate. Default: DATA
    #[clap(long, help_heading = "CONTAINER")]
    pub(super) data_column: Option<String>,
}

impl ContainerArgs {
    pub(super) fn merge(self, other: Self) -> Self {
        Self {
            calibrate_container: self.calibrate_container.or(other.calibrate_container),
            singularity: self.singularity.or(other.singularity),
            data_column: self.data_column.or(other.data_column),
        }
    }

    /// Get the container image, the thing that runs it, and the data column.
    /// Nothing is run for a dry run.
    pub(super) fn parse(
        self,
        dry_run: bool,
    ) -> Result<(PathBuf, Box<dyn ContainerRunner>, String), FlintError> {
        let image = self.calibrate_container.ok_or_else(|| {
            FlintError::Container("No container image was supplied (--calibrate-container)".into())
        })?;
        let runner: Box<dyn ContainerRunner> = if dry_run {
            Box::new(DryRun)
        } else {
            let mut singularity = Singularity::default();
            if let Some(program) = self.singularity {
                singularity.program = program;
            }
            Box::new(singularity)
        };
        let data_column = self.data_column.unwrap_or_else(|| "DATA".to_string());
        Ok((image, runner, data_column))
    }
}
