// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Construction of `calibrate` and `applysolutions` commands.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};

use super::{PipelineError, MS};
use crate::solutions::CALIBRATE_SUFFIX;

/// The column `applysolutions` writes to when it doesn't overwrite the input
/// column.
pub const CORRECTED_DATA: &str = "CORRECTED_DATA";

/// A `calibrate` command and the solutions file it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrateCommand {
    /// The command to run. This is empty for solutions that already exist.
    pub cmd: String,

    pub solution_path: PathBuf,

    pub ms: MS,

    /// Have the solutions been flagged?
    pub preflagged: bool,
}

impl CalibrateCommand {
    /// Get a copy of this command pointing at flagged solutions.
    pub fn with_preflagged_solutions<P: AsRef<Path>>(&self, solution_path: P) -> CalibrateCommand {
        CalibrateCommand {
            solution_path: solution_path.as_ref().to_path_buf(),
            preflagged: true,
            ..self.clone()
        }
    }
}

/// An `applysolutions` command.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplySolutionsCommand {
    pub cmd: String,

    /// The solutions to be applied.
    pub solution_path: PathBuf,

    /// The measurement set, nominating the column that will hold the
    /// corrected data.
    pub ms: MS,
}

/// The default solutions path for a measurement set, e.g. "x.ms" gives
/// "x.calibrate.bin".
pub fn default_solutions_path(ms_path: &Path) -> PathBuf {
    let stem = ms_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    ms_path.with_file_name(format!("{stem}{CALIBRATE_SUFFIX}"))
}

/// Make a `calibrate` command. The measurement set must nominate a column and
/// the model must exist. If `solution_path` isn't given, see
/// [`default_solutions_path`]. Any extra arguments are passed to `calibrate`
/// as "-key value".
pub fn create_calibrate_cmd(
    ms: &MS,
    calibrate_model: &Path,
    solution_path: Option<&Path>,
    extra_args: Option<&IndexMap<String, String>>,
) -> Result<CalibrateCommand, PipelineError> {
    info!("Creating calibrate command for {}", ms.path.display());
    let column = ms
        .column
        .as_deref()
        .ok_or_else(|| PipelineError::NoColumn(ms.path.display().to_string()))?;
    if !calibrate_model.exists() {
        return Err(PipelineError::ModelNotFound(
            calibrate_model.display().to_string(),
        ));
    }

    let solution_path = solution_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| default_solutions_path(&ms.path));

    let mut cmd = vec![
        "calibrate".to_string(),
        "-datacolumn".to_string(),
        column.to_string(),
        "-m".to_string(),
        calibrate_model.display().to_string(),
    ];
    if let Some(extra_args) = extra_args {
        for (key, value) in extra_args {
            cmd.push(format!("-{key}"));
            cmd.push(value.clone());
        }
    }
    cmd.push(ms.path.display().to_string());
    cmd.push(solution_path.display().to_string());
    let cmd = cmd.join(" ");
    debug!("Constructed calibrate command: {cmd}");

    Ok(CalibrateCommand {
        cmd,
        solution_path,
        ms: ms.clone(),
        preflagged: false,
    })
}

/// Make an `applysolutions` command. `applysolutions` can't name its output
/// column; if `output_column` is the measurement set's column, that column is
/// overwritten ("-nocopy"), otherwise the corrected data goes to
/// CORRECTED_DATA ("-copy"). The returned command's measurement set nominates
/// the column holding the corrected data.
pub fn create_apply_solutions_cmd(
    ms: &MS,
    solutions_file: &Path,
    output_column: Option<&str>,
) -> Result<ApplySolutionsCommand, PipelineError> {
    if !ms.path.exists() {
        return Err(PipelineError::MsNotFound(ms.path.display().to_string()));
    }
    let input_column = ms
        .column
        .as_deref()
        .ok_or_else(|| PipelineError::NoColumn(ms.path.display().to_string()))?;
    if !solutions_file.exists() {
        return Err(PipelineError::SolutionsNotFound(
            solutions_file.display().to_string(),
        ));
    }

    let (copy_mode, output_column) = match output_column {
        Some(c) if c == input_column => ("-nocopy", c),
        _ => ("-copy", CORRECTED_DATA),
    };
    info!("Setting copy mode {copy_mode}");

    let cmd = format!(
        "applysolutions -datacolumn {input_column} {copy_mode} {} {}",
        ms.path.display(),
        solutions_file.display()
    );
    info!("Constructed applysolutions command: {cmd}");

    Ok(ApplySolutionsCommand {
        cmd,
        solution_path: solutions_file.to_path_buf(),
        ms: ms.with_column(Some(output_column)),
    })
}
