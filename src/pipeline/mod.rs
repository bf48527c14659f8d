// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Steps of the bandpass calibration pipeline.
//!
//! The calibration itself is done by `calibrate` and `applysolutions` inside a
//! container; this module builds their commands, runs them for each
//! measurement set, and pairs science measurement sets with the bandpass
//! solutions of the same beam.

pub mod commands;
pub mod container;
mod error;
mod glob;
mod ms;

pub use commands::*;
pub use container::{ContainerRunner, DryRun, Singularity};
pub use error::*;
pub use ms::MS;

use std::path::{Path, PathBuf};

use log::{info, warn};
use rayon::prelude::*;

use crate::solutions::{flag_aosolutions_file, flag::preflagged_path, FlagOptions};

/// Run a `calibrate` command in a container.
pub fn run_calibrate(
    calibrate_cmd: &CalibrateCommand,
    runner: &dyn ContainerRunner,
    container: &Path,
) -> Result<(), PipelineError> {
    let bind_dirs = [
        parent(&calibrate_cmd.solution_path),
        parent(&calibrate_cmd.ms.path),
    ];
    runner.run(container, &calibrate_cmd.cmd, &bind_dirs)?;
    Ok(())
}

/// Run an `applysolutions` command in a container.
pub fn run_apply_solutions(
    apply_solutions_cmd: &ApplySolutionsCommand,
    runner: &dyn ContainerRunner,
    container: &Path,
) -> Result<(), PipelineError> {
    if !apply_solutions_cmd.ms.path.exists() {
        return Err(PipelineError::MsNotFound(
            apply_solutions_cmd.ms.path.display().to_string(),
        ));
    }
    let bind_dirs = [
        parent(&apply_solutions_cmd.solution_path),
        parent(&apply_solutions_cmd.ms.path),
    ];
    runner.run(container, &apply_solutions_cmd.cmd, &bind_dirs)?;
    Ok(())
}

fn parent(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Calibrate a measurement set against a model and apply the solutions. The
/// returned measurement set nominates the column with the corrected data.
pub fn calibrate_apply_ms(
    ms_path: &Path,
    model_path: &Path,
    runner: &dyn ContainerRunner,
    container: &Path,
    data_column: &str,
) -> Result<MS, PipelineError> {
    let ms = MS::new(ms_path, Some(data_column));
    info!("Will be attempting to calibrate {ms}");

    let calibrate_cmd = create_calibrate_cmd(&ms, model_path, None, None)?;
    run_calibrate(&calibrate_cmd, runner, container)?;

    let apply_solutions_cmd = create_apply_solutions_cmd(&ms, &calibrate_cmd.solution_path, None)?;
    run_apply_solutions(&apply_solutions_cmd, runner, container)?;

    Ok(apply_solutions_cmd.ms)
}

/// How bandpass solutions are flagged after they are derived.
#[derive(Debug, Clone)]
pub struct BandpassFlagging {
    pub ref_ant: usize,
    pub flag_cut: f64,
    pub options: FlagOptions,

    /// Write plots of the flagged solutions to a "preflagger" directory next
    /// to each measurement set.
    pub plot: bool,
}

impl Default for BandpassFlagging {
    fn default() -> Self {
        BandpassFlagging {
            ref_ant: 0,
            flag_cut: 3.0,
            options: FlagOptions::default(),
            plot: true,
        }
    }
}

/// Flag the solutions of a `calibrate` command, returning the command with
/// the flagged solutions.
pub fn flag_calibrate_cmd(
    calibrate_cmd: &CalibrateCommand,
    flagging: &BandpassFlagging,
) -> Result<CalibrateCommand, PipelineError> {
    let plot_dir = if flagging.plot {
        let plot_dir = parent(&calibrate_cmd.ms.path).join("preflagger");
        std::fs::create_dir_all(&plot_dir)?;
        Some(plot_dir)
    } else {
        None
    };
    let flagged = flag_aosolutions_file(
        &calibrate_cmd.solution_path,
        flagging.ref_ant,
        flagging.flag_cut,
        &flagging.options,
        plot_dir.as_deref(),
    )?;
    Ok(calibrate_cmd.with_preflagged_solutions(flagged))
}

/// Find the measurement sets in a directory. If `expected` is given, exactly
/// that many must be found.
pub fn find_measurement_sets(dir: &Path, expected: Option<usize>) -> Result<Vec<MS>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::NotADirectory(dir.display().to_string()));
    }
    let mss: Vec<MS> = glob::get_measurement_sets(dir)?
        .into_iter()
        .map(MS::cast)
        .collect();
    if let Some(expected) = expected {
        if mss.len() != expected {
            return Err(PipelineError::WrongNumberOfMs {
                dir: dir.display().to_string(),
                expected,
                found: mss.len(),
            });
        }
    }
    info!("Found {} measurement sets in {}", mss.len(), dir.display());
    Ok(mss)
}

/// Derive bandpass solutions for every measurement set in a directory,
/// flagging them if asked. Measurement sets are processed in parallel.
pub fn calibrate_bandpass(
    bandpass_dir: &Path,
    model_path: &Path,
    runner: &dyn ContainerRunner,
    container: &Path,
    data_column: &str,
    flagging: Option<&BandpassFlagging>,
) -> Result<Vec<CalibrateCommand>, PipelineError> {
    let mss = find_measurement_sets(bandpass_dir, None)?;
    mss.into_par_iter()
        .map(|ms| -> Result<CalibrateCommand, PipelineError> {
            let ms = ms.with_column(Some(data_column));
            let calibrate_cmd = create_calibrate_cmd(&ms, model_path, None, None)?;
            run_calibrate(&calibrate_cmd, runner, container)?;
            match flagging {
                Some(flagging) => flag_calibrate_cmd(&calibrate_cmd, flagging),
                None => Ok(calibrate_cmd),
            }
        })
        .collect()
}

/// Pair the measurement sets in a bandpass directory with their existing
/// solutions. With `use_preflagged`, the flagged solutions are used.
pub fn find_existing_solutions(
    bandpass_dir: &Path,
    use_preflagged: bool,
) -> Result<Vec<CalibrateCommand>, PipelineError> {
    let mut calibrate_cmds = vec![];
    for ms in find_measurement_sets(bandpass_dir, None)? {
        let mut solution_path = default_solutions_path(&ms.path);
        if use_preflagged {
            solution_path = preflagged_path(&solution_path);
        }
        if !solution_path.exists() {
            return Err(PipelineError::SolutionsNotFound(
                solution_path.display().to_string(),
            ));
        }
        calibrate_cmds.push(CalibrateCommand {
            cmd: String::new(),
            solution_path,
            ms,
            preflagged: use_preflagged,
        });
    }
    if calibrate_cmds.is_empty() {
        warn!("No bandpass solutions found in {}", bandpass_dir.display());
    }
    Ok(calibrate_cmds)
}

/// Get the solutions to apply to a measurement set; they come from the
/// bandpass measurement set of the same beam.
pub fn select_aosolution_for_ms(
    calibrate_cmds: &[CalibrateCommand],
    ms: &MS,
) -> Result<PathBuf, PipelineError> {
    let beam = ms
        .beam()
        .ok_or_else(|| PipelineError::NoBeam(ms.path.display().to_string()))?;
    calibrate_cmds
        .iter()
        .find(|c| c.ms.beam() == Some(beam))
        .map(|c| {
            info!(
                "Selected {} for {}",
                c.solution_path.display(),
                ms.path.display()
            );
            c.solution_path.clone()
        })
        .ok_or_else(|| PipelineError::NoSolutionsForBeam {
            beam,
            ms: ms.path.display().to_string(),
        })
}

/// Apply existing bandpass solutions to every measurement set in a science
/// directory. Measurement sets are processed in parallel. The returned
/// measurement sets nominate the column with the corrected data.
pub fn apply_bandpass(
    science_dir: &Path,
    calibrate_cmds: &[CalibrateCommand],
    runner: &dyn ContainerRunner,
    container: &Path,
    data_column: &str,
    output_column: Option<&str>,
    expected_ms: Option<usize>,
) -> Result<Vec<MS>, PipelineError> {
    let mss = find_measurement_sets(science_dir, expected_ms)?;
    mss.into_par_iter()
        .map(|ms| -> Result<MS, PipelineError> {
            let ms = ms.with_column(Some(data_column));
            let solutions = select_aosolution_for_ms(calibrate_cmds, &ms)?;
            let apply_solutions_cmd = create_apply_solutions_cmd(&ms, &solutions, output_column)?;
            run_apply_solutions(&apply_solutions_cmd, runner, container)?;
            Ok(apply_solutions_cmd.ms)
        })
        .collect()
}
