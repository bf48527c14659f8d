// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Subcommands that run `calibrate` and `applysolutions` in a container.


use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::common::{display_warnings, ContainerArgs, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    pipeline::{
        apply_bandpass, calibrate_apply_ms, calibrate_bandpass, create_calibrate_cmd,
        find_existing_solutions, find_measurement_sets, flag_calibrate_cmd, run_calibrate,
        BandpassFlagging, MS,
    },
    solutions::{flag::DEFAULT_MIN_FINITE_SAMPLES, FlagOptions},
    FlintError,
};

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct CalibrateApplyArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "container")]
    #[serde(default)]
    container_args: ContainerArgs,

    /// The measurement set to calibrate.
    #[clap(long, parse(from_os_str), help_heading = "INPUT DATA")]
    ms: Option<PathBuf>,

    /// The model to calibrate against, as used by `calibrate -m`.
    #[clap(short, long, parse(from_os_str), help_heading = "INPUT DATA")]
    model: Option<PathBuf>,
}

impl CalibrateApplyArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified
    /// into a single struct, preferring CLI arguments over those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<CalibrateApplyArgs, FlintError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let CalibrateApplyArgs {
                args_file: _,
                container_args,
                ms,
                model,
            } = unpack_arg_file!(arg_file);

            Ok(CalibrateApplyArgs {
                args_file: None,
                container_args: cli_args.container_args.merge(container_args),
                ms: cli_args.ms.or(ms),
                model: cli_args.model.or(model),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), FlintError> {
        let CalibrateApplyArgs {
            args_file: _,
            container_args,
            ms,
            model,
        } = self;
        let ms = ms.ok_or_else(|| missing("--ms"))?;
        let model = model.ok_or_else(|| missing("--model"))?;
        let (container, runner, data_column) = container_args.parse(dry_run)?;

        let mut printer = InfoPrinter::new("Calibrating and applying solutions".into());
        printer.push_line(format!("Measurement set: {} ({data_column})", ms.display()).into());
        printer.push_line(format!("Model: {}", model.display()).into());
        printer.push_line(format!("Container: {}", container.display()).into());
        printer.display();
        display_warnings();

        if dry_run {
            // The solutions don't exist yet, so only calibration can be shown.
            let ms = MS::new(&ms, Some(data_column.as_str()));
            let calibrate_cmd = create_calibrate_cmd(&ms, &model, None, None)?;
            run_calibrate(&calibrate_cmd, &*runner, &container)?;
            info!(
                "Would then apply {} to {}",
                calibrate_cmd.solution_path.display(),
                ms.path.display()
            );
            return Ok(());
        }

        let calibrated = calibrate_apply_ms(&ms, &model, &*runner, &container, &data_column)?;
        info!("Calibrated data are in {calibrated}");
        Ok(())
    }
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct BandpassApplyArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "container")]
    #[serde(default)]
    container_args: ContainerArgs,

    /// The directory containing the bandpass measurement sets, one per beam.
    #[clap(short, long, parse(from_os_str), help_heading = "INPUT DATA")]
    bandpass_dir: Option<PathBuf>,

    /// The directory containing the science measurement sets, one per beam.
    #[clap(short, long, parse(from_os_str), help_heading = "INPUT DATA")]
    science_dir: Option<PathBuf>,

    /// The model to calibrate the bandpass measurement sets against.
    #[clap(short, long, parse(from_os_str), help_heading = "INPUT DATA")]
    model: Option<PathBuf>,

    /// The number of science measurement sets that must be found.
    #[clap(long, help_heading = "INPUT DATA")]
    expected_ms: Option<usize>,

    /// Don't calibrate; use the solutions already next to the bandpass
    /// measurement sets.
    #[clap(long, help_heading = "CALIBRATION")]
    #[serde(default)]
    use_existing_solutions: bool,

    /// Don't flag the bandpass solutions before applying them.
    #[clap(long, help_heading = "FLAGGING")]
    #[serde(default)]
    no_flagging: bool,

    /// The antenna that phases are made relative to when flagging. Default: 0
    #[clap(long, help_heading = "FLAGGING")]
    ref_ant: Option<usize>,

    /// The number of robust standard deviations beyond which channels are
    /// flagged. Default: 3.0
    #[clap(long, help_heading = "FLAGGING")]
    flag_cut: Option<f64>,

    /// Antennas with fewer finite channels than this are flagged entirely.
    /// Default: 5
    #[clap(long, help_heading = "FLAGGING")]
    min_finite_samples: Option<usize>,

    /// Don't plot the flagged solutions.
    #[clap(long, help_heading = "FLAGGING")]
    #[serde(default)]
    no_plots: bool,

    /// The column to write the calibrated science data to. If this is the
    /// data column, it is overwritten; otherwise the calibrated data go to
    /// CORRECTED_DATA.
    #[clap(long, help_heading = "OUTPUT")]
    output_column: Option<String>,
}

impl BandpassApplyArgs {
    /// Consolidate the command-line arguments with those in the arguments
    /// file (if any), preferring CLI arguments.
    pub(super) fn merge(self) -> Result<BandpassApplyArgs, FlintError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            let BandpassApplyArgs {
                args_file: _,
                container_args,
                bandpass_dir,
                science_dir,
                model,
                expected_ms,
                use_existing_solutions,
                no_flagging,
                ref_ant,
                flag_cut,
                min_finite_samples,
                no_plots,
                output_column,
            } = unpack_arg_file!(arg_file);

            Ok(BandpassApplyArgs {
                args_file: None,
                container_args: cli_args.container_args.merge(container_args),
                bandpass_dir: cli_args.bandpass_dir.or(bandpass_dir),
                science_dir: cli_args.science_dir.or(science_dir),
                model: cli_args.model.or(model),
                expected_ms: cli_args.expected_ms.or(expected_ms),
                use_existing_solutions: cli_args.use_existing_solutions || use_existing_solutions,
                no_flagging: cli_args.no_flagging || no_flagging,
                ref_ant: cli_args.ref_ant.or(ref_ant),
                flag_cut: cli_args.flag_cut.or(flag_cut),
                min_finite_samples: cli_args.min_finite_samples.or(min_finite_samples),
                no_plots: cli_args.no_plots || no_plots,
                output_column: cli_args.output_column.or(output_column),
            })
        } else {
            Ok(cli_args)
        }
    }

    /// Turn the flagging arguments into parameters. `None` means no flagging.
    fn flagging(&self) -> Option<BandpassFlagging> {
        if self.no_flagging {
            return None;
        }
        let default = BandpassFlagging::default();
        Some(BandpassFlagging {
            ref_ant: self.ref_ant.unwrap_or(default.ref_ant),
            flag_cut: self.flag_cut.unwrap_or(default.flag_cut),
            options: FlagOptions {
                min_finite_samples: self.min_finite_samples.unwrap_or(DEFAULT_MIN_FINITE_SAMPLES),
                polarisations: None,
            },
            plot: !self.no_plots,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), FlintError> {
        let flagging = self.flagging();
        let BandpassApplyArgs {
            args_file: _,
            container_args,
            bandpass_dir,
            science_dir,
            model,
            expected_ms,
            use_existing_solutions,
            no_flagging: _,
            ref_ant: _,
            flag_cut: _,
            min_finite_samples: _,
            no_plots: _,
            output_column,
        } = self;
        let bandpass_dir = bandpass_dir.ok_or_else(|| missing("--bandpass-dir"))?;
        let science_dir = science_dir.ok_or_else(|| missing("--science-dir"))?;
        let model = match (model, use_existing_solutions) {
            (Some(model), false) => Some(model),
            (None, false) => return Err(missing("--model")),
            (Some(_), true) => {
                "A model was given, but existing solutions are used; ignoring the model".warn();
                None
            }
            (None, true) => None,
        };
        let (container, runner, data_column) = container_args.parse(dry_run)?;

        let mut printer = InfoPrinter::new("Bandpass calibration".into());
        printer.push_block(vec![
            format!("Bandpass measurement sets: {}", bandpass_dir.display()).into(),
            format!("Science measurement sets: {}", science_dir.display()).into(),
            format!("Data column: {data_column}").into(),
        ]);
        match &model {
            Some(model) => {
                printer.push_line(format!("Calibrating against {}", model.display()).into())
            }
            None => printer.push_line("Using existing solutions".into()),
        }
        match &flagging {
            Some(f) => printer.push_line(
                format!(
                    "Flagging with reference antenna {}, cut {}, minimum finite samples {}",
                    f.ref_ant, f.flag_cut, f.options.min_finite_samples
                )
                .into(),
            ),
            None => printer.push_line("No flagging".into()),
        }
        printer.display();
        display_warnings();

        if dry_run {
            let bandpass_mss = find_measurement_sets(&bandpass_dir, None)?;
            let science_mss = find_measurement_sets(&science_dir, expected_ms)?;
            for ms in bandpass_mss.iter().chain(science_mss.iter()) {
                info!("  {ms}");
            }
            info!("Dry run; nothing was calibrated");
            return Ok(());
        }

        let calibrate_cmds = match model {
            Some(model) => calibrate_bandpass(
                &bandpass_dir,
                &model,
                &*runner,
                &container,
                &data_column,
                flagging.as_ref(),
            )?,
            None => {
                let existing = find_existing_solutions(&bandpass_dir, false)?;
                match &flagging {
                    Some(flagging) => existing
                        .iter()
                        .map(|cmd| flag_calibrate_cmd(cmd, flagging))
                        .collect::<Result<Vec<_>, _>>()?,
                    None => existing,
                }
            }
        };
        let calibrated = apply_bandpass(
            &science_dir,
            &calibrate_cmds,
            &*runner,
            &container,
            &data_column,
            output_column.as_deref(),
            expected_ms,
        )?;
        for ms in &calibrated {
            info!("Calibrated {ms}");
        }
        Ok(())
    }
}

fn missing(arg: &str) -> FlintError {
    FlintError::Pipeline(format!("The {arg} argument is required"))
}
