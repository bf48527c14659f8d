// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Subcommands to flag and plot calibration solutions.

use std::path::PathBuf;

use clap::Parser;
use log::info;

use super::common::{display_warnings, InfoPrinter, Warn};
use crate::{
    solutions::{
        flag::DEFAULT_MIN_FINITE_SAMPLES, flag_aosolutions_file, AOSolutions, FlagOptions,
    },
    FlintError,
};

#[derive(Parser, Debug, Default)]
pub(super) struct SolutionsFlagArgs {
    /// The AO-style calibration solutions file to flag. The flagged solutions
    /// are written next to it, with ".preflagged.bin" replacing ".bin".
    #[clap(name = "SOLUTIONS_FILE", parse(from_os_str))]
    solutions: PathBuf,

    /// The antenna that phases are made relative to.
    #[clap(short, long, default_value = "0")]
    ref_ant: usize,

    /// Channels deviating from their antenna's median by more than this many
    /// robust standard deviations are flagged.
    #[clap(short, long, default_value = "3.0")]
    flag_cut: f64,

    /// Antennas with fewer finite channels than this are flagged entirely.
    /// Default: 5
    #[clap(long)]
    min_finite_samples: Option<usize>,

    /// The polarisation indices to inspect. The default is XX and YY for
    /// 4-polarisation solutions, otherwise all polarisations.
    #[clap(short, long, multiple_values(true))]
    polarisations: Option<Vec<usize>>,

    /// Write plots of the flagged solutions into this directory.
    #[clap(long, parse(from_os_str))]
    plot_dir: Option<PathBuf>,
}

impl SolutionsFlagArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), FlintError> {
        let SolutionsFlagArgs {
            solutions,
            ref_ant,
            flag_cut,
            min_finite_samples,
            polarisations,
            plot_dir,
        } = self;
        let opts = FlagOptions {
            min_finite_samples: min_finite_samples.unwrap_or(DEFAULT_MIN_FINITE_SAMPLES),
            polarisations,
        };
        if opts.min_finite_samples == 0 {
            "A minimum of 0 finite samples never flags whole antennas".warn();
        }
        if plot_dir.is_some() && !cfg!(feature = "plotting") {
            "flint was compiled without the \"plotting\" feature; no plots will be made".warn();
        }

        let input = AOSolutions::load(&solutions)?;
        let mut printer = InfoPrinter::new("Flagging calibration solutions".into());
        printer.push_block(vec![
            format!("Input: {}", solutions.display()).into(),
            format!(
                "{} time solutions, {} antennas, {} channels, {} polarisations",
                input.nsol(),
                input.nant(),
                input.nchan(),
                input.npol()
            )
            .into(),
            format!("{} gains already flagged", input.num_flagged()).into(),
        ]);
        printer.push_line(
            format!(
                "Reference antenna {ref_ant}, flag cut {flag_cut}, minimum finite samples {}",
                opts.min_finite_samples
            )
            .into(),
        );
        printer.display();
        display_warnings();

        if dry_run {
            info!("Dry run; not flagging");
            return Ok(());
        }

        let output = flag_aosolutions_file(
            &solutions,
            ref_ant,
            flag_cut,
            &opts,
            plot_dir.as_deref(),
        )?;
        let flagged = AOSolutions::load(&output)?;
        info!(
            "{} of {} gains are now flagged",
            flagged.num_flagged(),
            flagged.bandpass().len()
        );
        Ok(())
    }
}

#[derive(Parser, Debug, Default)]
pub(super) struct SolutionsPlotArgs {
    #[clap(name = "SOLUTIONS_FILES", parse(from_os_str))]
    files: Vec<PathBuf>,

    /// The reference antenna to use. If this isn't specified, phases aren't
    /// referenced to any antenna.
    #[clap(short, long)]
    ref_ant: Option<usize>,

    /// The directory to write the plots into. If this doesn't exist, it is
    /// created. By default, plots are written next to the solutions files.
    #[clap(short, long, parse(from_os_str))]
    output_directory: Option<PathBuf>,
}

impl SolutionsPlotArgs {
    #[cfg(not(feature = "plotting"))]
    pub(super) fn run(self) -> Result<(), FlintError> {
        Err(FlintError::SolutionsPlot(
            "flint was not compiled with the \"plotting\" feature.\nYou need to compile flint with this feature to plot solutions".to_string(),
        ))
    }

    #[cfg(feature = "plotting")]
    pub(super) fn run(self) -> Result<(), FlintError> {
        use crate::solutions::plot::plot_solutions;

        if self.files.is_empty() {
            return Err(FlintError::SolutionsPlot(
                "No solutions files supplied!".to_string(),
            ));
        }
        if let Some(dir) = &self.output_directory {
            std::fs::create_dir_all(dir)?;
        }

        for file in &self.files {
            let sols = AOSolutions::load(file)?;
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let base = match &self.output_directory {
                Some(dir) => dir.join(stem),
                None => file.with_file_name(stem),
            };
            for plot in plot_solutions(&sols, self.ref_ant, &base)? {
                info!("Wrote {}", plot.display());
            }
        }
        Ok(())
    }
}
