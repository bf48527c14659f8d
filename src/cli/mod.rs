// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `flint` subcommands
//! are contained in modules.
//!
//! Arguments that can come from an arguments file must be optional (booleans
//! need `#[serde(default)]`), so that they're usable in the file *and* on the
//! command line.
//!
//! Only 3 things should be public in this module: `Flint`, `Flint::run`, and
//! `FlintError`.

#[macro_use]
mod common;
mod calibrate;
mod error;
mod solutions;
mod strategy;

pub use error::FlintError;

use std::path::PathBuf;

use clap::{AppSettings, Args, Parser, Subcommand};
use log::info;

use common::Warn;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = "Calibration and self-calibration pipeline tooling for radio interferometric data"
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Flint {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Only verify that arguments were correctly ingested and print out
    /// high-level information.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,

    /// Save the input arguments into a new TOML file that can be used to
    /// reproduce this run. Only used by subcommands that accept an arguments
    /// file.
    #[clap(long)]
    #[clap(global = true)]
    save_toml: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "create-strategy")]
    #[clap(about = "Write a strategy file with every option at its default value.")]
    StrategyCreate(strategy::StrategyCreateArgs),

    #[clap(alias = "verify-strategy")]
    #[clap(about = "Check that a strategy file only uses known stages, modes and options.")]
    StrategyVerify(strategy::StrategyVerifyArgs),

    #[clap(about = "Print the options a strategy file resolves to for a mode and round.")]
    StrategyOptions(strategy::StrategyOptionsArgs),

    #[clap(alias = "flag-solutions")]
    #[clap(about = "Flag outlying gains in AO-style calibration solutions.")]
    SolutionsFlag(solutions::SolutionsFlagArgs),

    #[clap(alias = "plot-solutions")]
    #[clap(
        about = r#"Plot calibration solutions. Only available if compiled with the "plotting" feature."#
    )]
    SolutionsPlot(solutions::SolutionsPlotArgs),

    #[clap(about = "Calibrate a measurement set against a model and apply the solutions, in a container.")]
    CalibrateApply(calibrate::CalibrateApplyArgs),

    #[clap(
        about = "Derive (and flag) bandpass solutions for each beam, then apply them to the science measurement sets of the same beams."
    )]
    BandpassApply(calibrate::BandpassApplyArgs),
}

impl Flint {
    pub fn run(self) -> Result<(), FlintError> {
        // Set up logging.
        let GlobalArgs {
            verbosity,
            dry_run,
            save_toml,
        } = self.global_opts;
        setup_logging(verbosity)
            .map_err(|e| FlintError::Generic(format!("Failed to initialise logging: {e}")))?;

        // Print the version of flint and its build-time information.
        let sub_command = match &self.command {
            Command::StrategyCreate(_) => "strategy-create",
            Command::StrategyVerify(_) => "strategy-verify",
            Command::StrategyOptions(_) => "strategy-options",
            Command::SolutionsFlag(_) => "solutions-flag",
            Command::SolutionsPlot(_) => "solutions-plot",
            Command::CalibrateApply(_) => "calibrate-apply",
            Command::BandpassApply(_) => "bandpass-apply",
        };
        info!("flint {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        macro_rules! merge_save_run {
            ($args:expr) => {{
                let args = $args.merge()?;
                if let Some(toml) = save_toml {
                    use std::{
                        fs::File,
                        io::{BufWriter, Write},
                    };

                    let mut f = BufWriter::new(File::create(toml)?);
                    let toml_str = toml::to_string(&args)?;
                    f.write_all(toml_str.as_bytes())?;
                }
                args.run(dry_run)?;
            }};
        }

        if save_toml.is_some()
            && !matches!(
                self.command,
                Command::CalibrateApply(_) | Command::BandpassApply(_)
            )
        {
            format!("{sub_command} doesn't take an arguments file; ignoring --save-toml").warn();
        }

        match self.command {
            Command::StrategyCreate(args) => args.run(dry_run)?,
            Command::StrategyVerify(args) => args.run(dry_run)?,
            Command::StrategyOptions(args) => args.run()?,

            Command::SolutionsFlag(args) => args.run(dry_run)?,
            Command::SolutionsPlot(args) => args.run()?,

            Command::CalibrateApply(args) => {
                merge_save_run!(args)
            }

            Command::BandpassApply(args) => {
                merge_save_run!(args)
            }
        }
        common::display_warnings();

        info!("flint {} complete.", sub_command);
        Ok(())
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
