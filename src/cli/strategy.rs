// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Subcommands to create, verify and inspect strategy files.

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use log::info;

use super::common::{display_warnings, InfoPrinter, Warn};
use crate::{
    strategy::{
        copy_and_timestamp_strategy_file, create_default_yaml, get_mode_options,
        get_options_from_strategy, load_strategy_yaml, Mode, ModeMap, Round, WSCleanOptions,
    },
    FlintError,
};

const DEFAULT_STRATEGY_FILENAME: &str = "flint_strategy.yaml";

lazy_static::lazy_static! {
    static ref MODE_HELP: String =
        format!("The mode to get the options of. Supported modes: {}", *crate::strategy::MODES);
}

#[derive(Parser, Debug, Default)]
pub(super) struct StrategyCreateArgs {
    /// The strategy file to write. Default: flint_strategy.yaml
    #[clap(name = "OUTPUT_YAML", parse(from_os_str))]
    output_yaml: Option<PathBuf>,

    /// The number of self-calibration rounds to write, each with the wsclean,
    /// gaincal and masking defaults.
    #[clap(short = 'r', long)]
    selfcal_rounds: Option<usize>,
}

impl StrategyCreateArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), FlintError> {
        let output_yaml = self
            .output_yaml
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STRATEGY_FILENAME));
        if output_yaml.exists() {
            format!("Overwriting the existing {}", output_yaml.display()).warn();
        }
        display_warnings();

        if dry_run {
            info!(
                "Would write a default strategy with {} self-calibration rounds to {}",
                self.selfcal_rounds.unwrap_or(0),
                output_yaml.display()
            );
            return Ok(());
        }
        create_default_yaml(&output_yaml, self.selfcal_rounds)?;
        Ok(())
    }
}

#[derive(Parser, Debug, Default)]
pub(super) struct StrategyVerifyArgs {
    /// The strategy file to verify.
    #[clap(name = "STRATEGY_YAML", parse(from_os_str))]
    strategy: PathBuf,

    /// After verifying, copy the strategy into this directory with a
    /// timestamp in its name.
    #[clap(long, parse(from_os_str))]
    copy_to: Option<PathBuf>,
}

impl StrategyVerifyArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), FlintError> {
        let strategy = load_strategy_yaml(Some(&self.strategy), true)?;

        let mut printer = InfoPrinter::new(format!("{}", self.strategy.display()).into());
        let version = strategy
            .version
            .as_ref()
            .and_then(|v| serde_yaml::to_string(v).ok())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| "<none>".to_string());
        printer.push_line(format!("version: {version}").into());
        printer.push_block(stage_lines("defaults", &strategy.defaults));
        printer.push_block(stage_lines("initial", &strategy.initial));
        for (round, modes) in &strategy.selfcal {
            printer.push_block(stage_lines(&Round::SelfCal(*round).to_string(), modes));
        }
        if let Some(last) = strategy.last_round() {
            printer.push_line(format!("Rounds beyond {last} use round {last}").into());
        }
        printer.display();

        if let Some(copy_to) = self.copy_to {
            if dry_run {
                info!("Would copy the strategy into {}", copy_to.display());
            } else {
                let copy = copy_and_timestamp_strategy_file(&copy_to, &self.strategy)?;
                info!("Copied the strategy to {}", copy.display());
            }
        }
        Ok(())
    }
}

fn stage_lines(stage: &str, modes: &ModeMap) -> Vec<std::borrow::Cow<'static, str>> {
    let mut lines = vec![format!("{stage}:").into()];
    if modes.is_empty() {
        lines.push("  (nothing)".into());
    }
    for (mode, options) in modes {
        lines.push(format!("  {mode}: {} options", options.len()).into());
    }
    lines
}

#[derive(Parser, Debug, Default)]
pub(super) struct StrategyOptionsArgs {
    /// The strategy file to get options from.
    #[clap(name = "STRATEGY_YAML", parse(from_os_str))]
    strategy: PathBuf,

    #[clap(short, long, help = MODE_HELP.as_str(), default_value = "wsclean")]
    mode: String,

    /// The round to get the options of; "initial" or a self-calibration round
    /// number. Round 0 is the same as "initial".
    #[clap(short, long, default_value = "initial")]
    round: String,

    /// Also print the options that the strategy doesn't set, with their
    /// default values.
    #[clap(short, long)]
    all: bool,
}

impl StrategyOptionsArgs {
    pub(super) fn run(self) -> Result<(), FlintError> {
        let round = Round::from_str(&self.round)?;
        let mode = Mode::from_str(&self.mode).map_err(|_| {
            FlintError::Strategy(format!(
                "Unknown mode '{}'. Supported modes: {}",
                self.mode,
                *crate::strategy::MODES
            ))
        })?;
        let strategy = load_strategy_yaml(Some(&self.strategy), true)?;

        let options = if self.all {
            let mut options = mode.default_options();
            options.extend(get_options_from_strategy(
                Some(&strategy),
                &self.mode,
                round,
            ));
            options
        } else {
            get_options_from_strategy(Some(&strategy), &self.mode, round)
        };

        info!("{mode} options for {round}:");
        for line in serde_yaml::to_string(&options)?.lines() {
            info!("  {line}");
        }
        if mode == Mode::WSClean {
            let wsclean = get_mode_options::<WSCleanOptions>(Some(&strategy), round)?;
            info!("wsclean arguments: {}", wsclean.to_wsclean_args().join(" "));
        }
        Ok(())
    }
}
