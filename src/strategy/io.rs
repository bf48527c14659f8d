// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading and writing strategy files.

use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{verify_configuration, Strategy, StrategyError};

/// Read a strategy from a YAML file. A strategy file must be given; `None` is
/// an error, as this is typically an unset option being passed along.
pub fn load_strategy_yaml(
    input_yaml: Option<&Path>,
    verify: bool,
) -> Result<Strategy, StrategyError> {
    let input_yaml = input_yaml.ok_or(StrategyError::NoStrategyFile)?;
    if !input_yaml.exists() {
        return Err(StrategyError::NotFound(input_yaml.display().to_string()));
    }
    info!("Loading {}", input_yaml.display());

    let contents = std::fs::read_to_string(input_yaml)?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&contents).map_err(|err| StrategyError::Yaml {
            file: input_yaml.display().to_string(),
            err,
        })?;
    let strategy = Strategy::try_from(value)?;

    info!("Loaded strategy:");
    info!("  initial modes: [{}]", mode_names(&strategy.initial));
    if !strategy.defaults.is_empty() {
        info!("  default modes: [{}]", mode_names(&strategy.defaults));
    }
    for (round, modes) in &strategy.selfcal {
        info!("  self-calibration round {round} modes: [{}]", mode_names(modes));
    }

    if verify {
        verify_configuration(&strategy)?;
    }
    Ok(strategy)
}

fn mode_names(modes: &super::ModeMap) -> String {
    modes.keys().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
}

/// Write a strategy to a YAML file. The written file loads back into the same
/// strategy.
pub fn write_strategy_to_yaml(
    strategy: &Strategy,
    output_path: &Path,
) -> Result<PathBuf, StrategyError> {
    let contents = serde_yaml::to_string(strategy).map_err(|err| StrategyError::Yaml {
        file: output_path.display().to_string(),
        err,
    })?;
    std::fs::write(output_path, contents)?;
    info!("Wrote strategy to {}", output_path.display());
    Ok(output_path.to_path_buf())
}

/// Write a strategy file with all of the default options, to be used as a
/// starting point for editing. See [`Strategy::with_defaults`].
pub fn create_default_yaml(
    output_yaml: &Path,
    selfcal_rounds: Option<usize>,
) -> Result<PathBuf, StrategyError> {
    info!("Generating a default strategy");
    if let Some(n) = selfcal_rounds {
        info!("Creating {n} self-calibration rounds");
    }
    let strategy = Strategy::with_defaults(selfcal_rounds);
    write_strategy_to_yaml(&strategy, output_yaml)
}

/// Copy a strategy file into a directory, adding the current local time to
/// its name, e.g. "strategy.yaml" becomes "strategy-20240101-123456.yaml".
/// The copy is byte-for-byte identical. An existing file is never
/// overwritten.
pub fn copy_and_timestamp_strategy_file(
    output_dir: &Path,
    input_yaml: &Path,
) -> Result<PathBuf, StrategyError> {
    if !input_yaml.is_file() {
        return Err(StrategyError::NotFound(input_yaml.display().to_string()));
    }
    let stem = input_yaml
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = input_yaml
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let output = output_dir.join(format!("{stem}-{stamp}{ext}"));
    if output.exists() {
        return Err(StrategyError::AlreadyExists(output.display().to_string()));
    }

    std::fs::create_dir_all(output_dir)?;
    std::fs::copy(input_yaml, &output)?;
    debug!("Copied {} to {}", input_yaml.display(), output.display());
    Ok(output)
}
