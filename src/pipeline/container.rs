// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Running commands inside containers.

use std::path::{Path, PathBuf};
use std::process::Command;

use itertools::Itertools;
use log::{debug, info, log_enabled, Level::Debug};

use super::ContainerError;

/// Something that can run a command inside a container image, with some
/// directories made visible to it.
pub trait ContainerRunner: Sync {
    fn run(&self, image: &Path, command: &str, bind_dirs: &[&Path]) -> Result<(), ContainerError>;
}

/// Runs commands with `singularity exec`.
#[derive(Debug, Clone)]
pub struct Singularity {
    /// The `singularity` executable.
    pub program: String,
}

impl Default for Singularity {
    fn default() -> Self {
        Singularity {
            program: "singularity".to_string(),
        }
    }
}

impl Singularity {
    /// Build the process that runs `command` in `image`. Bound directories are
    /// made absolute and de-duplicated.
    pub fn command(&self, image: &Path, command: &str, bind_dirs: &[&Path]) -> Command {
        let binds = bind_dirs
            .iter()
            .map(|d| absolute(d))
            .unique()
            .map(|d| d.display().to_string())
            .join(",");

        let mut process = Command::new(&self.program);
        process.arg("exec");
        if !binds.is_empty() {
            process.arg("--bind").arg(binds);
        }
        process.arg(image).args(command.split_whitespace());
        process
    }
}

fn absolute(dir: &Path) -> PathBuf {
    if dir.as_os_str().is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

impl ContainerRunner for Singularity {
    fn run(&self, image: &Path, command: &str, bind_dirs: &[&Path]) -> Result<(), ContainerError> {
        if !image.exists() {
            return Err(ContainerError::ImageNotFound(image.display().to_string()));
        }
        let mut process = self.command(image, command, bind_dirs);
        info!("Running '{command}' in {}", image.display());
        debug!("{process:?}");

        let output = process.output().map_err(|err| ContainerError::Spawn {
            program: self.program.clone(),
            err,
        })?;
        if log_enabled!(Debug) {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                debug!("{line}");
            }
        }
        if !output.status.success() {
            return Err(ContainerError::Failed {
                command: command.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Doesn't run anything; commands are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

impl ContainerRunner for DryRun {
    fn run(&self, image: &Path, command: &str, bind_dirs: &[&Path]) -> Result<(), ContainerError> {
        info!(
            "Would run '{command}' in {} (binding {})",
            image.display(),
            bind_dirs.iter().map(|d| d.display()).join(", ")
        );
        Ok(())
    }
}
