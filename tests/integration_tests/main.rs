// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod no_stderr;
mod solutions;
mod strategy;

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use ndarray::prelude::*;
use num_complex::Complex64;

use flint::solutions::AOSolutions;

fn flint() -> Command {
    Command::cargo_bin("flint").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Write a solutions file with 1 time solution, 6 antennas, 32 channels and 4
/// polarisations. The gains are smooth, except antenna 2 channel 10 has a
/// large amplitude spike.
fn get_spiky_solutions_file(tmp_dir: &Path) -> PathBuf {
    let mut bandpass = Array4::from_shape_fn((1, 6, 32, 4), |(_, ant, chan, pol)| {
        if pol == 1 || pol == 2 {
            return Complex64::new(0.0, 0.0);
        }
        let amp = 1.0 + 0.01 * ant as f64 + 0.001 * chan as f64;
        Complex64::from_polar(amp, 0.01 * chan as f64 * (1.0 + 0.1 * ant as f64))
    });
    bandpass[(0, 2, 10, 0)] = Complex64::new(50.0, 0.0);

    let file = tmp_dir.join("obs.beam00.calibrate.bin");
    AOSolutions::new(&file, bandpass).save(&file).unwrap();
    file
}
