// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for the solutions subcommands.

use tempfile::TempDir;

use flint::solutions::AOSolutions;

use crate::{flint, get_cmd_output, get_spiky_solutions_file};

#[test]
fn test_solutions_flag() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let sols = get_spiky_solutions_file(tmp_dir.path());

    let cmd = flint()
        .args(["solutions-flag", &format!("{}", sols.display())])
        .ok();
    assert!(cmd.is_ok(), "solutions-flag failed: {}", cmd.err().unwrap());

    let flagged_file = tmp_dir.path().join("obs.beam00.calibrate.preflagged.bin");
    assert!(flagged_file.exists());
    let flagged = AOSolutions::load(&flagged_file).unwrap();
    assert_eq!(flagged.bandpass().dim(), (1, 6, 32, 4));
    assert!(flagged.bandpass()[(0, 2, 10, 0)].re.is_nan());
    assert!(flagged.bandpass()[(0, 1, 10, 0)].re.is_finite());
}

#[test]
fn test_solutions_flag_dry_run_writes_nothing() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let sols = get_spiky_solutions_file(tmp_dir.path());

    flint()
        .args(["solutions-flag", &format!("{}", sols.display()), "--dry-run"])
        .assert()
        .success();
    assert!(!tmp_dir
        .path()
        .join("obs.beam00.calibrate.preflagged.bin")
        .exists());
}

#[test]
fn test_solutions_flag_bad_ref_ant() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let sols = get_spiky_solutions_file(tmp_dir.path());

    #[rustfmt::skip]
    let cmd = flint()
        .args([
            "solutions-flag",
            &format!("{}", sols.display()),
            "--ref-ant", "100",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("reference antenna"), "{stderr}");
}

#[test]
fn test_solutions_flag_truncated_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let sols = get_spiky_solutions_file(tmp_dir.path());
    let bytes = std::fs::read(&sols).unwrap();
    std::fs::write(&sols, &bytes[..bytes.len() / 2]).unwrap();

    let cmd = flint()
        .args(["solutions-flag", &format!("{}", sols.display())])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("truncated"), "{stderr}");
}

#[cfg(feature = "plotting")]
#[test]
fn test_solutions_plot() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let sols = get_spiky_solutions_file(tmp_dir.path());
    let plot_dir = tmp_dir.path().join("plots");

    #[rustfmt::skip]
    let cmd = flint()
        .args([
            "solutions-plot",
            &format!("{}", sols.display()),
            "--output-directory", &format!("{}", plot_dir.display()),
        ])
        .ok();
    assert!(cmd.is_ok(), "solutions-plot failed: {}", cmd.err().unwrap());
    assert!(plot_dir.join("obs.beam00.calibrate_amps.png").exists());
    assert!(plot_dir.join("obs.beam00.calibrate_phases.png").exists());
}
