// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{flint, get_cmd_output, get_spiky_solutions_file};

#[test]
fn test_strategy_create_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let strategy = tmp_dir.path().join("strategy.yaml");

    let cmd = flint()
        .args(["strategy-create", &format!("{}", strategy.display())])
        .ok();
    assert!(cmd.is_ok(), "strategy-create failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}

#[test]
fn test_solutions_flag_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let sols = get_spiky_solutions_file(tmp_dir.path());

    let cmd = flint()
        .args(["solutions-flag", &format!("{}", sols.display())])
        .ok();
    assert!(cmd.is_ok(), "solutions-flag failed: {}", cmd.err().unwrap());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}
