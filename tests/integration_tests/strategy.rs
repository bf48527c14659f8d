// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for the strategy subcommands.

use indoc::indoc;
use tempfile::TempDir;

use crate::{flint, get_cmd_output};

#[test]
fn test_create_then_verify() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let strategy = tmp_dir.path().join("strategy.yaml");

    #[rustfmt::skip]
    let cmd = flint()
        .args([
            "strategy-create",
            &format!("{}", strategy.display()),
            "--selfcal-rounds", "2",
        ])
        .ok();
    assert!(cmd.is_ok(), "strategy-create failed: {}", cmd.err().unwrap());
    assert!(strategy.exists());

    let cmd = flint()
        .args(["strategy-verify", &format!("{}", strategy.display())])
        .ok();
    assert!(cmd.is_ok(), "strategy-verify failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("The strategy is valid"), "{stdout}");
    assert!(stdout.contains("selfcal round 2"), "{stdout}");
}

#[test]
fn test_verify_copies_with_timestamp() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let strategy = tmp_dir.path().join("strategy.yaml");
    let copy_dir = tmp_dir.path().join("copies");
    flint()
        .args(["strategy-create", &format!("{}", strategy.display())])
        .assert()
        .success();

    #[rustfmt::skip]
    flint()
        .args([
            "strategy-verify",
            &format!("{}", strategy.display()),
            "--copy-to", &format!("{}", copy_dir.display()),
        ])
        .assert()
        .success();
    let copies: Vec<_> = std::fs::read_dir(&copy_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(copies.len(), 1);
    assert_eq!(
        std::fs::read(&copies[0]).unwrap(),
        std::fs::read(&strategy).unwrap()
    );
}

#[test]
fn test_verify_unknown_option_fails() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let strategy = tmp_dir.path().join("strategy.yaml");
    std::fs::write(
        &strategy,
        indoc! {"
            version: '0.1'
            initial:
              wsclean:
                data_column: CORRECTED_DATA
                ThisDoesNotExist: 1
        "},
    )
    .unwrap();

    let cmd = flint()
        .args(["strategy-verify", &format!("{}", strategy.display())])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("ThisDoesNotExist"), "{stderr}");
}

#[test]
fn test_strategy_options() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let strategy = tmp_dir.path().join("strategy.yaml");
    std::fs::write(
        &strategy,
        indoc! {"
            version: '0.1'
            initial:
              wsclean:
                data_column: CORRECTED_DATA
                size: 7144
            selfcal:
              - wsclean:
                  data_column: EXAMPLE
              - wsclean:
                  size: 8000
        "},
    )
    .unwrap();

    #[rustfmt::skip]
    let cmd = flint()
        .args([
            "strategy-options",
            &format!("{}", strategy.display()),
            "--mode", "wsclean",
            "--round", "2",
        ])
        .ok();
    assert!(cmd.is_ok(), "strategy-options failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("data_column: CORRECTED_DATA"), "{stdout}");
    assert!(stdout.contains("size: 8000"), "{stdout}");
    assert!(stdout.contains("-size 8000 8000"), "{stdout}");

    #[rustfmt::skip]
    let cmd = flint()
        .args([
            "strategy-options",
            &format!("{}", strategy.display()),
            "--mode", "notamode",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("notamode"), "{stderr}");
}
