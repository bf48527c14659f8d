// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::Path;

use indoc::indoc;
use serde_yaml::Value;
use tempfile::TempDir;

use super::*;

const PACKAGE_STRATEGY: &str = indoc! {"
    version: 0.1
    defaults:
      masking:
        flood_fill_positive_seed_clip: 4.5
        flood_fill_positive_flood_clip: 1.25
    initial:
      wsclean:
        data_column: CORRECTED_DATA
        multiscale: true
        size: 7144
        minuvw_m: 235
      masking:
        base_snr_clip: 4
    selfcal:
      1:
        wsclean:
          data_column: EXAMPLE
        masking:
          flood_fill_positive_seed_clip: 40
        gaincal:
          solint: 60s
          calmode: p
      2:
        wsclean:
          multiscale: false
      3:
        wsclean:
          data_column: TheLastRoundIs3
        gaincal:
          calmode: ap
"};

fn package_strategy() -> Strategy {
    let value: Value = serde_yaml::from_str(PACKAGE_STRATEGY).unwrap();
    Strategy::try_from(value).unwrap()
}

fn write_package_strategy(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("strategy.yaml");
    std::fs::write(&path, PACKAGE_STRATEGY).unwrap();
    path
}

#[test]
fn test_parse_rounds() {
    assert_eq!("initial".parse::<Round>().unwrap(), Round::Initial);
    assert_eq!(" Initial ".parse::<Round>().unwrap(), Round::Initial);
    assert_eq!("0".parse::<Round>().unwrap(), Round::Initial);
    assert_eq!("2".parse::<Round>().unwrap(), Round::SelfCal(2));
    assert_eq!("2.0".parse::<Round>().unwrap(), Round::SelfCal(2));
    assert_eq!(Round::from(3), Round::SelfCal(3));
    assert_eq!(Round::try_from(9999_i64).unwrap(), Round::SelfCal(9999));
    assert_eq!(Round::try_from(1.0).unwrap(), Round::SelfCal(1));

    for bad in ["doesnotexists", "1.23456", "-1", "", "selfcal"] {
        match bad.parse::<Round>() {
            Err(StrategyError::BadRound { value }) => assert_eq!(value, bad),
            other => panic!("Expected a bad round error for '{bad}', got {other:?}"),
        }
    }
    assert!(matches!(
        Round::try_from(1.23456),
        Err(StrategyError::BadRound { .. })
    ));
    assert!(matches!(
        Round::try_from(-1_i64),
        Err(StrategyError::BadRound { .. })
    ));
    assert!(matches!(
        Round::try_from(f64::NAN),
        Err(StrategyError::BadRound { .. })
    ));
}

#[test]
fn test_no_strategy_gives_no_options() {
    for round in [Round::Initial, Round::SelfCal(1), Round::SelfCal(9999)] {
        assert!(get_options_from_strategy(None, "wsclean", round).is_empty());
    }
    let options: WSCleanOptions = get_mode_options(None, Round::SelfCal(2)).unwrap();
    assert_eq!(options, WSCleanOptions::default());
}

#[test]
fn test_updated_get_options() {
    let strategy = package_strategy();
    let s = Some(&strategy);

    let wsclean_init = get_options_from_strategy(s, "wsclean", Round::Initial);
    assert_eq!(wsclean_init["data_column"], Value::from("CORRECTED_DATA"));

    let wsclean_1 = get_options_from_strategy(s, "wsclean", Round::SelfCal(1));
    assert_eq!(wsclean_1["data_column"], Value::from("EXAMPLE"));

    // Round 2 doesn't inherit round 1's override.
    let wsclean_2 = get_options_from_strategy(s, "wsclean", Round::SelfCal(2));
    assert_eq!(wsclean_2["multiscale"], Value::from(false));
    assert_eq!(wsclean_2["data_column"], Value::from("CORRECTED_DATA"));

    for (key, value) in &wsclean_init {
        if key != "data_column" {
            assert_eq!(&wsclean_1[key], value, "{key}");
        }
        if key != "multiscale" {
            assert_eq!(&wsclean_2[key], value, "{key}");
        }
    }
    // Order follows the first time a key was given.
    assert_eq!(
        wsclean_1.keys().collect::<Vec<_>>(),
        ["data_column", "multiscale", "size", "minuvw_m"]
    );
}

#[test]
fn test_selfcal_list_of_rounds() {
    let yaml = indoc! {"
        initial:
          wsclean:
            data_column: CORRECTED_DATA
            multiscale: true
        selfcal:
          - wsclean:
              data_column: EXAMPLE
          - wsclean:
              multiscale: false
    "};
    let value: Value = serde_yaml::from_str(yaml).unwrap();
    let strategy = Strategy::try_from(value).unwrap();
    verify_configuration(&strategy).unwrap();
    assert_eq!(strategy.last_round(), Some(2));
    let s = Some(&strategy);

    let wsclean_1 = get_options_from_strategy(s, "wsclean", Round::SelfCal(1));
    assert_eq!(wsclean_1["data_column"], Value::from("EXAMPLE"));
    assert_eq!(wsclean_1["multiscale"], Value::from(true));

    let wsclean_2 = get_options_from_strategy(s, "wsclean", Round::SelfCal(2));
    assert_eq!(wsclean_2["data_column"], Value::from("CORRECTED_DATA"));
    assert_eq!(wsclean_2["multiscale"], Value::from(false));

    // Beyond the last round, the last round is used.
    assert_eq!(
        get_options_from_strategy(s, "wsclean", Round::SelfCal(9999)),
        wsclean_2
    );

    // Both forms of the same rounds are the same strategy.
    let as_mapping = indoc! {"
        initial:
          wsclean:
            data_column: CORRECTED_DATA
            multiscale: true
        selfcal:
          1:
            wsclean:
              data_column: EXAMPLE
          2:
            wsclean:
              multiscale: false
    "};
    let value: Value = serde_yaml::from_str(as_mapping).unwrap();
    assert_eq!(Strategy::try_from(value).unwrap(), strategy);
}

#[test]
fn test_selfcal_bad_rounds() {
    for yaml in ["selfcal: 3\n", "selfcal:\n  - 3\n", "selfcal:\n  - wsclean: [1]\n"] {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        assert!(
            matches!(Strategy::try_from(value), Err(StrategyError::NotLayered(_))),
            "{yaml}"
        );
    }
}

#[test]
fn test_get_mask_options() {
    let strategy = package_strategy();
    let masking = get_options_from_strategy(Some(&strategy), "masking", Round::Initial);
    assert_eq!(
        masking["flood_fill_positive_seed_clip"].as_f64(),
        Some(4.5)
    );
    assert_eq!(masking["base_snr_clip"].as_f64(), Some(4.0));

    let masking_1 = get_options_from_strategy(Some(&strategy), "masking", Round::SelfCal(1));
    assert_eq!(
        masking_1["flood_fill_positive_seed_clip"].as_f64(),
        Some(40.0)
    );
    for (key, value) in &masking {
        if key != "flood_fill_positive_seed_clip" {
            assert_eq!(&masking_1[key], value, "{key}");
        }
    }
}

#[test]
fn test_max_round_override() {
    let strategy = package_strategy();
    assert_eq!(strategy.last_round(), Some(3));
    let opts = get_options_from_strategy(Some(&strategy), "wsclean", Round::SelfCal(9999));
    assert_eq!(opts["data_column"], Value::from("TheLastRoundIs3"));
    assert_eq!(
        opts,
        get_options_from_strategy(Some(&strategy), "wsclean", Round::SelfCal(3))
    );
}

#[test]
fn test_unknown_mode_gives_empty_options() {
    let strategy = package_strategy();
    for round in [Round::Initial, Round::SelfCal(1)] {
        assert!(get_options_from_strategy(Some(&strategy), "thisdoesnotexist", round).is_empty());
    }
}

#[test]
fn test_missing_mode_at_round() {
    // gaincal isn't set in round 2 or at the initial stage.
    let strategy = package_strategy();
    let s = Some(&strategy);
    assert!(get_options_from_strategy(s, "gaincal", Round::Initial).is_empty());
    assert!(get_options_from_strategy(s, "gaincal", Round::SelfCal(2)).is_empty());
    let gaincal_1 = get_options_from_strategy(s, "gaincal", Round::SelfCal(1));
    assert_eq!(gaincal_1["solint"], Value::from("60s"));

    // The typed options fill in the gaps.
    let gaincal: GainCalOptions = get_mode_options(s, Round::SelfCal(2)).unwrap();
    assert_eq!(gaincal, GainCalOptions::default());
    let gaincal: GainCalOptions = get_mode_options(s, Round::SelfCal(5)).unwrap();
    assert_eq!(gaincal.calmode, "ap");
}

#[test]
fn test_get_mode_options() {
    let strategy = package_strategy();
    let s = Some(&strategy);

    let wsclean: WSCleanOptions = get_mode_options(s, Round::SelfCal(1)).unwrap();
    assert_eq!(wsclean.data_column, "EXAMPLE");
    assert_eq!(wsclean.size, 7144);
    assert_eq!(wsclean.minuvw_m, Some(235.0));
    assert!(wsclean.multiscale);
    // Untouched options are the defaults.
    assert_eq!(wsclean.niter, WSCleanOptions::default().niter);

    let masking: MaskingOptions = get_mode_options(s, Round::SelfCal(1)).unwrap();
    assert_eq!(masking.flood_fill_positive_seed_clip, 40.0);
    assert_eq!(masking.flood_fill_positive_flood_clip, 1.25);
    let masking: MaskingOptions = get_mode_options(s, Round::Initial).unwrap();
    assert_eq!(masking.flood_fill_positive_seed_clip, 4.5);
}

#[test]
fn test_get_mode_options_bad_value() {
    let mut strategy = package_strategy();
    strategy.selfcal.get_mut(&2).unwrap()["wsclean"]
        .insert("size".to_string(), Value::from("big"));
    let result: Result<WSCleanOptions, _> = get_mode_options(Some(&strategy), Round::SelfCal(2));
    match result {
        Err(StrategyError::BadOptionValue {
            key, mode, stage, ..
        }) => {
            assert_eq!(key, "size");
            assert_eq!(mode, Mode::WSClean);
            assert_eq!(stage, "selfcal round 2");
        }
        other => panic!("Expected a bad option value, got {other:?}"),
    }
    // Other rounds are fine.
    let result: Result<WSCleanOptions, _> = get_mode_options(Some(&strategy), Round::SelfCal(1));
    assert!(result.is_ok());
}

#[test]
fn test_verify_options_with_class() {
    let mut strategy = package_strategy();
    verify_configuration(&strategy).unwrap();

    strategy.initial["wsclean"].insert(
        "ThisDoesNotExist".to_string(),
        Value::from("ThisDoesNotExist"),
    );
    match verify_configuration(&strategy) {
        Err(StrategyError::UnknownOption { key, mode, stage }) => {
            assert_eq!(key, "ThisDoesNotExist");
            assert_eq!(mode, Mode::WSClean);
            assert_eq!(stage, "initial");
        }
        other => panic!("Expected an unknown option, got {other:?}"),
    }

    strategy.initial["wsclean"].shift_remove("ThisDoesNotExist");
    verify_configuration(&strategy).unwrap();

    strategy.selfcal.get_mut(&1).unwrap()["masking"].insert(
        "ThisDoesNotExist".to_string(),
        Value::from("ThisDoesNotExist"),
    );
    assert!(matches!(
        verify_configuration(&strategy),
        Err(StrategyError::UnknownOption { mode: Mode::Masking, .. })
    ));
}

#[test]
fn test_verify_bad_stage_mode_and_value() {
    let mut strategy = package_strategy();
    strategy
        .extra
        .insert("ddd".to_string(), Value::from(123));
    assert!(matches!(
        verify_configuration(&strategy),
        Err(StrategyError::UnknownStage { stage }) if stage == "ddd"
    ));

    let mut strategy = package_strategy();
    strategy
        .defaults
        .insert("imager".to_string(), OptionsMap::new());
    assert!(matches!(
        verify_configuration(&strategy),
        Err(StrategyError::UnknownMode { mode, stage }) if mode == "imager" && stage == "defaults"
    ));

    let mut strategy = package_strategy();
    strategy.selfcal.get_mut(&3).unwrap()["gaincal"]
        .insert("nspw".to_string(), Value::from(1.5));
    assert!(matches!(
        verify_configuration(&strategy),
        Err(StrategyError::BadOptionValue { key, stage, .. }) if key == "nspw" && stage == "selfcal round 3"
    ));
}

#[test]
fn test_unknown_top_level_key_is_kept() {
    let value: Value = serde_yaml::from_str(indoc! {"
        initial:
          wsclean:
            size: 100
        archive:
          tar_file_re_patterns: []
    "})
    .unwrap();
    let strategy = Strategy::try_from(value).unwrap();
    assert!(strategy.extra.contains_key("archive"));
    assert!(matches!(
        verify_configuration(&strategy),
        Err(StrategyError::UnknownStage { .. })
    ));
}

#[test]
fn test_not_layered() {
    for yaml in ["- initial\n- selfcal\n", "just a string", "initial: 3\n"] {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        assert!(
            matches!(Strategy::try_from(value), Err(StrategyError::NotLayered(_))),
            "{yaml}"
        );
    }
}

#[test]
fn test_mode_options_mapping_creation() {
    let defaults = create_mode_mapping_defaults();
    assert_eq!(
        defaults.keys().collect::<Vec<_>>(),
        ["wsclean", "gaincal", "masking", "archive", "bane", "aegean"]
    );
    assert!(!defaults["archive"].is_empty());
    assert_eq!(defaults["wsclean"]["data_column"], Value::from("CORRECTED_DATA"));
    // Unset options are still present.
    assert_eq!(defaults["wsclean"]["nwlayers"], Value::Null);
    assert_eq!(defaults["bane"].len(), 2);
}

#[test]
fn test_with_options() {
    let mut overrides = OptionsMap::new();
    overrides.insert("maxsummits".to_string(), Value::from(10));
    overrides.insert("nocov".to_string(), Value::from(false));
    let aegean = AegeanOptions::default().with_options(&overrides).unwrap();
    assert_eq!(aegean.maxsummits, 10);
    assert!(!aegean.nocov);
    assert!(aegean.autoload);

    overrides.insert("box_size".to_string(), Value::from(3));
    assert!(matches!(
        AegeanOptions::default().with_options(&overrides),
        Err(OptionsError::Unknown { key, mode: Mode::Aegean }) if key == "box_size"
    ));

    let mut overrides = OptionsMap::new();
    overrides.insert(
        "box_size".to_string(),
        serde_yaml::from_str("[10, 20]").unwrap(),
    );
    let bane = BANEOptions::default().with_options(&overrides).unwrap();
    assert_eq!(bane.box_size, Some((10, 20)));
    assert_eq!(bane.grid_size, None);
}

#[test]
fn test_wsclean_args() {
    let args = WSCleanOptions::default().to_wsclean_args();
    let joined = args.join(" ");
    assert!(joined.starts_with("-abs-mem 100 -local-rms-window 65 -size 10128 10128 -local-rms "));
    assert!(joined.contains("-multiscale-scales 0,15,25,50,75,100,250,400"));
    assert!(joined.contains("-weight briggs -0.5"));
    assert!(joined.contains("-data-column CORRECTED_DATA"));
    assert!(joined.contains("-gridder wgridder"));
    assert!(joined.contains("-no-update-model-required"));
    assert!(!joined.contains("-no-small-inversion"));
    assert!(!joined.contains("-nwlayers"));
    assert!(!joined.contains("-channel-range"));
    // "-weight briggs -0.5" is three arguments.
    let i = args.iter().position(|a| a == "-weight").unwrap();
    assert_eq!(&args[i + 1..i + 3], ["briggs", "-0.5"]);

    let options = WSCleanOptions {
        channel_range: Some((0, 10)),
        fits_mask: Some("mask.fits".to_string()),
        ..Default::default()
    };
    let joined = options.to_wsclean_args().join(" ");
    assert!(joined.contains("-channel-range 0 10"));
    assert!(joined.contains("-fits-mask mask.fits"));
}

#[test]
fn test_with_defaults_verifies() {
    let strategy = Strategy::with_defaults(Some(3));
    verify_configuration(&strategy).unwrap();
    assert_eq!(strategy.last_round(), Some(3));
    assert_eq!(strategy.selfcal[&1].len(), 3);
    assert_eq!(strategy.initial.len(), 6);

    let wsclean = get_options_from_strategy(Some(&strategy), "wsclean", Round::SelfCal(1));
    assert_eq!(wsclean["data_column"], Value::from("CORRECTED_DATA"));
    let archive = get_options_from_strategy(Some(&strategy), "archive", Round::Initial);
    assert!(!archive.is_empty());

    let strategy = Strategy::with_defaults(None);
    assert!(strategy.selfcal.is_empty());
    assert_eq!(strategy.last_round(), None);
    // No rounds, so self-calibration rounds get the initial options.
    assert_eq!(
        get_options_from_strategy(Some(&strategy), "wsclean", Round::SelfCal(2)),
        get_options_from_strategy(Some(&strategy), "wsclean", Round::Initial),
    );
}

#[test]
fn test_create_and_load() {
    let tmp_dir = TempDir::new().unwrap();
    let output = create_default_yaml(&tmp_dir.path().join("example.yaml"), Some(3)).unwrap();
    assert!(output.exists());

    let strategy = load_strategy_yaml(Some(&output), true).unwrap();
    assert_eq!(strategy, Strategy::with_defaults(Some(3)));
    let strategy = load_strategy_yaml(Some(&output), false).unwrap();
    assert_eq!(strategy.selfcal.len(), 3);

    // Consecutive rounds are written as a list.
    let value: Value = serde_yaml::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value["selfcal"].as_sequence().map(|s| s.len()), Some(3));
}

#[test]
fn test_load_errors() {
    assert!(matches!(
        load_strategy_yaml(None, true),
        Err(StrategyError::NoStrategyFile)
    ));

    let tmp_dir = TempDir::new().unwrap();
    let missing = tmp_dir.path().join("missing.yaml");
    assert!(matches!(
        load_strategy_yaml(Some(&missing), true),
        Err(StrategyError::NotFound(_))
    ));

    let bad = tmp_dir.path().join("bad.yaml");
    std::fs::write(&bad, "initial: [wsclean\n").unwrap();
    assert!(matches!(
        load_strategy_yaml(Some(&bad), false),
        Err(StrategyError::Yaml { .. })
    ));

    // Verification errors come through when asked for.
    let unverified = tmp_dir.path().join("unverified.yaml");
    std::fs::write(&unverified, "initial:\n  wsclean:\n    ThisDoesNotExist: 1\n").unwrap();
    assert!(load_strategy_yaml(Some(&unverified), false).is_ok());
    assert!(matches!(
        load_strategy_yaml(Some(&unverified), true),
        Err(StrategyError::UnknownOption { .. })
    ));
}

#[test]
fn test_write_strategy_to_yaml() {
    let tmp_dir = TempDir::new().unwrap();
    let strategy = package_strategy();
    let output = tmp_dir.path().join("testing.yaml");
    let written = write_strategy_to_yaml(&strategy, &output).unwrap();
    assert_eq!(written, output);

    let loaded = load_strategy_yaml(Some(&output), true).unwrap();
    assert_eq!(loaded, strategy);
    assert_eq!(
        loaded.selfcal[&1]["wsclean"]["data_column"],
        strategy.selfcal[&1]["wsclean"]["data_column"]
    );
}

#[test]
fn test_copy_and_timestamp() {
    let tmp_dir = TempDir::new().unwrap();
    let example = write_package_strategy(tmp_dir.path());
    let output_dir = tmp_dir.path().join("copies");

    let copy_path = copy_and_timestamp_strategy_file(&output_dir, &example).unwrap();
    assert_ne!(copy_path, example);
    assert!(copy_path.starts_with(&output_dir));
    let name = copy_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("strategy-"));
    assert!(name.ends_with(".yaml"));
    // "strategy-YYYYmmdd-HHMMSS.yaml"
    assert_eq!(name.len(), "strategy-".len() + 15 + ".yaml".len());
    assert_eq!(
        std::fs::read(&example).unwrap(),
        std::fs::read(&copy_path).unwrap()
    );
    assert_eq!(std::fs::read_to_string(&example).unwrap(), PACKAGE_STRATEGY);

    assert!(matches!(
        copy_and_timestamp_strategy_file(&output_dir, &tmp_dir.path().join("missing.yaml")),
        Err(StrategyError::NotFound(_))
    ));
}
