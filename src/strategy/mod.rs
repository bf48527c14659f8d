// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Processing strategies.
//!
//! A strategy says which options each mode (e.g. `wsclean`, `gaincal`) should
//! use at each stage of processing. Options are layered: a mode's entry in
//! the `defaults` stage is overridden by its entry in the `initial` stage,
//! which is in turn overridden by a self-calibration round's entry. A round
//! only overrides the `initial` layer; it does not inherit the overrides of
//! earlier rounds. Asking for a round beyond the last configured round gives
//! the options of the last configured round.

mod error;
pub mod io;
pub mod options;
#[cfg(test)]
mod tests;

pub use error::*;
pub use io::*;
pub use options::{
    AegeanOptions, ArchiveOptions, BANEOptions, GainCalOptions, MaskingOptions, Mode,
    ModeOptions, OptionsMap, WSCleanOptions,
};

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

lazy_static::lazy_static! {
    pub(crate) static ref MODES: String = Mode::iter().join(", ");

    pub(crate) static ref STAGES: String = KNOWN_STAGES.join(", ");
}

/// The top-level keys allowed in a strategy.
const KNOWN_STAGES: [&str; 4] = ["version", "defaults", "initial", "selfcal"];

/// The version written into new strategy files.
pub const STRATEGY_VERSION: &str = "0.1";

/// A mapping of mode names to their options.
pub type ModeMap = IndexMap<String, OptionsMap>;

/// A processing strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<serde_yaml::Value>,

    /// Options that apply to every stage unless overridden.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub defaults: ModeMap,

    /// Options for the first imaging stage, before any self-calibration.
    #[serde(default)]
    pub initial: ModeMap,

    /// Overrides for each self-calibration round. Round numbers start at 1.
    /// In a file, this is either a list of rounds (the first entry is round
    /// 1) or a mapping from round number to modes.
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        with = "selfcal_rounds"
    )]
    pub selfcal: BTreeMap<u32, ModeMap>,

    /// Any other top-level keys. These are never valid, but they're kept so
    /// that verification can complain about them.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl TryFrom<serde_yaml::Value> for Strategy {
    type Error = StrategyError;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        if !value.is_mapping() {
            return Err(StrategyError::NotLayered(format!(
                "expected a mapping at the top level, got {}",
                describe_value(&value)
            )));
        }
        serde_yaml::from_value(value).map_err(|e| StrategyError::NotLayered(e.to_string()))
    }
}

/// (De)serialise self-calibration rounds. Rounds numbered 1 to n without gaps
/// are written as a list; anything else is written as a mapping.
mod selfcal_rounds {
    use std::collections::BTreeMap;

    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serialize, Serializer};
    use serde_yaml::Value;

    use super::{describe_value, ModeMap};

    pub(super) fn serialize<S: Serializer>(
        rounds: &BTreeMap<u32, ModeMap>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if rounds.keys().copied().eq(1..=rounds.len() as u32) {
            let mut seq = serializer.serialize_seq(Some(rounds.len()))?;
            for modes in rounds.values() {
                seq.serialize_element(modes)?;
            }
            seq.end()
        } else {
            rounds.serialize(serializer)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<u32, ModeMap>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(BTreeMap::new()),
            Value::Sequence(rounds) => rounds
                .into_iter()
                .enumerate()
                .map(|(i, modes)| {
                    let round = i as u32 + 1;
                    let modes = serde_yaml::from_value(modes)
                        .map_err(|e| D::Error::custom(format!("selfcal round {round}: {e}")))?;
                    Ok((round, modes))
                })
                .collect(),
            value @ Value::Mapping(_) => serde_yaml::from_value(value).map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "selfcal must be a list or a mapping of rounds, got {}",
                describe_value(&other)
            ))),
        }
    }
}

fn describe_value(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

impl Strategy {
    /// A strategy with every mode's defaults in the `initial` stage and, if
    /// requested, some self-calibration rounds with the `wsclean`, `gaincal`
    /// and `masking` defaults.
    pub fn with_defaults(selfcal_rounds: Option<usize>) -> Strategy {
        let selfcal = (1..=selfcal_rounds.unwrap_or(0) as u32)
            .map(|round| {
                let modes = [Mode::WSClean, Mode::GainCal, Mode::Masking]
                    .into_iter()
                    .map(|mode| (mode.to_string(), mode.default_options()))
                    .collect();
                (round, modes)
            })
            .collect();

        Strategy {
            version: Some(serde_yaml::Value::String(STRATEGY_VERSION.to_string())),
            defaults: IndexMap::new(),
            initial: create_mode_mapping_defaults(),
            selfcal,
            extra: IndexMap::new(),
        }
    }

    /// The highest configured self-calibration round, if there are any.
    pub fn last_round(&self) -> Option<u32> {
        self.selfcal.keys().next_back().copied()
    }

    /// Get the overrides of a self-calibration round. Rounds beyond the last
    /// configured round give the last round.
    fn selfcal_round(&self, round: u32) -> Option<&ModeMap> {
        let last = self.last_round()?;
        self.selfcal.get(&round.min(last))
    }

    /// Get the options of a mode at a round. Unknown modes get no options.
    pub fn resolve(&self, mode: &str, round: Round) -> OptionsMap {
        let overlay = match round {
            Round::Initial => None,
            Round::SelfCal(r) => self.selfcal_round(r),
        };
        let mut options = OptionsMap::new();
        for layer in [Some(&self.defaults), Some(&self.initial), overlay]
            .into_iter()
            .flatten()
        {
            if let Some(layer_options) = layer.get(mode) {
                options.extend(layer_options.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        options
    }

    /// Iterate over the named stages holding mode options.
    fn stages(&self) -> impl Iterator<Item = (String, &ModeMap)> {
        [
            ("defaults".to_string(), &self.defaults),
            ("initial".to_string(), &self.initial),
        ]
        .into_iter()
        .chain(
            self.selfcal
                .iter()
                .map(|(round, modes)| (Round::SelfCal(*round).to_string(), modes)),
        )
    }
}

/// A stage of processing at which options are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    /// Before any self-calibration.
    Initial,

    /// A self-calibration round, starting from 1.
    SelfCal(u32),
}

impl Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Round::Initial => write!(f, "initial"),
            Round::SelfCal(r) => write!(f, "selfcal round {r}"),
        }
    }
}

impl From<u32> for Round {
    fn from(r: u32) -> Self {
        match r {
            0 => Round::Initial,
            r => Round::SelfCal(r),
        }
    }
}

impl TryFrom<i64> for Round {
    type Error = StrategyError;

    fn try_from(r: i64) -> Result<Self, Self::Error> {
        u32::try_from(r)
            .map(Round::from)
            .map_err(|_| StrategyError::BadRound {
                value: r.to_string(),
            })
    }
}

impl TryFrom<f64> for Round {
    type Error = StrategyError;

    fn try_from(r: f64) -> Result<Self, Self::Error> {
        if r.is_finite() && r.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&r) {
            Ok(Round::from(r as u32))
        } else {
            Err(StrategyError::BadRound {
                value: r.to_string(),
            })
        }
    }
}

impl FromStr for Round {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("initial") {
            return Ok(Round::Initial);
        }
        if let Ok(r) = s.parse::<i64>() {
            return Round::try_from(r);
        }
        match s.parse::<f64>() {
            Ok(r) => Round::try_from(r),
            Err(_) => Err(StrategyError::BadRound {
                value: s.to_string(),
            }),
        }
    }
}

/// Get the options of a mode at a round. Without a strategy, there are no
/// options. Keys come out in the order they were first specified.
pub fn get_options_from_strategy(
    strategy: Option<&Strategy>,
    mode: &str,
    round: Round,
) -> OptionsMap {
    match strategy {
        None => {
            debug!("No strategy; no {mode} options for {round}");
            OptionsMap::new()
        }
        Some(strategy) => strategy.resolve(mode, round),
    }
}

/// Get the typed options of a mode at a round. Options not set by the
/// strategy take their default values.
pub fn get_mode_options<T: ModeOptions>(
    strategy: Option<&Strategy>,
    round: Round,
) -> Result<T, StrategyError> {
    let mode: &'static str = T::MODE.into();
    let options = get_options_from_strategy(strategy, mode, round);
    T::default()
        .with_options(&options)
        .map_err(|e| e.in_stage(&round.to_string()))
}

/// Check that a strategy has only known stages and modes, and that every
/// option belongs to its mode and has a usable value.
pub fn verify_configuration(strategy: &Strategy) -> Result<(), StrategyError> {
    if let Some(stage) = strategy.extra.keys().next() {
        return Err(StrategyError::UnknownStage {
            stage: stage.clone(),
        });
    }

    for (stage, modes) in strategy.stages() {
        for (mode_name, options) in modes {
            let mode = Mode::from_str(mode_name).map_err(|_| StrategyError::UnknownMode {
                mode: mode_name.clone(),
                stage: stage.clone(),
            })?;
            mode.check_options(options).map_err(|e| e.in_stage(&stage))?;
        }
    }

    info!("The strategy is valid");
    Ok(())
}

/// Every mode and all of its default options.
pub fn create_mode_mapping_defaults() -> ModeMap {
    Mode::iter()
        .map(|mode| (mode.to_string(), mode.default_options()))
        .collect()
}
