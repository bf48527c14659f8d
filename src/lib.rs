// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tooling for a radio-interferometric calibration pipeline: AO-style
//! calibration solutions (reading, writing, flagging and plotting), layered
//! strategy files that resolve the options of each processing mode at each
//! self-calibration round, and the steps that run `calibrate` and
//! `applysolutions` in a container.

mod cli;
pub mod pipeline;
pub mod solutions;
pub mod strategy;

pub use cli::{Flint, FlintError};
