// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Reference antenna {ref_ant} is not available; there are only {nant} antennas")]
    BadRefAnt { ref_ant: usize, nant: usize },

    #[error("The solutions in {0} have no time solutions to plot")]
    NoSolutions(String),

    #[error("While plotting amps: {0}")]
    Amps(String),

    #[error("While plotting phases: {0}")]
    Phases(String),

    #[error("Error from the plotters library: {0}")]
    Plotters(String),
}
