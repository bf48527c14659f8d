// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Measurement set handles.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};

lazy_static::lazy_static! {
    static ref RE_BEAM: Regex =
        RegexBuilder::new(r"beam([0-9]+)")
            .case_insensitive(true).build().unwrap();
}

/// A measurement set and the column holding the data of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MS {
    pub path: PathBuf,

    /// The nominated data column, e.g. "DATA" or "CORRECTED_DATA".
    pub column: Option<String>,
}

impl MS {
    pub fn new<P: AsRef<Path>>(path: P, column: Option<&str>) -> MS {
        MS {
            path: path.as_ref().to_path_buf(),
            column: column.map(|c| c.to_string()),
        }
    }

    /// A measurement set without a nominated column.
    pub fn cast<P: AsRef<Path>>(path: P) -> MS {
        MS::new(path, None)
    }

    /// Get a copy of this measurement set with a different column.
    pub fn with_column(&self, column: Option<&str>) -> MS {
        MS::new(&self.path, column)
    }

    /// The ASKAP beam number in the file name, e.g. 12 for
    /// "SB1234.RACS_0012+00.beam12.ms".
    pub fn beam(&self) -> Option<u32> {
        beam_of_path(&self.path)
    }
}

impl Display for MS {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.column {
            Some(c) => write!(f, "{} ({c})", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

pub(crate) fn beam_of_path(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_string_lossy();
    RE_BEAM
        .captures(&name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
