// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Flag outlying calibration solutions.
//!
//! For every time solution and polarisation of interest, each antenna's gains
//! are divided by those of a reference antenna. Amplitudes and phases of the
//! normalised gains are then compared against robust statistics (median and
//! scaled median absolute deviation) of that antenna's own spectrum; channels
//! that deviate by more than a cut are set to NaN. Antennas without enough
//! finite channels to trust the statistics are flagged entirely.

use std::path::{Path, PathBuf};

use log::{debug, info, trace};
use ndarray::prelude::*;
use num_complex::Complex64;

use super::{AOSolutions, FlagError, PREFLAGGED_SUFFIX};

/// The default minimum number of finite channels an antenna needs before its
/// statistics are trusted.
pub const DEFAULT_MIN_FINITE_SAMPLES: usize = 5;

/// Multiplying a median absolute deviation by this makes it comparable to a
/// standard deviation for normally-distributed data.
const MAD_TO_STD: f64 = 1.4826;

/// Options to [`flag_solutions`].
#[derive(Debug, Clone)]
pub struct FlagOptions {
    /// Antennas (per time solution and polarisation) with fewer finite
    /// channels than this are flagged entirely.
    pub min_finite_samples: usize,

    /// The polarisation indices to inspect. If this is `None`, XX and YY are
    /// used for 4-polarisation solutions, otherwise all polarisations are.
    pub polarisations: Option<Vec<usize>>,
}

impl Default for FlagOptions {
    fn default() -> Self {
        FlagOptions {
            min_finite_samples: DEFAULT_MIN_FINITE_SAMPLES,
            polarisations: None,
        }
    }
}

fn default_polarisations(npol: usize) -> Vec<usize> {
    match npol {
        4 => vec![0, 3],
        n => (0..n).collect(),
    }
}

fn is_finite(c: Complex64) -> bool {
    c.re.is_finite() && c.im.is_finite()
}

fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Get the median and scaled median absolute deviation of the finite values.
/// `None` is returned if there aren't any finite values.
pub(crate) fn robust_stats(values: &[f64]) -> Option<(f64, f64)> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);
    let centre = median(&finite);

    let mut deviations: Vec<f64> = finite.iter().map(|v| (v - centre).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    let spread = median(&deviations) * MAD_TO_STD;

    Some((centre, spread))
}

/// Which of these values are further than `flag_cut` spreads from their
/// centre? Non-finite values are never marked.
fn outliers(values: &[f64], flag_cut: f64) -> Vec<bool> {
    match robust_stats(values) {
        None => vec![false; values.len()],
        Some((centre, spread)) => values
            .iter()
            .map(|v| v.is_finite() && (v - centre).abs() > flag_cut * spread)
            .collect(),
    }
}

/// Flag the supplied solutions, returning a new set of solutions. The input
/// solutions are not modified. Any gains that were already flagged stay
/// flagged.
pub fn flag_solutions(
    sols: &AOSolutions,
    ref_ant: usize,
    flag_cut: f64,
    opts: &FlagOptions,
) -> Result<AOSolutions, FlagError> {
    let (nsol, nant, _, npol) = sols.bandpass.dim();
    if ref_ant >= nant {
        return Err(FlagError::BadRefAnt { ref_ant, nant });
    }
    if flag_cut.is_nan() || flag_cut <= 0.0 {
        return Err(FlagError::BadFlagCut(flag_cut));
    }
    let pols = match opts.polarisations.as_ref() {
        Some(p) => p.clone(),
        None => default_polarisations(npol),
    };
    if let Some(&pol) = pols.iter().find(|&&p| p >= npol) {
        return Err(FlagError::BadPolarisation { pol, npol });
    }
    debug!(
        "Flagging {} with ref. antenna {ref_ant}, cut {flag_cut}, polarisations {pols:?}",
        sols.path.display()
    );

    let mut bandpass = sols.bandpass.clone();
    let mut num_newly_flagged = 0;
    for i_sol in 0..nsol {
        for &pol in &pols {
            let ref_gains = sols.bandpass.slice(s![i_sol, ref_ant, .., pol]);
            for i_ant in 0..nant {
                let mut gains = bandpass.slice_mut(s![i_sol, i_ant, .., pol]);
                let normalised: Vec<Complex64> = gains
                    .iter()
                    .zip(ref_gains.iter())
                    .map(|(g, r)| g / r)
                    .collect();
                let num_finite = normalised.iter().filter(|n| is_finite(**n)).count();

                let flags = if num_finite < opts.min_finite_samples {
                    trace!(
                        "sol {i_sol} pol {pol} antenna {i_ant}: only {num_finite} finite channels; flagging all"
                    );
                    vec![true; normalised.len()]
                } else {
                    let amps: Vec<f64> = normalised
                        .iter()
                        .map(|n| if is_finite(*n) { n.norm() } else { f64::NAN })
                        .collect();
                    let phases: Vec<f64> = normalised
                        .iter()
                        .map(|n| {
                            if is_finite(*n) {
                                n.arg().to_degrees()
                            } else {
                                f64::NAN
                            }
                        })
                        .collect();
                    outliers(&amps, flag_cut)
                        .into_iter()
                        .zip(outliers(&phases, flag_cut))
                        .map(|(a, p)| a || p)
                        .collect()
                };

                for (gain, flag) in gains.iter_mut().zip(flags) {
                    if flag && !gain.re.is_nan() {
                        *gain = Complex64::new(f64::NAN, f64::NAN);
                        num_newly_flagged += 1;
                    }
                }
            }
        }
    }

    let total = sols.bandpass.len();
    info!(
        "Flagged {num_newly_flagged} additional gains of {total} ({:.2}%)",
        if total == 0 {
            0.0
        } else {
            num_newly_flagged as f64 / total as f64 * 100.0
        }
    );

    Ok(AOSolutions {
        path: sols.path.clone(),
        bandpass,
    })
}

/// Get the path that flagged solutions derived from `solutions_path` are
/// written to, e.g. "x.calibrate.bin" becomes "x.calibrate.preflagged.bin".
pub fn preflagged_path(solutions_path: &Path) -> PathBuf {
    let stem = solutions_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    solutions_path.with_file_name(format!("{stem}{PREFLAGGED_SUFFIX}"))
}

/// Read a solutions file, flag it, and write the flagged solutions next to the
/// input (see [`preflagged_path`]). If a plot directory is given (and the
/// "plotting" feature is enabled), plots of the flagged solutions are written
/// there. The path of the flagged solutions is returned.
pub fn flag_aosolutions_file(
    solutions_path: &Path,
    ref_ant: usize,
    flag_cut: f64,
    opts: &FlagOptions,
    plot_dir: Option<&Path>,
) -> Result<PathBuf, FlagError> {
    let sols = AOSolutions::load(solutions_path)?;
    let output = preflagged_path(solutions_path);
    let flagged = flag_solutions(&sols, ref_ant, flag_cut, opts)?.with_path(&output);
    flagged.save(&output)?;
    info!("Wrote flagged solutions to {}", output.display());

    if let Some(plot_dir) = plot_dir {
        #[cfg(feature = "plotting")]
        {
            std::fs::create_dir_all(plot_dir)?;
            let base = plot_dir.join(
                output
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
            let plots = super::plot::plot_solutions(&flagged, Some(ref_ant), &base)?;
            info!("Wrote {plots:?}");
        }
        #[cfg(not(feature = "plotting"))]
        log::warn!(
            "Not plotting to {}; flint was compiled without the \"plotting\" feature",
            plot_dir.display()
        );
    }

    Ok(output)
}
