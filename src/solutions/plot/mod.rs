// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to plot calibration solutions.

mod error;

pub use error::PlotError;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use ndarray::prelude::*;
use num_complex::Complex64;
use plotters::{coord::Shift, prelude::*, style::RGBAColor};

use super::AOSolutions;

/// The number of X pixels on the plots.
const X_PIXELS: u32 = 3200;
/// The number of Y pixels on the plots.
const Y_PIXELS: u32 = 1800;
/// The number of antennas drawn on each row of a plot.
const NUM_COLUMNS: usize = 6;

const FLAGGED: RGBColor = RGBColor(220, 220, 220);

lazy_static::lazy_static! {
    static ref POLS: [(&'static str, RGBAColor); 2] = [
        ("XX", BLUE.mix(1.0)),
        ("YY", RED.mix(1.0)),
    ];
}

/// Plot the amplitudes and phases of the first time solution, relative to a
/// reference antenna (if given). Flagged channels are shaded. Two files are
/// written, "<output_base>_amps.png" and "<output_base>_phases.png"; their
/// paths are returned.
pub fn plot_solutions(
    sols: &AOSolutions,
    ref_ant: Option<usize>,
    output_base: &Path,
) -> Result<Vec<PathBuf>, PlotError> {
    let (nsol, nant, nchan, npol) = sols.bandpass.dim();
    info!("Plotting {}", sols.path.display());
    if nsol == 0 || npol == 0 {
        return Err(PlotError::NoSolutions(sols.path.display().to_string()));
    }
    if nsol > 1 {
        warn!("Found {nsol} time solutions, plotting the first");
    }
    if let Some(ref_ant) = ref_ant {
        if ref_ant >= nant {
            return Err(PlotError::BadRefAnt { ref_ant, nant });
        }
    }

    // XX and YY, or the only polarisation there is.
    let pols = [0, npol - 1];
    let mut amps = Array3::from_elem((nant, nchan, pols.len()), f64::NAN);
    let mut phases = Array3::from_elem((nant, nchan, pols.len()), f64::NAN);
    for ((i_ant, i_chan, i_pol), amp) in amps.indexed_iter_mut() {
        let pol = pols[i_pol];
        let gain = sols.bandpass[(0, i_ant, i_chan, pol)];
        let reference = match ref_ant {
            Some(r) => sols.bandpass[(0, r, i_chan, pol)],
            None => Complex64::new(1.0, 0.0),
        };
        let normalised = gain / reference;
        if normalised.re.is_finite() && normalised.im.is_finite() {
            *amp = normalised.norm();
            phases[(i_ant, i_chan, i_pol)] = normalised.arg().to_degrees();
        }
    }

    let max_amp = amps
        .iter()
        .filter(|a| a.is_finite())
        .fold(0.0_f64, |acc, &a| acc.max(a));
    let max_amp = if max_amp > 0.0 { 1.2 * max_amp } else { 1.0 };

    let nrows = nant.div_ceil(NUM_COLUMNS).max(1);
    debug!("Plotting with {NUM_COLUMNS} columns and {nrows} rows");

    let output_amps = PathBuf::from(format!("{}_amps.png", output_base.display()));
    let output_phases = PathBuf::from(format!("{}_phases.png", output_base.display()));
    draw_grid(
        &output_amps,
        "Amplitudes",
        amps.view(),
        (0.0, max_amp),
        nrows,
        PlotError::Amps,
    )?;
    draw_grid(
        &output_phases,
        "Phases",
        phases.view(),
        (-200.0, 200.0),
        nrows,
        PlotError::Phases,
    )?;

    Ok(vec![output_amps, output_phases])
}

/// Draw one plot with a panel for each antenna.
fn draw_grid(
    output: &Path,
    title: &str,
    values: ArrayView3<f64>,
    y_range: (f64, f64),
    nrows: usize,
    err: fn(String) -> PlotError,
) -> Result<(), PlotError> {
    let root = BitMapBackend::new(output, (X_PIXELS, Y_PIXELS)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::Plotters(e.to_string()))?;
    // Draw the coloured text for each polarisation.
    for (i, (pol, colour)) in POLS.iter().enumerate() {
        root.draw_text(
            pol,
            &("sans-serif", 55).into_font().color(colour),
            (X_PIXELS as i32 - 300 + 80 * i as i32, 10),
        )
        .map_err(|e| PlotError::Plotters(e.to_string()))?;
    }
    let root = root
        .titled(title, ("sans-serif", 60).into_font())
        .map_err(|e| PlotError::Plotters(e.to_string()))?;

    for (i_ant, (ant_values, area)) in values
        .outer_iter()
        .zip(root.split_evenly((nrows, NUM_COLUMNS)).iter())
        .enumerate()
    {
        plot_antenna(area, ant_values, y_range, i_ant).map_err(err)?;
    }

    root.present()
        .map_err(|e| PlotError::Plotters(e.to_string()))?;
    Ok(())
}

/// For a single drawing area, plot the values of one antenna. `values` has
/// dimensions (num. channels, num. polarisations).
fn plot_antenna<DB: DrawingBackend>(
    drawing_area: &DrawingArea<DB, Shift>,
    values: ArrayView2<f64>,
    y_range: (f64, f64),
    i_ant: usize,
) -> Result<(), String> {
    let nchan = values.len_of(Axis(0));
    let mut cc = ChartBuilder::on(drawing_area)
        .caption(format!("ak{i_ant:02}"), ("sans-serif", 30))
        .top_x_label_area_size(15)
        .y_label_area_size(45)
        .build_cartesian_2d(0..nchan.max(1), y_range.0..y_range.1)
        .map_err(|e| e.to_string())?;

    cc.configure_mesh()
        .light_line_style(&WHITE)
        .draw()
        .map_err(|e| e.to_string())?;

    if values.iter().all(|v| !v.is_finite()) {
        cc.plotting_area()
            .fill(&FLAGGED)
            .map_err(|e| e.to_string())?;
        return Ok(());
    }

    // Shade the flagged channels.
    cc.draw_series(
        values
            .outer_iter()
            .enumerate()
            .filter(|(_, v)| v.iter().any(|x| !x.is_finite()))
            .map(|(i_chan, _)| {
                Rectangle::new(
                    [(i_chan, y_range.0), (i_chan + 1, y_range.1)],
                    FLAGGED.filled(),
                )
            }),
    )
    .map_err(|e| e.to_string())?;

    for (i_pol, (_, colour)) in POLS.iter().enumerate().take(values.len_of(Axis(1))) {
        cc.draw_series(PointSeries::of_element(
            values
                .column(i_pol)
                .iter()
                .enumerate()
                .filter(|(_, y)| y.is_finite())
                .map(|(x, &y)| (x, y)),
            1,
            colour.filled(),
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
        ))
        .map_err(|e| e.to_string())?;
    }

    Ok(())
}
