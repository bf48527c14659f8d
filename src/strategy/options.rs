// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The option schemas of each mode that a strategy can configure.
//!
//! Each mode has a typed record whose [`Default`] holds the default options.
//! A strategy only stores key/value overrides; [`ModeOptions::with_options`]
//! lays those overrides onto a record, rejecting keys the record doesn't have
//! and values of the wrong type.

use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_yaml::Value;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::OptionsError;

/// A mapping of option names to values, in the order they were specified.
pub type OptionsMap = IndexMap<String, Value>;

/// The modes (i.e. tasks) whose options a strategy can set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
pub enum Mode {
    /// Imaging with `wsclean`.
    #[strum(serialize = "wsclean")]
    WSClean,

    /// Self-calibration with CASA's `gaincal`.
    #[strum(serialize = "gaincal")]
    GainCal,

    /// Clean mask creation.
    #[strum(serialize = "masking")]
    Masking,

    /// Archiving of data products.
    #[strum(serialize = "archive")]
    Archive,

    /// Background and noise estimation with `BANE`.
    #[strum(serialize = "bane")]
    Bane,

    /// Source finding with `aegean`.
    #[strum(serialize = "aegean")]
    Aegean,
}

impl Mode {
    /// All of the default options for this mode.
    pub fn default_options(self) -> OptionsMap {
        match self {
            Mode::WSClean => WSCleanOptions::default().to_options(),
            Mode::GainCal => GainCalOptions::default().to_options(),
            Mode::Masking => MaskingOptions::default().to_options(),
            Mode::Archive => ArchiveOptions::default().to_options(),
            Mode::Bane => BANEOptions::default().to_options(),
            Mode::Aegean => AegeanOptions::default().to_options(),
        }
    }

    /// Check that the options are all known to this mode and have sensible
    /// types.
    pub fn check_options(self, options: &OptionsMap) -> Result<(), OptionsError> {
        fn check<T: ModeOptions>(options: &OptionsMap) -> Result<(), OptionsError> {
            T::default().with_options(options).map(|_| ())
        }

        match self {
            Mode::WSClean => check::<WSCleanOptions>(options),
            Mode::GainCal => check::<GainCalOptions>(options),
            Mode::Masking => check::<MaskingOptions>(options),
            Mode::Archive => check::<ArchiveOptions>(options),
            Mode::Bane => check::<BANEOptions>(options),
            Mode::Aegean => check::<AegeanOptions>(options),
        }
    }
}

/// A typed record of a mode's options.
pub trait ModeOptions: Default + Serialize + DeserializeOwned {
    /// The mode these options belong to.
    const MODE: Mode;

    /// Get these options as a mapping. Every field of the record is present,
    /// including those that are `None`.
    fn to_options(&self) -> OptionsMap {
        serde_yaml::to_value(self)
            .and_then(serde_yaml::from_value)
            .unwrap_or_default()
    }

    /// Get a copy of these options with some of them replaced.
    fn with_options(&self, options: &OptionsMap) -> Result<Self, OptionsError> {
        let mut current = self.to_options();
        for (key, value) in options {
            match current.get_mut(key) {
                Some(v) => *v = value.clone(),
                None => {
                    return Err(OptionsError::Unknown {
                        key: key.clone(),
                        mode: Self::MODE,
                    })
                }
            }
            // Deserialise after each replacement so that a bad value can be
            // attributed to its key.
            from_options::<Self>(&current).map_err(|e| OptionsError::BadValue {
                key: key.clone(),
                mode: Self::MODE,
                reason: e.to_string(),
            })?;
        }
        from_options(&current).map_err(|e| OptionsError::BadValue {
            key: String::new(),
            mode: Self::MODE,
            reason: e.to_string(),
        })
    }
}

fn from_options<T: DeserializeOwned>(options: &OptionsMap) -> Result<T, serde_yaml::Error> {
    serde_yaml::to_value(options).and_then(serde_yaml::from_value)
}

/// Options for `wsclean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WSCleanOptions {
    /// Memory `wsclean` may use, in GB.
    pub abs_mem: usize,
    /// Size of the window used when computing a local RMS, in beams.
    pub local_rms_window: usize,
    /// Image size in pixels (images are square).
    pub size: usize,
    pub local_rms: bool,
    /// Number of major cycles before the auto mask is switched on.
    pub force_mask_rounds: usize,
    pub auto_mask: f64,
    pub auto_threshold: f64,
    pub channels_out: usize,
    pub mgain: f64,
    pub nmiter: usize,
    pub niter: usize,
    pub multiscale: bool,
    pub multiscale_scale_bias: f64,
    /// Multi-scale clean scales, in pixels.
    pub multiscale_scales: Vec<usize>,
    pub fit_spectral_pol: usize,
    /// Weighting scheme, e.g. "briggs -0.5".
    pub weight: String,
    /// The column of the measurement set to image.
    pub data_column: String,
    /// Pixel scale, e.g. "2.5asec".
    pub scale: String,
    pub gridder: Option<String>,
    pub nwlayers: Option<usize>,
    pub wgridder_accuracy: f64,
    pub join_channels: bool,
    pub minuv_l: Option<f64>,
    pub minuvw_m: Option<f64>,
    pub maxw: Option<f64>,
    pub no_update_model_required: bool,
    pub no_small_inversion: bool,
    pub beam_fitting_size: Option<f64>,
    /// A FITS image to use as a clean mask.
    pub fits_mask: Option<String>,
    pub deconvolution_channels: Option<usize>,
    pub parallel_gridding: Option<usize>,
    pub squared_channel_joining: bool,
    pub temp_dir: Option<String>,
    pub pol: String,
    pub save_source_list: bool,
    /// First and last (exclusive) channels to image.
    pub channel_range: Option<(usize, usize)>,
    pub no_reorder: bool,
}

impl Default for WSCleanOptions {
    fn default() -> Self {
        WSCleanOptions {
            abs_mem: 100,
            local_rms_window: 65,
            size: 10128,
            local_rms: true,
            force_mask_rounds: 10,
            auto_mask: 3.75,
            auto_threshold: 0.5,
            channels_out: 4,
            mgain: 0.7,
            nmiter: 15,
            niter: 750000,
            multiscale: true,
            multiscale_scale_bias: 0.75,
            multiscale_scales: vec![0, 15, 25, 50, 75, 100, 250, 400],
            fit_spectral_pol: 2,
            weight: "briggs -0.5".to_string(),
            data_column: "CORRECTED_DATA".to_string(),
            scale: "2.5asec".to_string(),
            gridder: Some("wgridder".to_string()),
            nwlayers: None,
            wgridder_accuracy: 1e-4,
            join_channels: true,
            minuv_l: None,
            minuvw_m: None,
            maxw: None,
            no_update_model_required: true,
            no_small_inversion: false,
            beam_fitting_size: Some(1.25),
            fits_mask: None,
            deconvolution_channels: None,
            parallel_gridding: None,
            squared_channel_joining: false,
            temp_dir: None,
            pol: "i".to_string(),
            save_source_list: false,
            channel_range: None,
            no_reorder: false,
        }
    }
}

impl ModeOptions for WSCleanOptions {
    const MODE: Mode = Mode::WSClean;
}

impl WSCleanOptions {
    /// Render these options as `wsclean` command-line arguments. Option names
    /// become flags ("data_column" -> "-data-column"), true booleans are bare
    /// flags, and false booleans and unset options are left out.
    pub fn to_wsclean_args(&self) -> Vec<String> {
        let mut args = vec![];
        for (key, value) in self.to_options() {
            let flag = format!("-{}", key.replace('_', "-"));
            match value {
                Value::Null | Value::Bool(false) => (),
                Value::Bool(true) => args.push(flag),
                Value::Sequence(values) => {
                    let values: Vec<String> = values.iter().filter_map(scalar_to_string).collect();
                    args.push(flag);
                    // wsclean wants a comma-separated list of scales, but
                    // other lists as separate arguments.
                    if key == "multiscale_scales" {
                        args.push(values.join(","));
                    } else {
                        args.extend(values);
                    }
                }
                other => {
                    if let Some(s) = scalar_to_string(&other) {
                        args.push(flag);
                        // Images are square.
                        if key == "size" {
                            args.push(s.clone());
                        }
                        args.extend(s.split_whitespace().map(|s| s.to_string()));
                    }
                }
            }
        }
        args
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Options for CASA's `gaincal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GainCalOptions {
    /// Solution interval, e.g. "60s" or "inf".
    pub solint: String,
    /// "p" for phase-only, "ap" for amplitude and phase.
    pub calmode: String,
    pub round: usize,
    pub minsnr: f64,
    pub uvrange: String,
    pub selectdata: bool,
    pub gaintype: String,
    /// The number of spectral windows to split the data into.
    pub nspw: usize,
}

impl Default for GainCalOptions {
    fn default() -> Self {
        GainCalOptions {
            solint: "60s".to_string(),
            calmode: "p".to_string(),
            round: 0,
            minsnr: 0.0,
            uvrange: ">200m".to_string(),
            selectdata: true,
            gaintype: "G".to_string(),
            nspw: 1,
        }
    }
}

impl ModeOptions for GainCalOptions {
    const MODE: Mode = Mode::GainCal;
}

/// Options for creating clean masks from a signal-to-noise image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaskingOptions {
    /// Pixels above this SNR are included when flood filling is off.
    pub base_snr_clip: f64,
    pub flood_fill: bool,
    /// Islands are seeded from pixels above this SNR.
    pub flood_fill_positive_seed_clip: f64,
    /// Islands grow into pixels above this SNR.
    pub flood_fill_positive_flood_clip: f64,
    /// Use the minimum absolute clip rather than SNR.
    pub flood_fill_use_mbc: bool,
    pub flood_fill_use_mbc_box_size: usize,
    /// Exclude regions around negative artefacts.
    pub suppress_artefacts: bool,
    pub suppress_artefacts_negative_seed_clip: f64,
    pub suppress_artefacts_guard_negative_dilation: f64,
    pub suppress_artefacts_large_island_threshold: f64,
    pub grow_low_snr_island: bool,
    pub grow_low_snr_island_clip: f64,
    pub grow_low_snr_island_size: usize,
}

impl Default for MaskingOptions {
    fn default() -> Self {
        MaskingOptions {
            base_snr_clip: 4.0,
            flood_fill: true,
            flood_fill_positive_seed_clip: 4.5,
            flood_fill_positive_flood_clip: 1.5,
            flood_fill_use_mbc: false,
            flood_fill_use_mbc_box_size: 75,
            suppress_artefacts: true,
            suppress_artefacts_negative_seed_clip: 5.0,
            suppress_artefacts_guard_negative_dilation: 40.0,
            suppress_artefacts_large_island_threshold: 1.0,
            grow_low_snr_island: false,
            grow_low_snr_island_clip: 1.75,
            grow_low_snr_island_size: 12046,
        }
    }
}

impl ModeOptions for MaskingOptions {
    const MODE: Mode = Mode::Masking;
}

/// Options describing which data products are archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveOptions {
    /// Files matching any of these regular expressions go into the tarball.
    pub tar_file_re_patterns: Vec<String>,
    /// Files matching any of these regular expressions are copied.
    pub copy_file_re_patterns: Vec<String>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        let tar = [
            r".*MFS.*image\.fits",
            r".*linmos.*",
            r".*weight\.fits",
            r".*yaml",
            r".*\.txt",
            r".*png",
            r".*beam[0-9]+\.ms\.zip",
            r".*beam[0-9]+\.ms",
            r".*\.caltable",
            r".*\.tar",
            r".*\.csv",
        ];
        let copy = [r".*linmos.*fits", r".*weight\.fits", r".*png", r".*csv"];
        ArchiveOptions {
            tar_file_re_patterns: tar.iter().map(|s| s.to_string()).collect(),
            copy_file_re_patterns: copy.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ModeOptions for ArchiveOptions {
    const MODE: Mode = Mode::Archive;
}

/// Options for `BANE`. If these aren't set, `BANE` picks its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BANEOptions {
    pub box_size: Option<(usize, usize)>,
    pub grid_size: Option<(usize, usize)>,
}

impl ModeOptions for BANEOptions {
    const MODE: Mode = Mode::Bane;
}

/// Options for `aegean`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AegeanOptions {
    /// Don't use the covariance of the fit.
    pub nocov: bool,
    /// Islands with more summits than this aren't fit.
    pub maxsummits: usize,
    /// Load the background and noise images made by `BANE`.
    pub autoload: bool,
}

impl Default for AegeanOptions {
    fn default() -> Self {
        AegeanOptions {
            nocov: true,
            maxsummits: 4,
            autoload: true,
        }
    }
}

impl ModeOptions for AegeanOptions {
    const MODE: Mode = Mode::Aegean;
}
