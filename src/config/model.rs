// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{Practice, ProductType};

/// Site configuration as read from a TOML file, before validation.
///
/// ```toml
/// country = "NLD"
/// year = 2024
/// full_shape_path = "/data/lpis/decl.shp"
/// ids_geom_shape_path = "/data/lpis/ids.shp"
/// prds_per_group = 10
/// practices = ["CC", "FL"]
///
/// [practice.CC.extraction]
/// veg_start = "2024-03-01"
///
/// [practice.CC.tsa]
/// opt_thr_veg_cycle = 350
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawSiteConfig {
    pub country: String,
    pub year: i32,
    pub full_shape_path: PathBuf,
    pub ids_geom_shape_path: PathBuf,

    /// Maximum number of products handled by one data-extraction task.
    pub prds_per_group: usize,

    /// Enabled practices, in declaration order.
    pub practices: Vec<Practice>,

    /// Tile identifier handed to the product formatter.
    #[serde(default = "default_tile_id")]
    pub tile_id: String,

    /// Minimum number of declared parcels a practice needs to be analysed.
    #[serde(default = "default_min_practice_rows")]
    pub min_practice_rows: usize,

    /// Whether merge tasks delete the per-batch extraction directories.
    #[serde(default = "default_remove_intermediates")]
    pub remove_intermediates: bool,

    /// Per-practice blocks from `[practice.<CODE>]`.
    #[serde(default)]
    pub practice: BTreeMap<Practice, PracticeConfig>,
}

fn default_tile_id() -> String {
    "TILE_none".to_string()
}

fn default_min_practice_rows() -> usize {
    1
}

fn default_remove_intermediates() -> bool {
    true
}

/// Validated, immutable configuration for one site and year.
///
/// Only constructible through `TryFrom<RawSiteConfig>` (see `validate.rs`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteConfig {
    country: String,
    year: i32,
    full_shape_path: PathBuf,
    ids_geom_shape_path: PathBuf,
    prds_per_group: usize,
    practices: Vec<Practice>,
    tile_id: String,
    min_practice_rows: usize,
    remove_intermediates: bool,
    practice: BTreeMap<Practice, PracticeConfig>,
}

impl SiteConfig {
    pub(crate) fn new_unchecked(raw: RawSiteConfig) -> Self {
        Self {
            country: raw.country,
            year: raw.year,
            full_shape_path: raw.full_shape_path,
            ids_geom_shape_path: raw.ids_geom_shape_path,
            prds_per_group: raw.prds_per_group,
            practices: raw.practices,
            tile_id: raw.tile_id,
            min_practice_rows: raw.min_practice_rows,
            remove_intermediates: raw.remove_intermediates,
            practice: raw.practice,
        }
    }

    /// Turn the validated config back into its raw form (used by overrides).
    pub(crate) fn to_raw(&self) -> RawSiteConfig {
        RawSiteConfig {
            country: self.country.clone(),
            year: self.year,
            full_shape_path: self.full_shape_path.clone(),
            ids_geom_shape_path: self.ids_geom_shape_path.clone(),
            prds_per_group: self.prds_per_group,
            practices: self.practices.clone(),
            tile_id: self.tile_id.clone(),
            min_practice_rows: self.min_practice_rows,
            remove_intermediates: self.remove_intermediates,
            practice: self.practice.clone(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn full_shape_path(&self) -> &PathBuf {
        &self.full_shape_path
    }

    pub fn ids_geom_shape_path(&self) -> &PathBuf {
        &self.ids_geom_shape_path
    }

    pub fn prds_per_group(&self) -> usize {
        self.prds_per_group
    }

    /// Enabled practices in declaration order.
    pub fn practices(&self) -> &[Practice] {
        &self.practices
    }

    pub fn tile_id(&self) -> &str {
        &self.tile_id
    }

    pub fn min_practice_rows(&self) -> usize {
        self.min_practice_rows
    }

    pub fn remove_intermediates(&self) -> bool {
        self.remove_intermediates
    }

    /// Parameters of an enabled practice.
    ///
    /// Validation guarantees every enabled practice has a block, so `None`
    /// only happens for practices that are not enabled.
    pub fn practice(&self, practice: Practice) -> Option<&PracticeConfig> {
        self.practice.get(&practice)
    }
}

/// `[practice.<CODE>]` section: everything one practice needs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PracticeConfig {
    /// Product types the analysis of this practice consumes.
    #[serde(default = "default_requires")]
    pub requires: Vec<ProductType>,

    /// Extra declaration files merged into the practice table.
    #[serde(default)]
    pub additional_files: Vec<PathBuf>,

    #[serde(default)]
    pub extraction: PracticeExtractionParams,

    #[serde(default)]
    pub tsa: TimeSeriesAnalysisParams,
}

fn default_requires() -> Vec<ProductType> {
    ProductType::ALL.to_vec()
}

impl PracticeConfig {
    pub fn requires(&self, product_type: ProductType) -> bool {
        self.requires.contains(&product_type)
    }
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            requires: default_requires(),
            additional_files: Vec::new(),
            extraction: PracticeExtractionParams::default(),
            tsa: TimeSeriesAnalysisParams::default(),
        }
    }
}

/// A configuration value passed verbatim to an external tool.
///
/// TOML numbers, booleans and strings are all accepted and kept in their
/// textual form, so `350` and `"350"` are forwarded identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToolValue(String);

impl ToolValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ToolValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Str(String),
            Int(i64),
            Float(f64),
            Bool(bool),
        }

        let text = match Scalar::deserialize(deserializer)? {
            Scalar::Str(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        };
        Ok(ToolValue(text))
    }
}

/// Date and window thresholds used when extracting a practice table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PracticeExtractionParams {
    #[serde(default)]
    pub veg_start: Option<ToolValue>,
    #[serde(default)]
    pub h_start: Option<ToolValue>,
    #[serde(default)]
    pub h_end: Option<ToolValue>,
    #[serde(default)]
    pub h_start_w: Option<ToolValue>,
    #[serde(default)]
    pub p_start: Option<ToolValue>,
    #[serde(default)]
    pub p_end: Option<ToolValue>,
    #[serde(default)]
    pub p_start_w: Option<ToolValue>,
    #[serde(default)]
    pub p_end_w: Option<ToolValue>,
}

impl PracticeExtractionParams {
    /// `(tool flag, value)` pairs in the order the extractor expects them.
    pub fn flags(&self) -> [(&'static str, Option<&ToolValue>); 8] {
        [
            ("-vegstart", self.veg_start.as_ref()),
            ("-hstart", self.h_start.as_ref()),
            ("-hend", self.h_end.as_ref()),
            ("-hstartw", self.h_start_w.as_ref()),
            ("-pstart", self.p_start.as_ref()),
            ("-pend", self.p_end.as_ref()),
            ("-pstartw", self.p_start_w.as_ref()),
            ("-pendw", self.p_end_w.as_ref()),
        ]
    }
}

/// Thresholds governing the time-series analysis tool.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TimeSeriesAnalysisParams {
    #[serde(default)]
    pub opt_thr_veg_cycle: Option<ToolValue>,
    #[serde(default)]
    pub ndvi_dw: Option<ToolValue>,
    #[serde(default)]
    pub ndvi_up: Option<ToolValue>,
    #[serde(default)]
    pub ndvi_step: Option<ToolValue>,
    #[serde(default)]
    pub opt_thr_min: Option<ToolValue>,
    #[serde(default)]
    pub coh_thr_base: Option<ToolValue>,
    #[serde(default)]
    pub coh_thr_high: Option<ToolValue>,
    #[serde(default)]
    pub coh_thr_abs: Option<ToolValue>,
    #[serde(default)]
    pub amp_thr_min: Option<ToolValue>,
    #[serde(default)]
    pub efa_ndvi_thr: Option<ToolValue>,
    #[serde(default)]
    pub efa_ndvi_up: Option<ToolValue>,
    #[serde(default)]
    pub efa_ndvi_dw: Option<ToolValue>,
    #[serde(default)]
    pub efa_coh_change: Option<ToolValue>,
    #[serde(default)]
    pub efa_coh_value: Option<ToolValue>,
    #[serde(default)]
    pub efa_ndvi_min: Option<ToolValue>,
    #[serde(default)]
    pub efa_amp_thr: Option<ToolValue>,
    #[serde(default)]
    pub stddev_inamp_thr: Option<ToolValue>,
    #[serde(default)]
    pub opt_thr_buf_den: Option<ToolValue>,
    #[serde(default)]
    pub catch_main: Option<ToolValue>,
    #[serde(default)]
    pub catch_period: Option<ToolValue>,
    #[serde(default)]
    pub catch_period_start: Option<ToolValue>,
    #[serde(default)]
    pub catch_crop_is_main: Option<ToolValue>,
    #[serde(default)]
    pub catch_proportion: Option<ToolValue>,
    #[serde(default)]
    pub fl_mark_start_date: Option<ToolValue>,
    #[serde(default)]
    pub fl_mark_end_date: Option<ToolValue>,
}

impl TimeSeriesAnalysisParams {
    /// `(tool flag, value)` pairs in the order the analysis tool expects them.
    pub fn flags(&self) -> [(&'static str, Option<&ToolValue>); 25] {
        [
            ("-optthrvegcycle", self.opt_thr_veg_cycle.as_ref()),
            ("-ndvidw", self.ndvi_dw.as_ref()),
            ("-ndviup", self.ndvi_up.as_ref()),
            ("-ndvistep", self.ndvi_step.as_ref()),
            ("-optthrmin", self.opt_thr_min.as_ref()),
            ("-cohthrbase", self.coh_thr_base.as_ref()),
            ("-cohthrhigh", self.coh_thr_high.as_ref()),
            ("-cohthrabs", self.coh_thr_abs.as_ref()),
            ("-ampthrmin", self.amp_thr_min.as_ref()),
            ("-efandvithr", self.efa_ndvi_thr.as_ref()),
            ("-efandviup", self.efa_ndvi_up.as_ref()),
            ("-efandvidw", self.efa_ndvi_dw.as_ref()),
            ("-efacohchange", self.efa_coh_change.as_ref()),
            ("-efacohvalue", self.efa_coh_value.as_ref()),
            ("-efandvimin", self.efa_ndvi_min.as_ref()),
            ("-efaampthr", self.efa_amp_thr.as_ref()),
            ("-stddevinampthr", self.stddev_inamp_thr.as_ref()),
            ("-optthrbufden", self.opt_thr_buf_den.as_ref()),
            ("-catchmain", self.catch_main.as_ref()),
            ("-catchperiod", self.catch_period.as_ref()),
            ("-catchperiodstart", self.catch_period_start.as_ref()),
            ("-catchcropismain", self.catch_crop_is_main.as_ref()),
            ("-catchproportion", self.catch_proportion.as_ref()),
            ("-flmarkstartdate", self.fl_mark_start_date.as_ref()),
            ("-flmarkstenddate", self.fl_mark_end_date.as_ref()),
        ]
    }
}
