// src/pipeline/arguments.rs

//! Argument lists for the external tools.
//!
//! Pure functions: configuration slice + input/output paths in, ordered
//! argument list out. The tools parse positionally, so the order below is
//! part of their contract. Optional parameters are emitted only when set.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::{SiteConfig, ToolValue};
use crate::types::{Practice, ProductType, SiteId};

pub const IDS_EXTRACTOR_CMD: &str = "AgricPractIdsExtractor";
pub const PRACTICES_EXTRACTOR_CMD: &str = "PracticesTableExtractor";
pub const DATA_EXTRACTOR_CMD: &str = "AgricPractDataExtraction";
pub const FILES_MERGE_CMD: &str = "AgricPractMergeDataExtractionFiles";
pub const TIME_SERIES_ANALYSIS_CMD: &str = "TimeSeriesAnalysis";
pub const PRODUCT_FORMATTER_CMD: &str = "ProductFormatter";
pub const CLEANUP_CMD: &str = "rm";

/// Parcel identifier column shared by the extraction tools.
pub const UID_FIELD: &str = "NewID";

/// Processor name embedded in formatter arguments.
pub const PROCESSOR_NAME: &str = "agricpractices";

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn push_flag(args: &mut Vec<String>, flag: &str, value: impl Into<String>) {
    args.push(flag.to_string());
    args.push(value.into());
}

fn push_optional(args: &mut Vec<String>, flags: &[(&'static str, Option<&ToolValue>)]) {
    for (flag, value) in flags {
        if let Some(value) = value.filter(|v| !v.as_str().trim().is_empty()) {
            push_flag(args, flag, value.as_str());
        }
    }
}

/// Ids extractor: selects parcel ids from the full declaration shapefile.
pub fn ids_extractor_args(site: &SiteConfig, out_file: &Path) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "-inshp", path_arg(site.full_shape_path()));
    push_flag(&mut args, "-country", site.country());
    push_flag(&mut args, "-year", site.year().to_string());
    push_flag(&mut args, "-field", UID_FIELD);
    push_flag(&mut args, "-out", path_arg(out_file));
    args
}

/// Practices extractor: builds the practice table of one practice.
pub fn practices_extraction_args(
    site: &SiteConfig,
    practice: Practice,
    ids_file: &Path,
    out_file: &Path,
) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "-inshp", path_arg(site.full_shape_path()));
    push_flag(&mut args, "-filterids", path_arg(ids_file));
    push_flag(&mut args, "-country", site.country());
    push_flag(&mut args, "-practice", practice.code());
    push_flag(&mut args, "-year", site.year().to_string());

    if let Some(cfg) = site.practice(practice) {
        push_optional(&mut args, &cfg.extraction.flags());
    }

    push_flag(&mut args, "-out", path_arg(out_file));

    if let Some(cfg) = site.practice(practice) {
        if !cfg.additional_files.is_empty() {
            args.push("-addfiles".to_string());
            args.extend(cfg.additional_files.iter().map(|p| path_arg(p)));
        }
    }

    args
}

/// Data extractor: per-parcel statistics for one batch of products.
///
/// `-il` is variadic and therefore always last.
pub fn data_extraction_args(
    site: &SiteConfig,
    product_type: ProductType,
    ids_file: &Path,
    inputs: &[String],
    out_dir: &Path,
) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "-prdtype", product_type.tag());
    push_flag(&mut args, "-field", UID_FIELD);
    push_flag(&mut args, "-vec", path_arg(site.ids_geom_shape_path()));
    push_flag(&mut args, "-filterids", path_arg(ids_file));
    push_flag(&mut args, "-outdir", path_arg(out_dir));
    args.push("-il".to_string());
    args.extend(inputs.iter().cloned());
    args
}

/// Merge: concatenates the batch outputs of one product type.
pub fn files_merge_args(input_dirs: &[PathBuf], out_file: &Path) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "-out", path_arg(out_file));
    args.push("-il".to_string());
    args.extend(input_dirs.iter().map(|p| path_arg(p)));
    args
}

/// Inputs of one time-series analysis run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInputs<'a> {
    pub practice_table: Option<&'a Path>,
    pub ndvi: Option<&'a Path>,
    pub amp: Option<&'a Path>,
    pub cohe: Option<&'a Path>,
}

/// Time-series analysis of one practice.
pub fn time_series_analysis_args(
    site: &SiteConfig,
    practice: Practice,
    inputs: &AnalysisInputs<'_>,
    out_dir: &Path,
) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "-intype", "csv");
    push_flag(&mut args, "-country", site.country());
    push_flag(&mut args, "-practice", practice.code());
    push_flag(&mut args, "-year", site.year().to_string());

    if let Some(table) = inputs.practice_table {
        push_flag(&mut args, "-harvestshp", path_arg(table));
    }
    if let Some(ndvi) = inputs.ndvi {
        push_flag(&mut args, "-dirndvi", path_arg(ndvi));
    }
    if let Some(amp) = inputs.amp {
        push_flag(&mut args, "-diramp", path_arg(amp));
    }
    if let Some(cohe) = inputs.cohe {
        push_flag(&mut args, "-dircohe", path_arg(cohe));
    }

    push_flag(&mut args, "-outdir", path_arg(out_dir));

    if let Some(cfg) = site.practice(practice) {
        push_optional(&mut args, &cfg.tsa.flags());
    }

    args
}

/// What the product formatter needs beyond the site configuration.
#[derive(Debug, Clone)]
pub struct FormatterInputs<'a> {
    pub site_id: SiteId,
    pub tile_id: &'a str,
    pub destination: &'a Path,
    pub manifest_path: &'a Path,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Analysis output directories, in practice declaration order.
    pub analysis_outputs: &'a [PathBuf],
}

/// Product formatter: assembles the final product from all practices.
pub fn product_formatter_args(inputs: &FormatterInputs<'_>) -> Vec<String> {
    let mut args = Vec::new();
    push_flag(&mut args, "-destroot", path_arg(inputs.destination));
    push_flag(&mut args, "-fileclass", "OPER");
    push_flag(&mut args, "-level", "S4C_L4C");
    push_flag(&mut args, "-baseline", "01.00");
    push_flag(&mut args, "-siteid", inputs.site_id.to_string());
    push_flag(
        &mut args,
        "-timeperiod",
        format!(
            "{}_{}",
            inputs.start.format("%Y%m%d"),
            inputs.end.format("%Y%m%d")
        ),
    );
    push_flag(&mut args, "-processor", PROCESSOR_NAME);
    push_flag(&mut args, "-gipp", path_arg(inputs.manifest_path));
    args.push(format!("-processor.{PROCESSOR_NAME}.files"));
    args.push(inputs.tile_id.to_string());
    args.extend(inputs.analysis_outputs.iter().map(|p| path_arg(p)));
    args
}

/// Cleanup: removes intermediate directories once they have been merged.
pub fn cleanup_args(dirs: &[PathBuf]) -> Vec<String> {
    let mut args = vec!["-fr".to_string()];
    args.extend(dirs.iter().map(|p| path_arg(p)));
    args
}
