// src/config/mod.rs

//! Site configuration loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a site file from disk (`loader.rs`).
//! - Validate required fields and practice blocks (`validate.rs`).
//! - Apply per-job overrides (`overrides.rs`).
//! - Keep the configurations of all known sites (`registry.rs`).

pub mod loader;
pub mod model;
pub mod overrides;
pub mod registry;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{
    PracticeConfig, PracticeExtractionParams, RawSiteConfig, SiteConfig,
    TimeSeriesAnalysisParams, ToolValue,
};
pub use overrides::{apply_overrides, OverrideParameters};
pub use registry::{SiteEntry, SiteRegistry};
pub use validate::validate_site_config;
