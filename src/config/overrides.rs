// src/config/overrides.rs

//! Per-job parameter overrides carried by `JobSubmitted` events.
//!
//! Overrides replace site-file values for a single job only. The result is
//! re-validated, so an override can never produce a config that the loader
//! would have rejected.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::model::SiteConfig;
use crate::errors::{PipelineError, Result};
use crate::types::Practice;

pub const KEY_PRDS_PER_GROUP: &str = "processor.s4c_l4c.prds_per_group";
pub const KEY_PRACTICES: &str = "processor.s4c_l4c.practices";
pub const KEY_TILE_ID: &str = "processor.s4c_l4c.tile_id";
pub const KEY_START_DATE: &str = "processor.s4c_l4c.start_date";
pub const KEY_END_DATE: &str = "processor.s4c_l4c.end_date";

/// Override map as delivered by the orchestrator.
pub type OverrideParameters = BTreeMap<String, String>;

/// Apply the overrides that affect the site configuration.
pub fn apply_overrides(site: &SiteConfig, overrides: &OverrideParameters) -> Result<SiteConfig> {
    let mut raw = site.to_raw();

    if let Some(value) = non_empty(overrides, KEY_PRDS_PER_GROUP) {
        raw.prds_per_group = value.parse::<usize>().map_err(|e| {
            PipelineError::ConfigError(format!(
                "override {KEY_PRDS_PER_GROUP}={value} is not a valid count: {e}"
            ))
        })?;
    }

    if let Some(value) = non_empty(overrides, KEY_PRACTICES) {
        raw.practices = value
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<Practice>().map_err(PipelineError::ConfigError))
            .collect::<Result<Vec<_>>>()?;
    }

    if let Some(value) = non_empty(overrides, KEY_TILE_ID) {
        raw.tile_id = value.to_string();
    }

    SiteConfig::try_from(raw)
}

/// Parse a date override (`YYYY-MM-DD` or `YYYYMMDD`), if present.
pub fn date_override(overrides: &OverrideParameters, key: &str) -> Result<Option<NaiveDate>> {
    match non_empty(overrides, key) {
        None => Ok(None),
        Some(value) => parse_date(value).map(Some).ok_or_else(|| {
            PipelineError::ConfigError(format!("override {key}={value} is not a valid date"))
        }),
    }
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}

fn non_empty<'a>(overrides: &'a OverrideParameters, key: &str) -> Option<&'a str> {
    overrides
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}
