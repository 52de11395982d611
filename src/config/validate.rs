// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{RawSiteConfig, SiteConfig};
use crate::errors::{PipelineError, Result};
use crate::types::ProductType;

impl TryFrom<RawSiteConfig> for SiteConfig {
    type Error = PipelineError;

    fn try_from(raw: RawSiteConfig) -> std::result::Result<Self, Self::Error> {
        validate_site_config(&raw)?;
        Ok(SiteConfig::new_unchecked(raw))
    }
}

/// Run every semantic check on a raw site configuration.
pub fn validate_site_config(cfg: &RawSiteConfig) -> Result<()> {
    validate_common_fields(cfg)?;
    validate_practices(cfg)?;
    Ok(())
}

fn validate_common_fields(cfg: &RawSiteConfig) -> Result<()> {
    if cfg.country.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "`country` must not be empty".to_string(),
        ));
    }

    if !(1900..=2200).contains(&cfg.year) {
        return Err(PipelineError::ConfigError(format!(
            "`year` must be between 1900 and 2200 (got {})",
            cfg.year
        )));
    }

    if cfg.full_shape_path.as_os_str().is_empty() {
        return Err(PipelineError::ConfigError(
            "`full_shape_path` must not be empty".to_string(),
        ));
    }

    if cfg.ids_geom_shape_path.as_os_str().is_empty() {
        return Err(PipelineError::ConfigError(
            "`ids_geom_shape_path` must not be empty".to_string(),
        ));
    }

    if cfg.prds_per_group == 0 {
        return Err(PipelineError::ConfigError(
            "`prds_per_group` must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.tile_id.trim().is_empty() {
        return Err(PipelineError::ConfigError(
            "`tile_id` must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_practices(cfg: &RawSiteConfig) -> Result<()> {
    if cfg.practices.is_empty() {
        return Err(PipelineError::ConfigError(
            "`practices` must list at least one practice".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for practice in cfg.practices.iter() {
        if !seen.insert(*practice) {
            return Err(PipelineError::ConfigError(format!(
                "practice '{}' is listed more than once in `practices`",
                practice
            )));
        }

        let block = cfg.practice.get(practice).ok_or_else(|| {
            PipelineError::ConfigError(format!(
                "practice '{}' is enabled but has no [practice.{}] section",
                practice, practice
            ))
        })?;

        if !block.requires.contains(&ProductType::Ndvi) {
            return Err(PipelineError::ConfigError(format!(
                "[practice.{}].requires must include \"ndvi\"",
                practice
            )));
        }
    }

    Ok(())
}
