// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawSiteConfig, SiteConfig};
use crate::errors::Result;

/// Load a site configuration file and return the raw `RawSiteConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSiteConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

/// Parse a site configuration from TOML text.
pub fn load_from_str(contents: &str) -> Result<RawSiteConfig> {
    let config: RawSiteConfig = toml::from_str(contents)?;
    Ok(config)
}

/// Load a site configuration file and validate it.
///
/// This is the recommended entry point: it fails fast with a
/// `ConfigError` before any product discovery happens.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let raw = load_from_path(&path)?;
    SiteConfig::try_from(raw)
}
