// src/config/registry.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::loader::load_and_validate;
use crate::config::model::SiteConfig;
use crate::errors::{PipelineError, Result};
use crate::types::SiteId;

/// A registered monitoring site.
#[derive(Debug, Clone)]
pub struct SiteEntry {
    pub id: SiteId,
    pub short_name: String,
    pub config: SiteConfig,
}

/// Site configurations known to a handler, keyed by site id.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: BTreeMap<SiteId, SiteEntry>,
}

impl SiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-validated configuration.
    pub fn register(&mut self, id: SiteId, short_name: impl Into<String>, config: SiteConfig) {
        let short_name = short_name.into();
        debug!(site = %id, short_name = %short_name, "registering site configuration");
        self.sites.insert(
            id,
            SiteEntry {
                id,
                short_name,
                config,
            },
        );
    }

    /// Load `<config_dir>/<short_name>.toml` and register it.
    pub fn load_site(
        &mut self,
        id: SiteId,
        short_name: &str,
        config_dir: impl AsRef<Path>,
    ) -> Result<()> {
        let path = site_config_path(config_dir.as_ref(), short_name);
        info!(site = %id, path = ?path, "loading site configuration");
        let config = load_and_validate(&path).map_err(|e| match e {
            PipelineError::IoError(io) => PipelineError::ConfigError(format!(
                "cannot read site configuration {}: {io}",
                path.display()
            )),
            other => other,
        })?;
        self.register(id, short_name, config);
        Ok(())
    }

    pub fn get(&self, id: SiteId) -> Option<&SiteEntry> {
        self.sites.get(&id)
    }

    /// Like [`get`](Self::get) but reports unknown sites as an error.
    pub fn require(&self, id: SiteId) -> Result<&SiteEntry> {
        self.get(id)
            .ok_or_else(|| PipelineError::UnknownSite(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Path of the configuration file for a site inside a config directory.
pub fn site_config_path(config_dir: &Path, short_name: &str) -> PathBuf {
    config_dir.join(format!("{short_name}.toml"))
}
