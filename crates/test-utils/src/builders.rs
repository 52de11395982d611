#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use agripractices::config::{PracticeConfig, RawSiteConfig, SiteConfig, ToolValue};
use agripractices::types::{Practice, ProductType};

/// Builder for `SiteConfig` to simplify test setup.
///
/// Defaults to a valid NLD/2024 site with no practice enabled.
pub struct SiteConfigBuilder {
    config: RawSiteConfig,
}

impl SiteConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawSiteConfig {
                country: "NLD".to_string(),
                year: 2024,
                full_shape_path: PathBuf::from("/data/lpis/decl.shp"),
                ids_geom_shape_path: PathBuf::from("/data/lpis/ids.shp"),
                prds_per_group: 10,
                practices: vec![],
                tile_id: "TILE_none".to_string(),
                min_practice_rows: 1,
                remove_intermediates: true,
                practice: BTreeMap::new(),
            },
        }
    }

    pub fn country(mut self, country: &str) -> Self {
        self.config.country = country.to_string();
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.config.year = year;
        self
    }

    pub fn prds_per_group(mut self, n: usize) -> Self {
        self.config.prds_per_group = n;
        self
    }

    pub fn tile_id(mut self, tile: &str) -> Self {
        self.config.tile_id = tile.to_string();
        self
    }

    pub fn min_practice_rows(mut self, n: usize) -> Self {
        self.config.min_practice_rows = n;
        self
    }

    pub fn remove_intermediates(mut self, val: bool) -> Self {
        self.config.remove_intermediates = val;
        self
    }

    /// Enable a practice with the given parameter block.
    pub fn with_practice(mut self, practice: Practice, cfg: PracticeConfig) -> Self {
        self.config.practices.push(practice);
        self.config.practice.insert(practice, cfg);
        self
    }

    /// Enable a practice that requires all three product types.
    pub fn practice(self, practice: Practice) -> Self {
        self.with_practice(practice, PracticeConfigBuilder::new().build())
    }

    pub fn raw(self) -> RawSiteConfig {
        self.config
    }

    pub fn build(self) -> SiteConfig {
        SiteConfig::try_from(self.config).expect("Failed to build valid site config from builder")
    }
}

impl Default for SiteConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `PracticeConfig`.
pub struct PracticeConfigBuilder {
    cfg: PracticeConfig,
}

impl PracticeConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PracticeConfig::default(),
        }
    }

    /// Replace the consumed product types.
    pub fn requires(mut self, types: &[ProductType]) -> Self {
        self.cfg.requires = types.to_vec();
        self
    }

    pub fn additional_file(mut self, path: &str) -> Self {
        self.cfg.additional_files.push(PathBuf::from(path));
        self
    }

    pub fn veg_start(mut self, value: &str) -> Self {
        self.cfg.extraction.veg_start = Some(ToolValue::new(value));
        self
    }

    pub fn h_start(mut self, value: &str) -> Self {
        self.cfg.extraction.h_start = Some(ToolValue::new(value));
        self
    }

    pub fn opt_thr_veg_cycle(mut self, value: &str) -> Self {
        self.cfg.tsa.opt_thr_veg_cycle = Some(ToolValue::new(value));
        self
    }

    pub fn catch_period(mut self, value: &str) -> Self {
        self.cfg.tsa.catch_period = Some(ToolValue::new(value));
        self
    }

    pub fn build(self) -> PracticeConfig {
        self.cfg
    }
}

impl Default for PracticeConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
