// src/catalog/directory.rs

//! Catalog that scans one directory per product type.
//!
//! Product names carry their acquisition date (`..._YYYYMMDD...`), so a
//! lexical sort of the directory entries is also a date sort. Entries whose
//! first date falls outside the job window are skipped. NDVI products are
//! directories; each resolves to the NDVI raster it contains.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::Context;
use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, warn};

use super::{CatalogFuture, JobScope, ProductCatalog};
use crate::fs::FileSystem;
use crate::types::{Practice, ProductType};

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{8})").expect("valid regex"))
}

fn ndvi_raster_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)NDVI.*\.tiff?$").expect("valid regex"))
}

#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    fs: Arc<dyn FileSystem>,
    roots: BTreeMap<ProductType, PathBuf>,
    rows: BTreeMap<Practice, usize>,
}

impl DirectoryCatalog {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            roots: BTreeMap::new(),
            rows: BTreeMap::new(),
        }
    }

    /// Directory holding the products of one type.
    pub fn with_root(mut self, product_type: ProductType, dir: impl Into<PathBuf>) -> Self {
        self.roots.insert(product_type, dir.into());
        self
    }

    /// Known declared-parcel count for a practice.
    pub fn with_practice_rows(mut self, practice: Practice, rows: usize) -> Self {
        self.rows.insert(practice, rows);
        self
    }

    fn scan(&self, scope: &JobScope, product_type: ProductType) -> anyhow::Result<Vec<String>> {
        let Some(root) = self.roots.get(&product_type) else {
            debug!(%product_type, "no directory configured for product type");
            return Ok(Vec::new());
        };

        if !self.fs.is_dir(root) {
            debug!(%product_type, dir = ?root, "product directory does not exist");
            return Ok(Vec::new());
        }

        let mut entries = self
            .fs
            .read_dir(root)
            .with_context(|| format!("listing {product_type} products in {:?}", root))?;
        entries.sort();

        let mut products = Vec::new();
        for entry in entries {
            let Some(date) = acquisition_date(&entry) else {
                debug!(entry = ?entry, "skipping entry without acquisition date");
                continue;
            };
            if !scope.contains(date) {
                continue;
            }

            let product = if product_type == ProductType::Ndvi && self.fs.is_dir(&entry) {
                match self.find_ndvi_raster(&entry)? {
                    Some(raster) => raster,
                    None => {
                        warn!(product = ?entry, "NDVI product has no raster file; skipping");
                        continue;
                    }
                }
            } else {
                entry
            };
            products.push(product.display().to_string());
        }

        Ok(products)
    }

    fn find_ndvi_raster(&self, product_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
        let mut files = self
            .fs
            .read_dir(product_dir)
            .with_context(|| format!("listing NDVI product {:?}", product_dir))?;
        files.sort();

        Ok(files.into_iter().find(|f| {
            f.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| ndvi_raster_pattern().is_match(n))
        }))
    }
}

/// First `YYYYMMDD` date embedded in the entry's file name.
pub fn acquisition_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    date_pattern()
        .captures_iter(name)
        .find_map(|c| NaiveDate::parse_from_str(&c[1], "%Y%m%d").ok())
}

impl ProductCatalog for DirectoryCatalog {
    fn find_products(
        &self,
        scope: &JobScope,
        product_type: ProductType,
    ) -> CatalogFuture<'_, Vec<String>> {
        let result = self.scan(scope, product_type);
        Box::pin(async move { result })
    }

    fn qualifying_rows(
        &self,
        _scope: &JobScope,
        practice: Practice,
    ) -> CatalogFuture<'_, Option<usize>> {
        let rows = self.rows.get(&practice).copied();
        Box::pin(async move { Ok(rows) })
    }
}
