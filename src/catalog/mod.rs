// src/catalog/mod.rs

//! Product discovery.
//!
//! - [`ProductCatalog`] is the seam to the external product store. Its
//!   methods return boxed futures so the async runtime can issue the three
//!   lookups of one job concurrently.
//! - [`memory`] holds an in-memory catalog for embedding and tests.
//! - [`directory`] scans one directory per product type.
//! - [`discovery`] runs the lookups and validates sufficiency before any task
//!   is compiled.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use serde::Serialize;

use crate::types::{JobId, Practice, ProductType, SiteId};

pub mod directory;
pub mod discovery;
pub mod memory;

pub use directory::DirectoryCatalog;
pub use discovery::{discover_inputs, validate_inputs, ValidatedInputs};
pub use memory::InMemoryCatalog;

/// Boxed future returned by catalog lookups.
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Time and site scope of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobScope {
    pub job_id: JobId,
    pub site_id: SiteId,
    pub site_short_name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl JobScope {
    /// Whether `date` falls inside the inclusive window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Trait abstracting where input products come from.
pub trait ProductCatalog: Send + Sync {
    /// Ordered product identifiers (file paths) of one type inside the scope.
    ///
    /// The order must follow acquisition date; batching preserves it.
    fn find_products(&self, scope: &JobScope, product_type: ProductType)
    -> CatalogFuture<'_, Vec<String>>;

    /// Number of declared parcels for a practice, if the catalog knows it.
    ///
    /// `None` means "unknown" and is treated as qualifying.
    fn qualifying_rows(&self, scope: &JobScope, practice: Practice)
    -> CatalogFuture<'_, Option<usize>>;
}

/// Discovered product identifiers, one ordered list per product type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductSets {
    sets: BTreeMap<ProductType, Vec<String>>,
}

impl ProductSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, product_type: ProductType, products: Vec<String>) -> Self {
        self.set(product_type, products);
        self
    }

    pub fn set(&mut self, product_type: ProductType, products: Vec<String>) {
        self.sets.insert(product_type, products);
    }

    /// Products of one type; empty when nothing was discovered.
    pub fn get(&self, product_type: ProductType) -> &[String] {
        self.sets
            .get(&product_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Everything discovery hands to validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredInputs {
    pub products: ProductSets,
    /// Known qualifying-row counts; practices absent from the map are unknown.
    pub practice_rows: BTreeMap<Practice, usize>,
}
