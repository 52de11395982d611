// src/catalog/memory.rs

use std::collections::BTreeMap;

use super::{CatalogFuture, JobScope, ProductCatalog};
use crate::types::{Practice, ProductType};

/// Catalog backed by fixed lists; ignores the scope window.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: BTreeMap<ProductType, Vec<String>>,
    rows: BTreeMap<Practice, usize>,
    failing: Option<String>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products<I, S>(mut self, product_type: ProductType, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products
            .insert(product_type, products.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_practice_rows(mut self, practice: Practice, rows: usize) -> Self {
        self.rows.insert(practice, rows);
        self
    }

    /// Make every lookup fail with the given message.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failing = Some(message.into());
        self
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn find_products(
        &self,
        _scope: &JobScope,
        product_type: ProductType,
    ) -> CatalogFuture<'_, Vec<String>> {
        let result = match &self.failing {
            Some(msg) => Err(anyhow::anyhow!("{msg}")),
            None => Ok(self.products.get(&product_type).cloned().unwrap_or_default()),
        };
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
