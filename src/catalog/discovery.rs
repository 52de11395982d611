// src/catalog/discovery.rs

//! Product discovery and sufficiency validation.
//!
//! Validation runs once, before any task is compiled, so a job with missing
//! inputs fails without leaving a partial graph behind.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::{DiscoveredInputs, JobScope, ProductCatalog, ProductSets};
use crate::config::SiteConfig;
use crate::errors::{PipelineError, Result};
use crate::types::{Practice, ProductType};

/// Inputs that passed validation; the only thing the compiler accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInputs {
    products: ProductSets,
    practices: Vec<Practice>,
    product_types: Vec<ProductType>,
}

impl ValidatedInputs {
    /// Products of the types at least one satisfiable practice consumes.
    pub fn products(&self) -> &ProductSets {
        &self.products
    }

    /// Practices to analyse, in site declaration order.
    pub fn practices(&self) -> &[Practice] {
        &self.practices
    }

    /// Product types to extract and merge, in `ProductType::ALL` order.
    pub fn product_types(&self) -> &[ProductType] {
        &self.product_types
    }
}

/// Query the catalog for all three product types and the practice row counts.
///
/// The three product lookups run concurrently; all of them must succeed.
pub async fn discover_inputs(
    catalog: &dyn ProductCatalog,
    scope: &JobScope,
    site: &SiteConfig,
) -> Result<DiscoveredInputs> {
    let (ndvi, amp, cohe) = tokio::try_join!(
        catalog.find_products(scope, ProductType::Ndvi),
        catalog.find_products(scope, ProductType::Amplitude),
        catalog.find_products(scope, ProductType::Coherence),
    )
    .map_err(|e| PipelineError::Discovery(format!("{e:#}")))?;

    let mut practice_rows = BTreeMap::new();
    for practice in site.practices() {
        let rows = catalog
            .qualifying_rows(scope, *practice)
            .await
            .map_err(|e| PipelineError::Discovery(format!("{e:#}")))?;
        if let Some(rows) = rows {
            practice_rows.insert(*practice, rows);
        }
    }

    info!(
        job_id = %scope.job_id,
        site = %scope.site_short_name,
        ndvi = ndvi.len(),
        amp = amp.len(),
        cohe = cohe.len(),
        "product discovery finished"
    );

    Ok(DiscoveredInputs {
        products: ProductSets::new()
            .with(ProductType::Ndvi, ndvi)
            .with(ProductType::Amplitude, amp)
            .with(ProductType::Coherence, cohe),
        practice_rows,
    })
}

/// Decide which practices can be analysed and check their inputs exist.
///
/// - A practice with a known row count below `min_practice_rows` is skipped.
/// - If no practice remains, fails with `NoQualifyingPractice`.
/// - If a remaining practice requires a product type with no products, fails
///   with `InsufficientInput`.
pub fn validate_inputs(site: &SiteConfig, inputs: DiscoveredInputs) -> Result<ValidatedInputs> {
    let mut practices = Vec::new();

    for practice in site.practices().iter().copied() {
        match inputs.practice_rows.get(&practice) {
            Some(&rows) if rows < site.min_practice_rows() => {
                info!(
                    %practice,
                    rows,
                    min = site.min_practice_rows(),
                    "practice has no qualifying rows; skipping"
                );
            }
            _ => practices.push(practice),
        }
    }

    if practices.is_empty() {
        warn!("no enabled practice has qualifying rows");
        return Err(PipelineError::NoQualifyingPractice);
    }

    let mut product_types = Vec::new();
    for product_type in ProductType::ALL {
        let consumers: Vec<Practice> = practices
            .iter()
            .copied()
            .filter(|p| site.practice(*p).is_some_and(|cfg| cfg.requires(product_type)))
            .collect();

        if consumers.is_empty() {
            debug!(%product_type, "product type not required by any practice");
            continue;
        }

        if inputs.products.get(product_type).is_empty() {
            return Err(PipelineError::InsufficientInput {
                product_type,
                practice: consumers[0],
            });
        }

        product_types.push(product_type);
    }

    let mut products = ProductSets::new();
    for product_type in product_types.iter().copied() {
        products.set(product_type, inputs.products.get(product_type).to_vec());
    }

    Ok(ValidatedInputs {
        products,
        practices,
        product_types,
    })
}
