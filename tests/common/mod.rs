#![allow(dead_code)]

use agripractices::catalog::{DiscoveredInputs, JobScope, ProductSets, ValidatedInputs, validate_inputs};
use agripractices::config::SiteConfig;
use agripractices::pipeline::{GlobalExecutionInfo, WorkingDirs, compile};
use agripractices::types::{JobId, Practice, ProductType, SiteId};

pub use agripractices_test_utils::{
    PracticeConfigBuilder, RecordingScheduler, SiteConfigBuilder, date, init_tracing, products,
    with_timeout,
};

pub fn scope(job: u64) -> JobScope {
    JobScope {
        job_id: JobId(job),
        site_id: SiteId(7),
        site_short_name: "nld".to_string(),
        start: date(2024, 1, 1),
        end: date(2024, 6, 30),
    }
}

pub fn dirs() -> WorkingDirs {
    WorkingDirs::new("/work")
}

/// The same number of products for each of the three types.
pub fn all_products(count: usize) -> ProductSets {
    ProductSets::new()
        .with(ProductType::Ndvi, products("ndvi", count))
        .with(ProductType::Amplitude, products("amp", count))
        .with(ProductType::Coherence, products("cohe", count))
}

pub fn validated(site: &SiteConfig, products: ProductSets) -> ValidatedInputs {
    validate_inputs(
        site,
        DiscoveredInputs {
            products,
            practice_rows: Default::default(),
        },
    )
    .expect("inputs should validate")
}

pub fn compile_job(site: &SiteConfig, products: ProductSets) -> GlobalExecutionInfo {
    let inputs = validated(site, products);
    compile(&scope(1), site, &inputs, &dirs()).expect("compile should succeed")
}

/// Site with catch-crop and fallow enabled, both consuming all product types.
pub fn two_practice_site(group: usize) -> SiteConfig {
    SiteConfigBuilder::new()
        .prds_per_group(group)
        .practice(Practice::CatchCrop)
        .practice(Practice::Fallow)
        .build()
}
