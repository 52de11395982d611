// tests/config_loading.rs

mod common;
use crate::common::*;

use std::collections::BTreeMap;
use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use agripractices::config::overrides::{
    KEY_END_DATE, KEY_PRACTICES, KEY_PRDS_PER_GROUP, KEY_TILE_ID, date_override,
};
use agripractices::config::{SiteRegistry, apply_overrides, load_and_validate, load_from_str};
use agripractices::errors::PipelineError;
use agripractices::types::{Practice, ProductType, SiteId};

const SITE_TOML: &str = r#"
country = "NLD"
year = 2024
full_shape_path = "/data/lpis/decl.shp"
ids_geom_shape_path = "/data/lpis/ids.shp"
prds_per_group = 10
practices = ["CC", "FL"]

[practice.CC]
additional_files = ["/data/extra.csv"]

[practice.CC.extraction]
veg_start = "2024-03-01"
h_start = 20240615

[practice.CC.tsa]
opt_thr_veg_cycle = 350
catch_proportion = 0.5
catch_crop_is_main = true

[practice.FL]
requires = ["ndvi"]
"#;

fn write_toml(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn config_error(result: agripractices::errors::Result<impl std::fmt::Debug>) -> String {
    match result {
        Err(PipelineError::ConfigError(msg)) => msg,
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn loads_a_complete_site_file() {
    let file = write_toml(SITE_TOML);
    let site = load_and_validate(file.path()).unwrap();

    assert_eq!(site.country(), "NLD");
    assert_eq!(site.year(), 2024);
    assert_eq!(site.practices(), [Practice::CatchCrop, Practice::Fallow]);
    assert_eq!(site.tile_id(), "TILE_none");
    assert_eq!(site.min_practice_rows(), 1);
    assert!(site.remove_intermediates());

    let cc = site.practice(Practice::CatchCrop).unwrap();
    assert_eq!(cc.requires, ProductType::ALL);
    assert_eq!(cc.extraction.veg_start.as_ref().unwrap().as_str(), "2024-03-01");
    assert_eq!(cc.extraction.h_start.as_ref().unwrap().as_str(), "20240615");
    assert_eq!(cc.tsa.opt_thr_veg_cycle.as_ref().unwrap().as_str(), "350");
    assert_eq!(cc.tsa.catch_proportion.as_ref().unwrap().as_str(), "0.5");
    assert_eq!(cc.tsa.catch_crop_is_main.as_ref().unwrap().as_str(), "true");

    let fl = site.practice(Practice::Fallow).unwrap();
    assert!(fl.requires(ProductType::Ndvi));
    assert!(!fl.requires(ProductType::Amplitude));
}

#[test]
fn zero_group_size_is_rejected() {
    let toml = SITE_TOML.replace("prds_per_group = 10", "prds_per_group = 0");
    let file = write_toml(&toml);
    let msg = config_error(load_and_validate(file.path()));
    assert!(msg.contains("prds_per_group"));
}

#[test]
fn enabled_practice_without_section_is_rejected() {
    let toml = SITE_TOML.replace(r#"practices = ["CC", "FL"]"#, r#"practices = ["CC", "NA"]"#);
    let file = write_toml(&toml);
    let msg = config_error(load_and_validate(file.path()));
    assert!(msg.contains("[practice.NA]"));
}

#[test]
fn duplicate_practice_is_rejected() {
    let toml = SITE_TOML.replace(r#"practices = ["CC", "FL"]"#, r#"practices = ["CC", "CC"]"#);
    let msg = config_error(load_and_validate(write_toml(&toml).path()));
    assert!(msg.contains("more than once"));
}

#[test]
fn requires_without_ndvi_is_rejected() {
    let toml = SITE_TOML.replace(r#"requires = ["ndvi"]"#, r#"requires = ["amp"]"#);
    let msg = config_error(load_and_validate(write_toml(&toml).path()));
    assert!(msg.contains("ndvi"));
}

#[test]
fn unknown_practice_code_is_a_parse_error() {
    let toml = SITE_TOML.replace(r#"practices = ["CC", "FL"]"#, r#"practices = ["XX"]"#);
    assert!(matches!(load_from_str(&toml), Err(PipelineError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let result = load_and_validate(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(PipelineError::IoError(_))));
}

#[test]
fn overrides_replace_site_values_for_one_job() {
    let site = two_practice_site(10);
    let overrides = BTreeMap::from([
        (KEY_PRDS_PER_GROUP.to_string(), "3".to_string()),
        (KEY_PRACTICES.to_string(), "FL".to_string()),
        (KEY_TILE_ID.to_string(), "31UFU".to_string()),
    ]);

    let effective = apply_overrides(&site, &overrides).unwrap();
    assert_eq!(effective.prds_per_group(), 3);
    assert_eq!(effective.practices(), [Practice::Fallow]);
    assert_eq!(effective.tile_id(), "31UFU");

    // The site itself is untouched.
    assert_eq!(site.prds_per_group(), 10);
}

#[test]
fn invalid_overrides_are_rejected() {
    let site = two_practice_site(10);

    let zero = BTreeMap::from([(KEY_PRDS_PER_GROUP.to_string(), "0".to_string())]);
    config_error(apply_overrides(&site, &zero));

    let not_a_number = BTreeMap::from([(KEY_PRDS_PER_GROUP.to_string(), "many".to_string())]);
    config_error(apply_overrides(&site, &not_a_number));

    // NFC is a valid code but has no parameter block on this site.
    let unconfigured = BTreeMap::from([(KEY_PRACTICES.to_string(), "CC,NFC".to_string())]);
    config_error(apply_overrides(&site, &unconfigured));
}

#[test]
fn date_overrides_accept_both_formats() {
    let dashed = BTreeMap::from([(KEY_END_DATE.to_string(), "2024-05-31".to_string())]);
    let compact = BTreeMap::from([(KEY_END_DATE.to_string(), "20240531".to_string())]);
    let bad = BTreeMap::from([(KEY_END_DATE.to_string(), "31/05/2024".to_string())]);

    assert_eq!(date_override(&dashed, KEY_END_DATE).unwrap(), Some(date(2024, 5, 31)));
    assert_eq!(date_override(&compact, KEY_END_DATE).unwrap(), Some(date(2024, 5, 31)));
    assert!(date_override(&bad, KEY_END_DATE).is_err());
    assert_eq!(date_override(&BTreeMap::new(), KEY_END_DATE).unwrap(), None);
}

#[test]
fn registry_loads_sites_by_short_name() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("nld.toml"), SITE_TOML).unwrap();

    let mut registry = SiteRegistry::new();
    registry.load_site(SiteId(7), "nld", dir.path()).unwrap();

    let entry = registry.require(SiteId(7)).unwrap();
    assert_eq!(entry.short_name, "nld");
    assert_eq!(entry.config.country(), "NLD");

    assert!(matches!(
        registry.require(SiteId(8)),
        Err(PipelineError::UnknownSite(_))
    ));
    let missing = registry.load_site(SiteId(9), "absent", dir.path());
    assert!(config_error(missing).contains("absent.toml"));
}
