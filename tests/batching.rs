// tests/batching.rs

use proptest::prelude::*;

use agripractices::errors::PipelineError;
use agripractices::pipeline::batch::{batch_count, partition};

#[test]
fn five_products_in_groups_of_two_make_three_batches() {
    let products = vec!["P1", "P2", "P3", "P4", "P5"];
    let batches = partition(&products, 2).unwrap();

    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0], ["P1", "P2"]);
    assert_eq!(batches[1], ["P3", "P4"]);
    assert_eq!(batches[2], ["P5"]);
}

#[test]
fn empty_input_yields_no_batches() {
    let products: Vec<String> = vec![];
    assert!(partition(&products, 3).unwrap().is_empty());
    assert_eq!(batch_count(0, 3), 0);
}

#[test]
fn zero_group_size_is_a_config_error() {
    let err = partition(&[1, 2, 3], 0).unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)));
}

proptest! {
    #[test]
    fn batches_preserve_order_and_bound_size(
        products in proptest::collection::vec(any::<u32>(), 0..200),
        group in 1usize..20,
    ) {
        let batches = partition(&products, group).unwrap();

        prop_assert_eq!(batches.len(), batch_count(products.len(), group));
        prop_assert_eq!(batches.len(), products.len().div_ceil(group));

        for batch in &batches {
            prop_assert!(!batch.is_empty());
            prop_assert!(batch.len() <= group);
        }
        // Every batch but the last is full.
        for batch in batches.iter().rev().skip(1) {
            prop_assert_eq!(batch.len(), group);
        }

        let rejoined: Vec<u32> = batches.concat();
        prop_assert_eq!(rejoined, products);
    }
}
