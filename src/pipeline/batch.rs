// src/pipeline/batch.rs

use crate::errors::{PipelineError, Result};

/// Split `products` into consecutive batches of at most `group_size` items.
///
/// Order is preserved, so concatenating the batches reproduces the input.
/// An empty input yields no batches; the last batch may be shorter than
/// `group_size` but is never empty.
pub fn partition<T>(products: &[T], group_size: usize) -> Result<Vec<&[T]>> {
    if group_size == 0 {
        return Err(PipelineError::ConfigError(
            "products-per-group must be >= 1".to_string(),
        ));
    }
    Ok(products.chunks(group_size).collect())
}

/// Number of batches `partition` would produce.
pub fn batch_count(len: usize, group_size: usize) -> usize {
    if group_size == 0 {
        0
    } else {
        len.div_ceil(group_size)
    }
}
