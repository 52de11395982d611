// src/manifest.rs

//! Execution manifest: the provenance record of a completed job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::errors::{PipelineError, Result};
use crate::fs::FileSystem;
use crate::pipeline::GlobalExecutionInfo;
use crate::types::{JobId, ProductType, SiteId};

/// One consumed input product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedProduct {
    pub product_type: ProductType,
    pub id: String,
}

/// Flat list of every input product a job consumed, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionManifest {
    pub job_id: JobId,
    pub site_id: SiteId,
    pub products: Vec<ConsumedProduct>,
}

impl ExecutionManifest {
    /// Build the manifest from a compiled job: all batch inputs of all
    /// product types.
    pub fn from_execution(info: &GlobalExecutionInfo) -> Self {
        let products = info
            .consumed_products()
            .into_iter()
            .map(|(product_type, id)| ConsumedProduct { product_type, id })
            .collect();

        Self {
            job_id: info.scope.job_id,
            site_id: info.scope.site_id,
            products,
        }
    }
}

/// Persists manifests through a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct ManifestWriter {
    fs: Arc<dyn FileSystem>,
}

impl ManifestWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Write `manifest` as JSON to `path`.
    ///
    /// Any failure is reported as `ManifestWrite`; the caller treats it as
    /// fatal for the job.
    pub fn write(&self, path: &Path, manifest: &ExecutionManifest) -> Result<()> {
        let body = serde_json::to_vec_pretty(manifest).map_err(|e| PipelineError::ManifestWrite {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        if self.fs.exists(path) {
            warn!(job_id = %manifest.job_id, path = ?path, "overwriting existing execution manifest");
        }

        if let Err(source) = self.fs.write(path, &body) {
            error!(job_id = %manifest.job_id, path = ?path, error = %source, "manifest write failed");
            return Err(PipelineError::ManifestWrite {
                path: PathBuf::from(path),
                source,
            });
        }

        info!(
            job_id = %manifest.job_id,
            path = ?path,
            products = manifest.products.len(),
            "execution manifest written"
        );
        Ok(())
    }

    /// Read a manifest back (audit tooling and tests).
    pub fn read(&self, path: &Path) -> Result<ExecutionManifest> {
        let text = self.fs.read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
