// src/pipeline/layout.rs

//! Output locations and file names.
//!
//! Every path a job produces is derived from `(root, job id, task id, task
//! kind)`, so scratch directories never collide between batches, product
//! types or jobs.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::SiteConfig;
use crate::pipeline::graph::TaskKind;
use crate::types::{JobId, Practice, ProductType, TaskId};

/// File written by the ids-extractor task.
pub const IDS_FILE_NAME: &str = "filter_ids.csv";

/// File name of the execution manifest inside the job directory.
pub const MANIFEST_FILE_NAME: &str = "execution_infos.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingDirs {
    root: PathBuf,
}

impl WorkingDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job: JobId) -> PathBuf {
        self.root.join(format!("job_{job}"))
    }

    /// Scratch/output directory owned by one task.
    pub fn task_dir(&self, job: JobId, task: TaskId, kind: &TaskKind) -> PathBuf {
        self.job_dir(job).join(format!("{:03}_{}", task.index(), kind.label()))
    }

    /// Where the execution manifest of a job is written.
    pub fn manifest_path(&self, job: JobId) -> PathBuf {
        self.job_dir(job).join(MANIFEST_FILE_NAME)
    }

    /// Destination root handed to the product formatter.
    pub fn product_dir(&self, job: JobId) -> PathBuf {
        self.job_dir(job).join("product")
    }
}

/// Name of the merged extraction file of one product type.
pub fn merged_file_name(site: &SiteConfig, product_type: ProductType) -> String {
    format!(
        "S4C_L4C_{}_{}_{}_Extracted_Data.csv",
        site.country(),
        site.year(),
        product_type.file_tag()
    )
}

/// Name of the practice table produced by the practices extractor.
pub fn practice_table_file_name(site: &SiteConfig, practice: Practice) -> String {
    format!(
        "S4C_L4C_{}_{}_{}.csv",
        practice.code(),
        site.country(),
        site.year()
    )
}
