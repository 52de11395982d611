// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Practice, ProductType, TaskId};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Insufficient input: no {product_type} products found but practice {practice} requires them")]
    InsufficientInput {
        product_type: ProductType,
        practice: Practice,
    },

    #[error("Insufficient input: none of the enabled practices has qualifying rows")]
    NoQualifyingPractice,

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("Task {task} references parent {parent} outside the task list (len {len})")]
    InvalidTaskRef {
        task: String,
        parent: TaskId,
        len: usize,
    },

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Task {task} failed: {message}")]
    TaskExecutionFailure { task: TaskId, message: String },

    #[error("Failed to write execution manifest {path:?}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Product discovery failed: {0}")]
    Discovery(String),

    #[error("Scheduler hand-off failed: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Whether resubmitting the same job without new data could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Discovery(_) | PipelineError::IoError(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
