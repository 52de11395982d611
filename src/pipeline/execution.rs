// src/pipeline/execution.rs

//! The compiled result handed to the external scheduler.

use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::{JobScope, ProductSets};
use crate::pipeline::graph::{Task, TaskGraph};
use crate::types::{JobId, Practice, ProductType, TaskId};

/// Output of one practice's analysis task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeOutput {
    pub practice: Practice,
    pub task: TaskId,
    pub output_dir: PathBuf,
}

/// Parameters of the terminal product-formatting task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductFormatterParams {
    pub task: TaskId,
    /// Analysis tasks the formatter waits for, in practice declaration order.
    pub parents: Vec<TaskId>,
    pub analysis_outputs: Vec<PracticeOutput>,
    pub tile_id: String,
    pub destination: PathBuf,
    pub manifest_path: PathBuf,
}

/// Full compiled graph of one job. Write-once, read-many.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalExecutionInfo {
    pub scope: JobScope,
    pub graph: TaskGraph,
    pub formatter: ProductFormatterParams,
    /// Practices compiled into the graph, in declaration order.
    pub practices: Vec<Practice>,
    /// Products consumed by the extraction tasks, in discovery order.
    pub inputs: ProductSets,
}

impl GlobalExecutionInfo {
    pub fn job_id(&self) -> JobId {
        self.scope.job_id
    }

    pub fn tasks(&self) -> &[Task] {
        self.graph.tasks()
    }

    pub fn terminal_task(&self) -> TaskId {
        self.formatter.task
    }

    /// Every consumed product id, types in `ProductType::ALL` order.
    pub fn consumed_products(&self) -> Vec<(ProductType, String)> {
        ProductType::ALL
            .iter()
            .flat_map(|t| self.inputs.get(*t).iter().map(move |p| (*t, p.clone())))
            .collect()
    }

    /// Serialise the graph for the external scheduler.
    pub fn to_json(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
