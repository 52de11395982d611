// src/pipeline/graph.rs

//! Arena-backed task graph.
//!
//! The graph owns every [`Task`] and [`Step`] of one job. Dependency edges are
//! stored as [`TaskId`] indices into the same arena, and a parent index is
//! always smaller than its child's index: tasks are appended only after all
//! their parents, so the graph is acyclic by construction.

use std::fmt;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;

use crate::errors::{PipelineError, Result};
use crate::types::{Practice, ProductType, StepId, TaskId};

/// What a task does; one variant per external tool family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "tool", rename_all = "kebab-case")]
pub enum TaskKind {
    IdsExtractor,
    PracticesExtractor { practice: Practice },
    DataExtractor { product_type: ProductType, batch: usize },
    FilesMerge { product_type: ProductType },
    TimeSeriesAnalysis { practice: Practice },
    ProductFormatter,
    /// Single-task jobs that forward already-available products.
    PassThrough,
}

impl TaskKind {
    /// Module name reported to the external scheduler.
    pub fn module_name(&self) -> &'static str {
        match self {
            TaskKind::IdsExtractor => "ids-extractor",
            TaskKind::PracticesExtractor { .. } => "practices-extractor",
            TaskKind::DataExtractor { .. } => "data-extractor",
            TaskKind::FilesMerge { .. } => "files-merge",
            TaskKind::TimeSeriesAnalysis { .. } => "time-series-analysis",
            TaskKind::ProductFormatter => "product-formatter",
            TaskKind::PassThrough => "dummy-module",
        }
    }

    /// Directory-safe label, unique among the tasks of one job.
    pub fn label(&self) -> String {
        match self {
            TaskKind::IdsExtractor | TaskKind::ProductFormatter | TaskKind::PassThrough => {
                self.module_name().to_string()
            }
            TaskKind::PracticesExtractor { practice }
            | TaskKind::TimeSeriesAnalysis { practice } => {
                format!("{}-{}", self.module_name(), practice)
            }
            TaskKind::DataExtractor {
                product_type,
                batch,
            } => format!("{}-{}-{}", self.module_name(), product_type, batch),
            TaskKind::FilesMerge { product_type } => {
                format!("{}-{}", self.module_name(), product_type)
            }
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A compiled unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Tasks whose outputs this task reads; all have a smaller id.
    pub parents: Vec<TaskId>,
    /// Steps owned by this task, in execution order.
    pub steps: Vec<StepId>,
}

/// One concrete tool invocation belonging to a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub id: StepId,
    pub task: TaskId,
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    steps: Vec<Step>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task. Every parent must already be in the arena.
    pub fn add_task(&mut self, kind: TaskKind, parents: Vec<TaskId>) -> Result<TaskId> {
        let len = self.tasks.len();
        if let Some(bad) = parents.iter().find(|p| p.index() >= len) {
            return Err(PipelineError::InvalidTaskRef {
                task: kind.label(),
                parent: *bad,
                len,
            });
        }

        let id = TaskId(len);
        self.tasks.push(Task {
            id,
            kind,
            parents,
            steps: Vec::new(),
        });
        Ok(id)
    }

    /// Append a step to an existing task; steps run in the order added.
    pub fn add_step(
        &mut self,
        task: TaskId,
        command: impl Into<String>,
        args: Vec<String>,
    ) -> Result<StepId> {
        let len = self.tasks.len();
        let owner = self
            .tasks
            .get_mut(task.index())
            .ok_or_else(|| PipelineError::InvalidTaskRef {
                task: "step owner".to_string(),
                parent: task,
                len,
            })?;

        let id = StepId(self.steps.len());
        owner.steps.push(id);
        self.steps.push(Step {
            id,
            task,
            command: command.into(),
            args,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.index())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Steps of one task, in execution order.
    pub fn steps_of(&self, id: TaskId) -> Vec<&Step> {
        self.task(id)
            .map(|t| t.steps.iter().filter_map(|s| self.steps.get(s.0)).collect())
            .unwrap_or_default()
    }

    /// Tasks that list `id` as a parent.
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.parents.contains(&id))
            .map(|t| t.id)
            .collect()
    }

    /// Tasks of the given kind family, in arena order.
    pub fn tasks_where(&self, pred: impl Fn(&TaskKind) -> bool) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| pred(&t.kind))
            .map(|t| t.id)
            .collect()
    }

    /// Independent acyclicity check over the stored edges.
    ///
    /// `add_task` already guarantees parents precede children; this
    /// cross-checks the arena with a topological sort.
    pub fn validate_acyclic(&self) -> Result<()> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

        for task in self.tasks.iter() {
            graph.add_node(task.id.index());
        }

        // Edge direction: parent -> child.
        for task in self.tasks.iter() {
            for parent in task.parents.iter() {
                graph.add_edge(parent.index(), task.id.index(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => {
                let node = cycle.node_id();
                let label = self
                    .tasks
                    .get(node)
                    .map(|t| t.kind.label())
                    .unwrap_or_else(|| node.to_string());
                Err(PipelineError::DagCycle(format!(
                    "cycle detected in task graph involving task '{}'",
                    label
                )))
            }
        }
    }
}
