// src/engine/mod.rs

//! Job progression engine.
//!
//! This module ties together:
//! - the per-job state machine ([`job::JobProgress`])
//! - the processor handlers that turn events into job steps
//!   ([`handler::ProcessorHandler`], [`agric`], [`dummy`])
//! - the async runtime loop that reacts to:
//!   - job submissions
//!   - task-finished notifications
//!   - opportunistic product arrivals
//!   - shutdown signals
//!
//! State transitions are pure; discovery, scheduler hand-off and manifest
//! writes happen in the [`runtime`] shell.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::OverrideParameters;
use crate::manifest::ExecutionManifest;
use crate::pipeline::GlobalExecutionInfo;
use crate::types::{JobId, ProductType, SiteId, TaskId};

pub mod agric;
pub mod dummy;
pub mod handler;
pub mod job;
pub mod runtime;

pub use agric::AgricPracticesHandler;
pub use dummy::DummyProcessorHandler;
pub use handler::{HandlerFuture, ProcessingDefinition, ProcessorHandler};
pub use job::JobProgress;
pub use runtime::{Runtime, RuntimeOptions};

/// Lifecycle of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Submitted,
    Compiling,
    TasksDispatched,
    Finalizing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Final outcome reported to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed { reason: String },
}

/// A new job was submitted for a processor.
#[derive(Debug, Clone)]
pub struct JobSubmitted {
    pub job_id: JobId,
    pub processor: String,
    pub site_id: SiteId,
    pub scheduled_date: NaiveDate,
    pub override_parameters: OverrideParameters,
}

/// The external scheduler reports that a task ended.
#[derive(Debug, Clone)]
pub struct TaskFinished {
    pub job_id: JobId,
    pub task: TaskId,
    pub outputs: Vec<String>,
    pub success: bool,
    /// Failure detail from the scheduler, if any.
    pub message: Option<String>,
}

/// A product arrived outside of any job.
#[derive(Debug, Clone)]
pub struct ProductAvailable {
    pub site_id: SiteId,
    pub product_id: String,
    pub product_type: ProductType,
}

/// Events flowing into the runtime from the orchestrator.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    JobSubmitted(JobSubmitted),
    TaskFinished(TaskFinished),
    ProductAvailable(ProductAvailable),
    /// Graceful shutdown requested.
    ShutdownRequested,
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Hand the compiled graph to the external scheduler.
    SubmitTasks(Arc<GlobalExecutionInfo>),
    /// Persist the execution manifest, then report back.
    WriteManifest {
        job_id: JobId,
        path: PathBuf,
        manifest: ExecutionManifest,
    },
    /// The job reached a terminal state.
    JobFinished { job_id: JobId, outcome: JobOutcome },
}

/// Decision returned after handling a single event.
#[derive(Debug, Clone, Default)]
pub struct JobStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Tasks whose parents have now all finished.
    pub newly_unlocked: Vec<TaskId>,
    /// State of the affected job after the event, if a job was affected.
    pub state: Option<JobState>,
}

impl JobStep {
    pub fn empty() -> Self {
        Self::default()
    }
}
