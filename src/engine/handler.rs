// src/engine/handler.rs

//! Processor handler abstraction.
//!
//! Every processor variant implements [`ProcessorHandler`]; the runtime
//! routes events to the handler registered under the job's processor name
//! and never inspects processor-specific state itself.

use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::OverrideParameters;
use crate::engine::{JobState, JobStep, JobSubmitted, ProductAvailable, TaskFinished};
use crate::errors::{PipelineError, Result};
use crate::types::{JobId, SiteId};

/// Boxed future returned by asynchronous handler callbacks.
pub type HandlerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Answer to "what would a job for this site and date process?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingDefinition {
    pub is_valid: bool,
    pub site_id: SiteId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub parameters: OverrideParameters,
    /// Why the definition is not valid.
    pub reason: Option<String>,
}

impl ProcessingDefinition {
    pub fn invalid(site_id: SiteId, date: NaiveDate, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            site_id,
            start: date,
            end: date,
            parameters: OverrideParameters::new(),
            reason: Some(reason.into()),
        }
    }
}

/// Interface implemented by every processor variant.
pub trait ProcessorHandler: Send {
    /// Name jobs use to select this handler.
    fn processor_name(&self) -> &str;

    /// Time window and effective parameters for a prospective job.
    fn processing_definition(
        &self,
        site_id: SiteId,
        scheduled_date: NaiveDate,
        overrides: &OverrideParameters,
    ) -> ProcessingDefinition;

    /// Discover inputs, compile the job and dispatch it.
    ///
    /// Failures are reported through the returned step (a `JobFinished`
    /// command with a failed outcome), never as a panic.
    fn on_job_submitted(&mut self, event: JobSubmitted) -> HandlerFuture<'_, JobStep>;

    fn on_task_finished(&mut self, event: &TaskFinished) -> JobStep;

    /// Products arriving outside a job; most handlers ignore them.
    fn on_product_available(&mut self, event: &ProductAvailable) -> JobStep;

    /// Outcome of the manifest write requested by the handler.
    fn on_manifest_written(&mut self, job_id: JobId, result: Result<()>) -> JobStep;

    /// The scheduler could not take the job's task graph.
    fn on_dispatch_failed(&mut self, job_id: JobId, err: PipelineError) -> JobStep;

    /// Current state of a job owned by this handler.
    fn job_state(&self, job_id: JobId) -> Option<JobState>;

    /// Drop a job whose outcome has been reported; returns its final state.
    ///
    /// Jobs that are not yet terminal are kept.
    fn release(&mut self, job_id: JobId) -> Option<JobState>;
}
