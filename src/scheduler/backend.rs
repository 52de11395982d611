// src/scheduler/backend.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::JobOutcome;
use crate::errors::{PipelineError, Result};
use crate::pipeline::GlobalExecutionInfo;
use crate::types::JobId;

/// Boxed future returned by backend calls.
pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Trait abstracting the external scheduler.
///
/// Implementations must honour the graph's parent edges: a task may only be
/// started once every parent has finished successfully.
pub trait SchedulerBackend: Send {
    /// Persist and start the tasks of a freshly compiled job.
    fn submit_tasks(&mut self, execution: Arc<GlobalExecutionInfo>) -> BackendFuture<'_>;

    /// Report the final outcome of a job.
    fn job_finished(&mut self, job_id: JobId, outcome: JobOutcome) -> BackendFuture<'_>;
}

/// Request forwarded by [`ChannelSchedulerBackend`].
#[derive(Debug, Clone)]
pub enum SchedulerRequest {
    Submit(Arc<GlobalExecutionInfo>),
    JobFinished { job_id: JobId, outcome: JobOutcome },
}

/// Production backend: forwards every request over an mpsc channel to
/// whatever persists tasks and launches processes.
#[derive(Debug, Clone)]
pub struct ChannelSchedulerBackend {
    tx: mpsc::Sender<SchedulerRequest>,
}

impl ChannelSchedulerBackend {
    pub fn new(tx: mpsc::Sender<SchedulerRequest>) -> Self {
        Self { tx }
    }

    /// Create a backend together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SchedulerRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl SchedulerBackend for ChannelSchedulerBackend {
    fn submit_tasks(&mut self, execution: Arc<GlobalExecutionInfo>) -> BackendFuture<'_> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            debug!(job_id = %execution.job_id(), tasks = execution.tasks().len(), "forwarding task graph");
            tx.send(SchedulerRequest::Submit(execution))
                .await
                .map_err(|_| PipelineError::Scheduler("scheduler channel closed".to_string()))?;
            Ok(())
        })
    }

    fn job_finished(&mut self, job_id: JobId, outcome: JobOutcome) -> BackendFuture<'_> {
        let tx = self.tx.clone();

        Box::pin(async move {
            tx.send(SchedulerRequest::JobFinished { job_id, outcome })
                .await
                .map_err(|_| PipelineError::Scheduler("scheduler channel closed".to_string()))?;
            Ok(())
        })
    }
}
