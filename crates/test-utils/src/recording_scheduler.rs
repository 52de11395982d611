use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use agripractices::engine::{JobOutcome, RuntimeEvent, TaskFinished};
use agripractices::errors::PipelineError;
use agripractices::pipeline::GlobalExecutionInfo;
use agripractices::scheduler::backend::BackendFuture;
use agripractices::scheduler::SchedulerBackend;
use agripractices::types::JobId;
use tokio::sync::mpsc;

/// What the runtime handed to the scheduler.
#[derive(Debug, Default)]
pub struct SchedulerLog {
    pub submitted: Vec<Arc<GlobalExecutionInfo>>,
    pub finished: Vec<(JobId, JobOutcome)>,
    /// Errors returned by the next `submit_tasks` calls, in order.
    pub submit_failures: VecDeque<String>,
    /// Errors returned by the next `job_finished` calls, in order.
    pub report_failures: VecDeque<String>,
}

/// A fake scheduler that:
/// - records every accepted graph and every reported job outcome
/// - optionally reports each task as finished, in arena order (parents first)
/// - can be told to reject the next submissions or reports.
#[derive(Clone)]
pub struct RecordingScheduler {
    log: Arc<Mutex<SchedulerLog>>,
    runtime_tx: Option<mpsc::Sender<RuntimeEvent>>,
}

impl RecordingScheduler {
    /// Record only; task notifications are sent by the test.
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(SchedulerLog::default())),
            runtime_tx: None,
        }
    }

    /// Record and complete every submitted task successfully.
    pub fn completing(runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            log: Arc::new(Mutex::new(SchedulerLog::default())),
            runtime_tx: Some(runtime_tx),
        }
    }

    pub fn submitted(&self) -> Vec<Arc<GlobalExecutionInfo>> {
        self.log.lock().unwrap().submitted.clone()
    }

    pub fn finished(&self) -> Vec<(JobId, JobOutcome)> {
        self.log.lock().unwrap().finished.clone()
    }

    /// Make the next `submit_tasks` call fail with `message`.
    pub fn fail_next_submit(&self, message: impl Into<String>) {
        self.log.lock().unwrap().submit_failures.push_back(message.into());
    }

    /// Make the next `job_finished` call fail with `message`.
    pub fn fail_next_report(&self, message: impl Into<String>) {
        self.log.lock().unwrap().report_failures.push_back(message.into());
    }
}

impl Default for RecordingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBackend for RecordingScheduler {
    fn submit_tasks(&mut self, execution: Arc<GlobalExecutionInfo>) -> BackendFuture<'_> {
        {
            let mut log = self.log.lock().unwrap();
            if let Some(message) = log.submit_failures.pop_front() {
                return Box::pin(async move { Err(PipelineError::Scheduler(message)) });
            }
            log.submitted.push(Arc::clone(&execution));
        }
        let tx = self.runtime_tx.clone();

        Box::pin(async move {
            if let Some(tx) = tx {
                // Sent from a separate task: the runtime is busy executing
                // this very call and cannot drain its channel yet.
                tokio::spawn(async move {
                    for task in execution.tasks() {
                        let event = RuntimeEvent::TaskFinished(TaskFinished {
                            job_id: execution.job_id(),
                            task: task.id,
                            outputs: vec![],
                            success: true,
                            message: None,
                        });
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                });
            }
            Ok(())
        })
    }

    fn job_finished(&mut self, job_id: JobId, outcome: JobOutcome) -> BackendFuture<'_> {
        let mut log = self.log.lock().unwrap();
        if let Some(message) = log.report_failures.pop_front() {
            return Box::pin(async move { Err(PipelineError::Scheduler(message)) });
        }
        log.finished.push((job_id, outcome));
        Box::pin(async { Ok(()) })
    }
}
