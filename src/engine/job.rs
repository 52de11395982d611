// src/engine/job.rs

//! Per-job state machine.
//!
//! ```text
//! Submitted -> Compiling -> TasksDispatched -> Finalizing -> Completed
//!                  |              |                 |
//!                  +--------------+-----------------+--> Failed
//! ```
//!
//! Completion flags live here, one per task in the compiled arena, so the
//! compiled graph itself stays immutable.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::engine::{CoreCommand, JobOutcome, JobState, JobStep, TaskFinished};
use crate::errors::{PipelineError, Result};
use crate::manifest::ExecutionManifest;
use crate::pipeline::GlobalExecutionInfo;
use crate::types::{JobId, TaskId};

#[derive(Debug)]
pub struct JobProgress {
    job_id: JobId,
    state: JobState,
    execution: Option<Arc<GlobalExecutionInfo>>,
    finished: Vec<bool>,
    failure: Option<String>,
}

impl JobProgress {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            state: JobState::Submitted,
            execution: None,
            finished: Vec::new(),
            failure: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn execution(&self) -> Option<&Arc<GlobalExecutionInfo>> {
        self.execution.as_ref()
    }

    /// Reason of the failure, once the job is `Failed`.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_finished(&self, task: TaskId) -> bool {
        self.finished.get(task.index()).copied().unwrap_or(false)
    }

    pub fn unfinished_count(&self) -> usize {
        self.finished.iter().filter(|done| !**done).count()
    }

    /// Unfinished tasks whose parents have all finished.
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        let Some(exec) = &self.execution else {
            return Vec::new();
        };
        exec.tasks()
            .iter()
            .filter(|t| !self.is_finished(t.id))
            .filter(|t| t.parents.iter().all(|p| self.is_finished(*p)))
            .map(|t| t.id)
            .collect()
    }

    /// Compile the job's graph and dispatch it.
    ///
    /// Only valid from `Submitted`; a repeated submission is ignored.
    pub fn submit(&mut self, compile: impl FnOnce() -> Result<GlobalExecutionInfo>) -> JobStep {
        if self.state != JobState::Submitted {
            warn!(job_id = %self.job_id, state = %self.state, "job already submitted; ignoring");
            return self.step(Vec::new(), Vec::new());
        }

        self.state = JobState::Compiling;
        debug!(job_id = %self.job_id, "compiling task graph");

        match compile() {
            Ok(exec) => {
                let exec = Arc::new(exec);
                self.finished = vec![false; exec.tasks().len()];
                self.execution = Some(Arc::clone(&exec));
                self.state = JobState::TasksDispatched;
                info!(
                    job_id = %self.job_id,
                    tasks = exec.tasks().len(),
                    "task graph dispatched"
                );
                let roots = self.ready_tasks();
                self.step(vec![CoreCommand::SubmitTasks(exec)], roots)
            }
            Err(err) => self.fail(err),
        }
    }

    /// React to a task-finished notification.
    pub fn task_finished(&mut self, event: &TaskFinished) -> JobStep {
        if self.state != JobState::TasksDispatched {
            debug!(
                job_id = %self.job_id,
                task = %event.task,
                state = %self.state,
                "task notification outside TasksDispatched; ignoring"
            );
            return self.step(Vec::new(), Vec::new());
        }

        let Some(exec) = self.execution.clone() else {
            return self.step(Vec::new(), Vec::new());
        };

        let Some(task) = exec.graph.task(event.task) else {
            warn!(job_id = %self.job_id, task = %event.task, "notification for unknown task; ignoring");
            return self.step(Vec::new(), Vec::new());
        };

        if !event.success {
            let message = event
                .message
                .clone()
                .unwrap_or_else(|| format!("{} reported failure", task.kind));
            return self.fail(PipelineError::TaskExecutionFailure {
                task: event.task,
                message,
            });
        }

        if self.is_finished(event.task) {
            debug!(job_id = %self.job_id, task = %event.task, "duplicate notification; ignoring");
            return self.step(Vec::new(), Vec::new());
        }

        self.finished[event.task.index()] = true;
        debug!(
            job_id = %self.job_id,
            task = %event.task,
            kind = %task.kind,
            remaining = self.unfinished_count(),
            "task finished"
        );

        let newly_unlocked: Vec<TaskId> = exec
            .graph
            .dependents_of(event.task)
            .into_iter()
            .filter(|d| !self.is_finished(*d))
            .filter(|d| {
                exec.graph
                    .task(*d)
                    .is_some_and(|t| t.parents.iter().all(|p| self.is_finished(*p)))
            })
            .collect();

        if self.unfinished_count() > 0 {
            if event.task == exec.terminal_task() {
                warn!(
                    job_id = %self.job_id,
                    remaining = self.unfinished_count(),
                    "terminal task finished before the rest of the graph; deferring finalisation"
                );
            }
            return self.step(Vec::new(), newly_unlocked);
        }

        self.state = JobState::Finalizing;
        info!(job_id = %self.job_id, "all tasks finished; writing execution manifest");
        let command = CoreCommand::WriteManifest {
            job_id: self.job_id,
            path: exec.formatter.manifest_path.clone(),
            manifest: ExecutionManifest::from_execution(&exec),
        };
        self.step(vec![command], newly_unlocked)
    }

    /// The scheduler refused the compiled graph; nothing of it will run.
    pub fn dispatch_failed(&mut self, err: PipelineError) -> JobStep {
        if self.state != JobState::TasksDispatched {
            warn!(job_id = %self.job_id, state = %self.state, "dispatch failure outside TasksDispatched; ignoring");
            return self.step(Vec::new(), Vec::new());
        }
        self.fail(err)
    }

    /// React to the outcome of the manifest write.
    pub fn manifest_written(&mut self, result: Result<()>) -> JobStep {
        if self.state != JobState::Finalizing {
            warn!(job_id = %self.job_id, state = %self.state, "manifest outcome outside Finalizing; ignoring");
            return self.step(Vec::new(), Vec::new());
        }

        match result {
            Ok(()) => {
                self.state = JobState::Completed;
                info!(job_id = %self.job_id, "job completed");
                self.step(
                    vec![CoreCommand::JobFinished {
                        job_id: self.job_id,
                        outcome: JobOutcome::Completed,
                    }],
                    Vec::new(),
                )
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: PipelineError) -> JobStep {
        let reason = err.to_string();
        error!(job_id = %self.job_id, state = %self.state, error = %reason, "job failed");
        self.state = JobState::Failed;
        self.failure = Some(reason.clone());
        self.step(
            vec![CoreCommand::JobFinished {
                job_id: self.job_id,
                outcome: JobOutcome::Failed { reason },
            }],
            Vec::new(),
        )
    }

    fn step(&self, commands: Vec<CoreCommand>, newly_unlocked: Vec<TaskId>) -> JobStep {
        JobStep {
            commands,
            newly_unlocked,
            state: Some(self.state),
        }
    }
}
