// src/engine/runtime.rs

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{PipelineError, Result};
use crate::manifest::ManifestWriter;
use crate::scheduler::SchedulerBackend;
use crate::types::JobId;

use super::handler::ProcessorHandler;
use super::{CoreCommand, JobOutcome, JobStep, RuntimeEvent};

/// Options that affect runtime behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Stop once at least one job ran and no job is in flight.
    pub exit_when_idle: bool,
}

/// Routes `RuntimeEvent`s to processor handlers and executes the commands
/// they return.
///
/// Handlers own all job semantics. This struct only does IO: reading events,
/// handing graphs to the `SchedulerBackend` and writing manifests.
pub struct Runtime<B: SchedulerBackend> {
    handlers: BTreeMap<String, Box<dyn ProcessorHandler>>,
    owners: BTreeMap<JobId, String>,
    active: BTreeSet<JobId>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    backend: B,
    manifests: ManifestWriter,
    options: RuntimeOptions,
}

impl<B: SchedulerBackend> fmt::Debug for Runtime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<B: SchedulerBackend> Runtime<B> {
    pub fn new(
        event_rx: mpsc::Receiver<RuntimeEvent>,
        backend: B,
        manifests: ManifestWriter,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            handlers: BTreeMap::new(),
            owners: BTreeMap::new(),
            active: BTreeSet::new(),
            event_rx,
            backend,
            manifests,
            options,
        }
    }

    /// Register a handler under its processor name.
    pub fn register(&mut self, handler: Box<dyn ProcessorHandler>) -> Result<()> {
        let name = handler.processor_name().to_string();
        if self.handlers.contains_key(&name) {
            return Err(PipelineError::ConfigError(format!(
                "processor '{name}' is registered twice"
            )));
        }
        debug!(processor = %name, "registered processor handler");
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_handler(mut self, handler: Box<dyn ProcessorHandler>) -> Result<Self> {
        self.register(handler)?;
        Ok(self)
    }

    /// Main event loop.
    ///
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Routes them to the owning handler.
    /// - Executes the returned commands.
    pub async fn run(mut self) -> Result<()> {
        info!(handlers = self.handlers.len(), "agripractices runtime started");
        let mut seen_job = false;

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::ShutdownRequested => {
                    info!(in_flight = self.active.len(), "shutdown requested; stopping runtime");
                    break;
                }
                RuntimeEvent::JobSubmitted(_) => seen_job = true,
                _ => {}
            }

            if let Some((job_id, step)) = self.dispatch(event).await {
                self.execute(job_id, step).await;
            }

            if self.should_exit(seen_job) {
                info!("no job in flight; exiting");
                break;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Hand one event to the handler(s) it concerns.
    async fn dispatch(&mut self, event: RuntimeEvent) -> Option<(JobId, JobStep)> {
        match event {
            RuntimeEvent::JobSubmitted(ev) => {
                let job_id = ev.job_id;
                if let Some(owner) = self.owners.get(&job_id) {
                    warn!(
                        %job_id,
                        owner = %owner,
                        processor = %ev.processor,
                        "job id already in flight; ignoring submission"
                    );
                    return None;
                }
                let Some(handler) = self.handlers.get_mut(&ev.processor) else {
                    warn!(%job_id, processor = %ev.processor, "no handler for processor");
                    let reason = format!("no handler registered for processor '{}'", ev.processor);
                    let step = JobStep {
                        commands: vec![CoreCommand::JobFinished {
                            job_id,
                            outcome: JobOutcome::Failed { reason },
                        }],
                        ..JobStep::empty()
                    };
                    return Some((job_id, step));
                };
                self.owners.insert(job_id, ev.processor.clone());
                let step = handler.on_job_submitted(ev).await;
                if step.state.is_some_and(|s| !s.is_terminal()) {
                    self.active.insert(job_id);
                }
                Some((job_id, step))
            }
            RuntimeEvent::TaskFinished(ev) => {
                let Some(handler) = self.handler_for(ev.job_id) else {
                    warn!(job_id = %ev.job_id, task = %ev.task, "task notification for unknown job");
                    return None;
                };
                Some((ev.job_id, handler.on_task_finished(&ev)))
            }
            RuntimeEvent::ProductAvailable(ev) => {
                for handler in self.handlers.values_mut() {
                    let step = handler.on_product_available(&ev);
                    if !step.commands.is_empty() {
                        warn!(product = %ev.product_id, "handler emitted commands on product arrival; ignoring");
                    }
                }
                None
            }
            RuntimeEvent::ShutdownRequested => None,
        }
    }

    fn handler_for(&mut self, job_id: JobId) -> Option<&mut Box<dyn ProcessorHandler>> {
        let name = self.owners.get(&job_id)?;
        self.handlers.get_mut(name)
    }

    fn should_exit(&self, seen_job: bool) -> bool {
        self.options.exit_when_idle && seen_job && self.active.is_empty()
    }

    /// Execute the commands of one step, feeding manifest and dispatch
    /// outcomes straight back to the owning handler.
    ///
    /// Backend errors end up in the job's state; they never stop the loop.
    async fn execute(&mut self, job_id: JobId, step: JobStep) {
        if !step.newly_unlocked.is_empty() {
            debug!(%job_id, unlocked = ?step.newly_unlocked, "tasks unlocked");
        }

        let mut queue: VecDeque<CoreCommand> = step.commands.into();
        while let Some(command) = queue.pop_front() {
            match command {
                CoreCommand::SubmitTasks(execution) => {
                    let job_id = execution.job_id();
                    if let Err(err) = self.backend.submit_tasks(execution).await {
                        warn!(%job_id, error = %err, "scheduler rejected task graph");
                        let Some(handler) = self.handler_for(job_id) else {
                            continue;
                        };
                        let next = handler.on_dispatch_failed(job_id, err);
                        queue.extend(next.commands);
                    }
                }
                CoreCommand::WriteManifest {
                    job_id,
                    path,
                    manifest,
                } => {
                    let result = self.manifests.write(&path, &manifest);
                    let Some(handler) = self.handler_for(job_id) else {
                        warn!(%job_id, "manifest written for job without handler");
                        continue;
                    };
                    let next = handler.on_manifest_written(job_id, result);
                    queue.extend(next.commands);
                }
                CoreCommand::JobFinished { job_id, outcome } => {
                    info!(%job_id, ?outcome, "job finished");
                    self.active.remove(&job_id);
                    if let Err(err) = self.backend.job_finished(job_id, outcome).await {
                        error!(%job_id, error = %err, "failed to report job outcome");
                    }
                    self.release(job_id);
                }
            }
        }
    }

    /// Forget a job once its outcome has been reported.
    fn release(&mut self, job_id: JobId) {
        let Some(handler) = self.handler_for(job_id) else {
            return;
        };
        if let Some(state) = handler.release(job_id) {
            debug!(%job_id, %state, "released finished job");
            self.owners.remove(&job_id);
        }
    }
}
