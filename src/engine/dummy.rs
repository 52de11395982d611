// src/engine/dummy.rs

//! Reference handler: one pass-through task over the products that arrived
//! for a site since its last job.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::catalog::{JobScope, ProductSets};
use crate::config::OverrideParameters;
use crate::engine::handler::{HandlerFuture, ProcessingDefinition, ProcessorHandler};
use crate::engine::job::JobProgress;
use crate::engine::{JobState, JobStep, JobSubmitted, ProductAvailable, TaskFinished};
use crate::errors::{PipelineError, Result};
use crate::pipeline::{GlobalExecutionInfo, ProductFormatterParams, TaskGraph, TaskKind, WorkingDirs};
use crate::types::{JobId, ProductType, SiteId};

pub const DUMMY_PROCESSOR_NAME: &str = "dummy";
pub const DUMMY_CMD: &str = "dummy-module";

#[derive(Debug)]
pub struct DummyProcessorHandler {
    dirs: WorkingDirs,
    pending: BTreeMap<SiteId, Vec<ProductAvailable>>,
    jobs: BTreeMap<JobId, JobProgress>,
}

impl DummyProcessorHandler {
    pub fn new(dirs: WorkingDirs) -> Self {
        Self {
            dirs,
            pending: BTreeMap::new(),
            jobs: BTreeMap::new(),
        }
    }

    pub fn pending(&self, site_id: SiteId) -> usize {
        self.pending.get(&site_id).map_or(0, Vec::len)
    }

    fn build(&self, event: &JobSubmitted, products: &[ProductAvailable]) -> Result<GlobalExecutionInfo> {
        if products.is_empty() {
            return Err(PipelineError::Discovery(format!(
                "no products available for site {}",
                event.site_id
            )));
        }

        let scope = JobScope {
            job_id: event.job_id,
            site_id: event.site_id,
            site_short_name: event.site_id.to_string(),
            start: event.scheduled_date,
            end: event.scheduled_date,
        };

        let mut inputs = ProductSets::new();
        for product_type in ProductType::ALL {
            let ids: Vec<String> = products
                .iter()
                .filter(|p| p.product_type == product_type)
                .map(|p| p.product_id.clone())
                .collect();
            if !ids.is_empty() {
                inputs.set(product_type, ids);
            }
        }

        let mut graph = TaskGraph::new();
        let task = graph.add_task(TaskKind::PassThrough, Vec::new())?;
        let destination = self.dirs.product_dir(event.job_id);
        let mut args = vec!["-outdir".to_string(), destination.display().to_string()];
        args.extend(products.iter().map(|p| p.product_id.clone()));
        graph.add_step(task, DUMMY_CMD, args)?;

        Ok(GlobalExecutionInfo {
            scope,
            formatter: ProductFormatterParams {
                task,
                parents: Vec::new(),
                analysis_outputs: Vec::new(),
                tile_id: String::new(),
                destination,
                manifest_path: self.dirs.manifest_path(event.job_id),
            },
            graph,
            practices: Vec::new(),
            inputs,
        })
    }
}

impl ProcessorHandler for DummyProcessorHandler {
    fn processor_name(&self) -> &str {
        DUMMY_PROCESSOR_NAME
    }

    fn processing_definition(
        &self,
        site_id: SiteId,
        scheduled_date: NaiveDate,
        overrides: &OverrideParameters,
    ) -> ProcessingDefinition {
        if self.pending(site_id) == 0 {
            return ProcessingDefinition::invalid(site_id, scheduled_date, "no products available");
        }
        ProcessingDefinition {
            is_valid: true,
            site_id,
            start: scheduled_date,
            end: scheduled_date,
            parameters: overrides.clone(),
            reason: None,
        }
    }

    fn on_job_submitted(&mut self, event: JobSubmitted) -> HandlerFuture<'_, JobStep> {
        Box::pin(async move {
            if self.jobs.contains_key(&event.job_id) {
                warn!(job_id = %event.job_id, "duplicate job submission; ignoring");
                return JobStep {
                    state: self.job_state(event.job_id),
                    ..JobStep::empty()
                };
            }

            let products = self.pending.remove(&event.site_id).unwrap_or_default();
            info!(job_id = %event.job_id, products = products.len(), "dummy job submitted");

            let compiled = self.build(&event, &products);
            let job = self
                .jobs
                .entry(event.job_id)
                .or_insert_with(|| JobProgress::new(event.job_id));
            job.submit(move || compiled)
        })
    }

    fn on_task_finished(&mut self, event: &TaskFinished) -> JobStep {
        match self.jobs.get_mut(&event.job_id) {
            Some(job) => job.task_finished(event),
            None => {
                warn!(job_id = %event.job_id, "task notification for unknown job");
                JobStep::empty()
            }
        }
    }

    fn on_product_available(&mut self, event: &ProductAvailable) -> JobStep {
        debug!(site = %event.site_id, product = %event.product_id, "queueing product");
        self.pending.entry(event.site_id).or_default().push(event.clone());
        JobStep::empty()
    }

    fn on_manifest_written(&mut self, job_id: JobId, result: Result<()>) -> JobStep {
        match self.jobs.get_mut(&job_id) {
            Some(job) => job.manifest_written(result),
            None => JobStep::empty(),
        }
    }

    fn on_dispatch_failed(&mut self, job_id: JobId, err: PipelineError) -> JobStep {
        match self.jobs.get_mut(&job_id) {
            Some(job) => job.dispatch_failed(err),
            None => {
                warn!(%job_id, error = %err, "dispatch failure for unknown job");
                JobStep::empty()
            }
        }
    }

    fn job_state(&self, job_id: JobId) -> Option<JobState> {
        self.jobs.get(&job_id).map(|j| j.state())
    }

    fn release(&mut self, job_id: JobId) -> Option<JobState> {
        let state = self.jobs.get(&job_id)?.state();
        if !state.is_terminal() {
            return None;
        }
        self.jobs.remove(&job_id);
        Some(state)
    }
}
