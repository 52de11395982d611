// src/engine/agric.rs

//! Handler for the agricultural-practices processor.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::catalog::{discover_inputs, validate_inputs, JobScope, ProductCatalog};
use crate::config::overrides::{date_override, KEY_END_DATE, KEY_START_DATE};
use crate::config::{apply_overrides, OverrideParameters, SiteConfig, SiteRegistry};
use crate::engine::handler::{HandlerFuture, ProcessingDefinition, ProcessorHandler};
use crate::engine::job::JobProgress;
use crate::engine::{JobState, JobStep, JobSubmitted, ProductAvailable, TaskFinished};
use crate::errors::{PipelineError, Result};
use crate::pipeline::arguments::PROCESSOR_NAME;
use crate::pipeline::{compile, WorkingDirs};
use crate::types::{JobId, SiteId};

pub struct AgricPracticesHandler {
    sites: SiteRegistry,
    catalog: Arc<dyn ProductCatalog>,
    dirs: WorkingDirs,
    jobs: BTreeMap<JobId, JobProgress>,
}

impl std::fmt::Debug for AgricPracticesHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgricPracticesHandler")
            .field("sites", &self.sites.len())
            .field("dirs", &self.dirs)
            .field("jobs", &self.jobs.len())
            .finish_non_exhaustive()
    }
}

impl AgricPracticesHandler {
    pub fn new(sites: SiteRegistry, catalog: Arc<dyn ProductCatalog>, dirs: WorkingDirs) -> Self {
        Self {
            sites,
            catalog,
            dirs,
            jobs: BTreeMap::new(),
        }
    }

    pub fn job(&self, job_id: JobId) -> Option<&JobProgress> {
        self.jobs.get(&job_id)
    }

    /// Resolve the effective configuration and time window of a job.
    fn resolve(
        &self,
        site_id: SiteId,
        scheduled_date: NaiveDate,
        overrides: &OverrideParameters,
    ) -> Result<(String, SiteConfig, NaiveDate, NaiveDate)> {
        let entry = self.sites.require(site_id)?;
        let site = apply_overrides(&entry.config, overrides)?;
        let (start, end) = processing_window(&site, scheduled_date, overrides)?;
        Ok((entry.short_name.clone(), site, start, end))
    }
}

/// `[Jan 1 of the site year (or start override), min(scheduled, end override)]`.
fn processing_window(
    site: &SiteConfig,
    scheduled_date: NaiveDate,
    overrides: &OverrideParameters,
) -> Result<(NaiveDate, NaiveDate)> {
    let season_start = NaiveDate::from_ymd_opt(site.year(), 1, 1)
        .ok_or_else(|| PipelineError::ConfigError(format!("invalid site year {}", site.year())))?;

    let start = date_override(overrides, KEY_START_DATE)?.unwrap_or(season_start);
    let end = match date_override(overrides, KEY_END_DATE)? {
        Some(end) => end.min(scheduled_date),
        None => scheduled_date,
    };

    if start > end {
        return Err(PipelineError::ConfigError(format!(
            "empty processing window {start} .. {end}"
        )));
    }
    Ok((start, end))
}

impl ProcessorHandler for AgricPracticesHandler {
    fn processor_name(&self) -> &str {
        PROCESSOR_NAME
    }

    fn processing_definition(
        &self,
        site_id: SiteId,
        scheduled_date: NaiveDate,
        overrides: &OverrideParameters,
    ) -> ProcessingDefinition {
        match self.resolve(site_id, scheduled_date, overrides) {
            Ok((_, _, start, end)) => ProcessingDefinition {
                is_valid: true,
                site_id,
                start,
                end,
                parameters: overrides.clone(),
                reason: None,
            },
            Err(err) => {
                debug!(site = %site_id, error = %err, "no valid processing definition");
                ProcessingDefinition::invalid(site_id, scheduled_date, err.to_string())
            }
        }
    }

    fn on_job_submitted(&mut self, event: JobSubmitted) -> HandlerFuture<'_, JobStep> {
        Box::pin(async move {
            if let Some(job) = self.jobs.get(&event.job_id) {
                warn!(job_id = %event.job_id, state = %job.state(), "duplicate job submission; ignoring");
                return JobStep {
                    state: Some(job.state()),
                    ..JobStep::empty()
                };
            }

            info!(
                job_id = %event.job_id,
                site = %event.site_id,
                scheduled = %event.scheduled_date,
                "agricultural practices job submitted"
            );
            self.jobs
                .insert(event.job_id, JobProgress::new(event.job_id));

            let resolved = self.resolve(event.site_id, event.scheduled_date, &event.override_parameters);
            let prepared = match resolved {
                Ok((short_name, site, start, end)) => {
                    let scope = JobScope {
                        job_id: event.job_id,
                        site_id: event.site_id,
                        site_short_name: short_name,
                        start,
                        end,
                    };
                    let discovered = discover_inputs(self.catalog.as_ref(), &scope, &site).await;
                    discovered.map(|inputs| (scope, site, inputs))
                }
                Err(err) => Err(err),
            };

            let dirs = self.dirs.clone();
            let Some(job) = self.jobs.get_mut(&event.job_id) else {
                return JobStep::empty();
            };
            job.submit(move || {
                let (scope, site, discovered) = prepared?;
                let inputs = validate_inputs(&site, discovered)?;
                compile(&scope, &site, &inputs, &dirs)
            })
        })
    }

    fn on_task_finished(&mut self, event: &TaskFinished) -> JobStep {
        match self.jobs.get_mut(&event.job_id) {
            Some(job) => job.task_finished(event),
            None => {
                warn!(job_id = %event.job_id, task = %event.task, "task notification for unknown job");
                JobStep::empty()
            }
        }
    }

    fn on_product_available(&mut self, event: &ProductAvailable) -> JobStep {
        // Jobs are driven by explicit submissions; arrivals are discovered at submit time.
        debug!(product = %event.product_id, product_type = %event.product_type, "ignoring product arrival");
        JobStep::empty()
    }

    fn on_manifest_written(&mut self, job_id: JobId, result: Result<()>) -> JobStep {
        match self.jobs.get_mut(&job_id) {
            Some(job) => job.manifest_written(result),
            None => {
                warn!(%job_id, "manifest outcome for unknown job");
                JobStep::empty()
            }
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
