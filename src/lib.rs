// src/lib.rs

pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod scheduler;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::catalog::ProductCatalog;
use crate::config::SiteRegistry;
use crate::engine::{
    AgricPracticesHandler, DummyProcessorHandler, Runtime, RuntimeEvent, RuntimeOptions,
};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::manifest::ManifestWriter;
use crate::pipeline::WorkingDirs;
use crate::scheduler::SchedulerBackend;

/// Everything the surrounding service provides to the engine.
pub struct ServiceParts<B: SchedulerBackend> {
    pub sites: SiteRegistry,
    pub catalog: Arc<dyn ProductCatalog>,
    pub fs: Arc<dyn FileSystem>,
    pub working_root: PathBuf,
    pub backend: B,
    pub options: RuntimeOptions,
}

/// Wire a runtime with both processor handlers registered.
///
/// Returns the runtime together with the sender the orchestrator uses to
/// deliver `RuntimeEvent`s.
pub fn build_runtime<B: SchedulerBackend>(
    parts: ServiceParts<B>,
    capacity: usize,
) -> Result<(Runtime<B>, mpsc::Sender<RuntimeEvent>)> {
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(capacity);
    let dirs = WorkingDirs::new(parts.working_root);

    info!(
        sites = parts.sites.len(),
        root = ?dirs.root(),
        "building agripractices runtime"
    );

    let runtime = Runtime::new(rx, parts.backend, ManifestWriter::new(parts.fs), parts.options)
        .with_handler(Box::new(AgricPracticesHandler::new(
            parts.sites,
            parts.catalog,
            dirs.clone(),
        )))?
        .with_handler(Box::new(DummyProcessorHandler::new(dirs)))?;

    Ok((runtime, tx))
}
