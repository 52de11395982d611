// tests/runtime.rs

mod common;
use crate::common::*;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use agripractices::catalog::InMemoryCatalog;
use agripractices::config::overrides::{KEY_END_DATE, KEY_START_DATE};
use agripractices::config::{OverrideParameters, SiteRegistry};
use agripractices::engine::dummy::DUMMY_PROCESSOR_NAME;
use agripractices::engine::{
    AgricPracticesHandler, DummyProcessorHandler, JobOutcome, JobState, JobSubmitted, ProcessorHandler,
    ProductAvailable, Runtime, RuntimeEvent, RuntimeOptions, TaskFinished,
};
use agripractices::fs::mock::MockFileSystem;
use agripractices::manifest::{ExecutionManifest, ManifestWriter};
use agripractices::pipeline::WorkingDirs;
use agripractices::pipeline::arguments::PROCESSOR_NAME;
use agripractices::types::{JobId, ProductType, SiteId, TaskId};
use agripractices::{ServiceParts, build_runtime};

const MANIFEST: &str = "/work/job_1/execution_infos.json";

fn registry() -> SiteRegistry {
    let mut sites = SiteRegistry::new();
    sites.register(SiteId(7), "nld", two_practice_site(2));
    sites
}

fn full_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_products(ProductType::Ndvi, products("ndvi", 5))
        .with_products(ProductType::Amplitude, products("amp", 3))
        .with_products(ProductType::Coherence, products("cohe", 3))
}

fn agric_handler(catalog: InMemoryCatalog) -> Box<AgricPracticesHandler> {
    Box::new(AgricPracticesHandler::new(
        registry(),
        Arc::new(catalog),
        WorkingDirs::new("/work"),
    ))
}

fn submitted(job: u64, processor: &str) -> RuntimeEvent {
    RuntimeEvent::JobSubmitted(JobSubmitted {
        job_id: JobId(job),
        processor: processor.to_string(),
        site_id: SiteId(7),
        scheduled_date: date(2024, 6, 30),
        override_parameters: OverrideParameters::new(),
    })
}

fn runtime(
    rx: mpsc::Receiver<RuntimeEvent>,
    scheduler: RecordingScheduler,
    fs: &MockFileSystem,
) -> Runtime<RecordingScheduler> {
    runtime_with(rx, scheduler, fs, RuntimeOptions { exit_when_idle: true })
}

/// Runtime that keeps going until `ShutdownRequested`.
fn long_running(
    rx: mpsc::Receiver<RuntimeEvent>,
    scheduler: RecordingScheduler,
    fs: &MockFileSystem,
) -> Runtime<RecordingScheduler> {
    runtime_with(rx, scheduler, fs, RuntimeOptions::default())
}

fn runtime_with(
    rx: mpsc::Receiver<RuntimeEvent>,
    scheduler: RecordingScheduler,
    fs: &MockFileSystem,
    options: RuntimeOptions,
) -> Runtime<RecordingScheduler> {
    Runtime::new(rx, scheduler, ManifestWriter::new(Arc::new(fs.clone())), options)
}

fn task_failed(job: u64, task: usize, message: &str) -> RuntimeEvent {
    RuntimeEvent::TaskFinished(TaskFinished {
        job_id: JobId(job),
        task: TaskId(task),
        outputs: vec![],
        success: false,
        message: Some(message.to_string()),
    })
}

#[tokio::test]
async fn job_runs_to_completion_and_writes_the_manifest() {
    init_tracing();
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::completing(tx.clone());

    let rt = runtime(rx, scheduler.clone(), &fs)
        .with_handler(agric_handler(full_catalog()))
        .unwrap();

    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert_eq!(scheduler.finished(), vec![(JobId(1), JobOutcome::Completed)]);

    let submitted = scheduler.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].scope.start, date(2024, 1, 1));
    assert_eq!(submitted[0].scope.end, date(2024, 6, 30));

    let written = fs.contents(MANIFEST).expect("manifest written");
    let manifest: ExecutionManifest = serde_json::from_slice(&written).unwrap();
    assert_eq!(manifest.products.len(), 5 + 3 + 3);
}

#[tokio::test]
async fn manifest_write_failure_fails_the_job() {
    init_tracing();
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    fs.fail_writes_under("/work");
    let scheduler = RecordingScheduler::completing(tx.clone());

    let rt = runtime(rx, scheduler.clone(), &fs)
        .with_handler(agric_handler(full_catalog()))
        .unwrap();

    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    let finished = scheduler.finished();
    assert_eq!(finished.len(), 1);
    match &finished[0].1 {
        JobOutcome::Failed { reason } => assert!(reason.contains("execution_infos.json")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn insufficient_input_fails_before_anything_is_submitted() {
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::completing(tx.clone());
    let catalog = InMemoryCatalog::new().with_products(ProductType::Ndvi, products("ndvi", 5));

    let rt = runtime(rx, scheduler.clone(), &fs)
        .with_handler(agric_handler(catalog))
        .unwrap();

    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert!(scheduler.submitted().is_empty());
    assert!(matches!(
        scheduler.finished().as_slice(),
        [(JobId(1), JobOutcome::Failed { reason })] if reason.contains("amp")
    ));
}

#[tokio::test]
async fn task_failure_is_reported_once() {
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::new();

    let rt = runtime(rx, scheduler.clone(), &fs)
        .with_handler(agric_handler(full_catalog()))
        .unwrap();

    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    tx.send(task_failed(1, 0, "ids extractor crashed")).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert_eq!(scheduler.submitted().len(), 1);
    assert!(matches!(
        scheduler.finished().as_slice(),
        [(JobId(1), JobOutcome::Failed { reason })] if reason.contains("ids extractor crashed")
    ));
    assert!(fs.contents(MANIFEST).is_none());
}

#[tokio::test]
async fn rejected_task_graph_fails_only_that_job() {
    init_tracing();
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::new();
    scheduler.fail_next_submit("db unavailable");

    let rt = long_running(rx, scheduler.clone(), &fs)
        .with_handler(agric_handler(full_catalog()))
        .unwrap();

    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    tx.send(submitted(2, PROCESSOR_NAME)).await.unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert!(matches!(
        scheduler.finished().as_slice(),
        [(JobId(1), JobOutcome::Failed { reason })] if reason.contains("db unavailable")
    ));
    let accepted: Vec<JobId> = scheduler.submitted().iter().map(|e| e.job_id()).collect();
    assert_eq!(accepted, vec![JobId(2)]);
}

#[tokio::test]
async fn failed_outcome_report_does_not_stop_the_runtime() {
    let (tx, rx) = mpsc::channel(8);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::new();
    scheduler.fail_next_report("connection reset");
    let rt = long_running(rx, scheduler.clone(), &fs);

    tx.send(submitted(4, "l2a")).await.unwrap();
    tx.send(submitted(5, "l2a")).await.unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert!(matches!(
        scheduler.finished().as_slice(),
        [(JobId(5), JobOutcome::Failed { .. })]
    ));
}

#[tokio::test]
async fn resubmitting_an_in_flight_job_keeps_its_owner() {
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::new();

    let rt = runtime(rx, scheduler.clone(), &fs)
        .with_handler(agric_handler(full_catalog()))
        .unwrap()
        .with_handler(Box::new(DummyProcessorHandler::new(WorkingDirs::new("/work"))))
        .unwrap();

    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    tx.send(submitted(1, DUMMY_PROCESSOR_NAME)).await.unwrap();
    tx.send(task_failed(1, 0, "boom")).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert_eq!(scheduler.submitted().len(), 1);
    assert!(matches!(
        scheduler.finished().as_slice(),
        [(JobId(1), JobOutcome::Failed { reason })] if reason.contains("boom")
    ));
}

#[tokio::test]
async fn finished_job_id_can_be_submitted_again() {
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::new();

    let rt = long_running(rx, scheduler.clone(), &fs)
        .with_handler(agric_handler(full_catalog()))
        .unwrap();

    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    tx.send(task_failed(1, 0, "first attempt")).await.unwrap();
    tx.send(submitted(1, PROCESSOR_NAME)).await.unwrap();
    tx.send(task_failed(1, 0, "second attempt")).await.unwrap();
    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert_eq!(scheduler.submitted().len(), 2);
    let reasons: Vec<String> = scheduler
        .finished()
        .into_iter()
        .map(|(_, outcome)| match outcome {
            JobOutcome::Failed { reason } => reason,
            other => panic!("expected failure, got {other:?}"),
        })
        .collect();
    assert_eq!(reasons.len(), 2);
    assert!(reasons[0].contains("first attempt"));
    assert!(reasons[1].contains("second attempt"));
}

#[tokio::test]
async fn unknown_processor_is_reported_failed() {
    let (tx, rx) = mpsc::channel(8);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::new();
    let rt = runtime(rx, scheduler.clone(), &fs);

    tx.send(submitted(4, "l2a")).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert!(matches!(
        scheduler.finished().as_slice(),
        [(JobId(4), JobOutcome::Failed { .. })]
    ));
}

#[tokio::test]
async fn dummy_handler_forwards_arrived_products() {
    let (tx, rx) = mpsc::channel(64);
    let fs = MockFileSystem::new();
    let scheduler = RecordingScheduler::completing(tx.clone());

    let rt = runtime(rx, scheduler.clone(), &fs)
        .with_handler(Box::new(DummyProcessorHandler::new(WorkingDirs::new("/work"))))
        .unwrap();

    for id in ["/l3b/a.tif", "/l3b/b.tif"] {
        tx.send(RuntimeEvent::ProductAvailable(ProductAvailable {
            site_id: SiteId(7),
            product_id: id.to_string(),
            product_type: ProductType::Ndvi,
        }))
        .await
        .unwrap();
    }
    tx.send(submitted(1, DUMMY_PROCESSOR_NAME)).await.unwrap();
    with_timeout(rt.run()).await.unwrap();

    assert_eq!(scheduler.finished(), vec![(JobId(1), JobOutcome::Completed)]);
    let manifest: ExecutionManifest =
        serde_json::from_slice(&fs.contents(MANIFEST).unwrap()).unwrap();
    let ids: Vec<&str> = manifest.products.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["/l3b/a.tif", "/l3b/b.tif"]);
}

#[tokio::test]
async fn built_runtime_stops_on_shutdown() {
    let fs = MockFileSystem::new();
    let (rt, tx) = build_runtime(
        ServiceParts {
            sites: registry(),
            catalog: Arc::new(full_catalog()),
            fs: Arc::new(fs),
            working_root: "/work".into(),
            backend: RecordingScheduler::new(),
            options: RuntimeOptions::default(),
        },
        16,
    )
    .unwrap();

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    with_timeout(rt.run()).await.unwrap();
}

#[test]
fn processing_definition_window() {
    let handler = agric_handler(full_catalog());

    let def = handler.processing_definition(SiteId(7), date(2024, 6, 30), &BTreeMap::new());
    assert!(def.is_valid);
    assert_eq!((def.start, def.end), (date(2024, 1, 1), date(2024, 6, 30)));

    let overrides = BTreeMap::from([
        (KEY_START_DATE.to_string(), "2024-03-01".to_string()),
        (KEY_END_DATE.to_string(), "20240415".to_string()),
    ]);
    let def = handler.processing_definition(SiteId(7), date(2024, 6, 30), &overrides);
    assert_eq!((def.start, def.end), (date(2024, 3, 1), date(2024, 4, 15)));

    // The end override never extends past the scheduled date.
    let late = BTreeMap::from([(KEY_END_DATE.to_string(), "2024-12-31".to_string())]);
    let def = handler.processing_definition(SiteId(7), date(2024, 6, 30), &late);
    assert_eq!(def.end, date(2024, 6, 30));

    let empty = BTreeMap::from([(KEY_START_DATE.to_string(), "2024-08-01".to_string())]);
    assert!(!handler.processing_definition(SiteId(7), date(2024, 6, 30), &empty).is_valid);

    let unknown = handler.processing_definition(SiteId(99), date(2024, 6, 30), &BTreeMap::new());
    assert!(!unknown.is_valid);
    assert!(unknown.reason.unwrap().contains("Unknown site"));
}

#[tokio::test]
async fn handler_releases_only_finished_jobs() {
    let mut handler = agric_handler(full_catalog());

    let RuntimeEvent::JobSubmitted(event) = submitted(1, PROCESSOR_NAME) else {
        unreachable!()
    };
    handler.on_job_submitted(event).await;
    let tasks = handler.job(JobId(1)).unwrap().execution().unwrap().tasks().len();

    // Still running: kept.
    assert_eq!(handler.release(JobId(1)), None);
    assert!(handler.job(JobId(1)).is_some());

    for task in 0..tasks {
        handler.on_task_finished(&TaskFinished {
            job_id: JobId(1),
            task: TaskId(task),
            outputs: vec![],
            success: true,
            message: None,
        });
    }
    handler.on_manifest_written(JobId(1), Ok(()));

    assert_eq!(handler.release(JobId(1)), Some(JobState::Completed));
    assert!(handler.job(JobId(1)).is_none());
    assert_eq!(handler.job_state(JobId(1)), None);
}
