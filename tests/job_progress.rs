// tests/job_progress.rs

mod common;
use crate::common::*;

use agripractices::engine::{CoreCommand, JobOutcome, JobProgress, JobState, TaskFinished};
use agripractices::errors::PipelineError;
use agripractices::pipeline::GlobalExecutionInfo;
use agripractices::types::{JobId, ProductType, TaskId};

fn finished(task: TaskId) -> TaskFinished {
    TaskFinished {
        job_id: JobId(1),
        task,
        outputs: vec![],
        success: true,
        message: None,
    }
}

fn failed(task: TaskId, message: &str) -> TaskFinished {
    TaskFinished {
        success: false,
        message: Some(message.to_string()),
        ..finished(task)
    }
}

fn dispatched() -> (JobProgress, GlobalExecutionInfo) {
    let info = compile_job(&two_practice_site(2), all_products(3));
    let mut job = JobProgress::new(JobId(1));
    let step = job.submit(|| Ok(info.clone()));
    assert_eq!(step.state, Some(JobState::TasksDispatched));
    (job, info)
}

#[test]
fn submit_dispatches_the_graph_and_unlocks_the_root() {
    let info = compile_job(&two_practice_site(2), all_products(3));
    let mut job = JobProgress::new(JobId(1));
    assert_eq!(job.state(), JobState::Submitted);

    let step = job.submit(|| Ok(info.clone()));
    assert!(matches!(step.commands.as_slice(), [CoreCommand::SubmitTasks(e)] if **e == info));
    assert_eq!(step.newly_unlocked, vec![TaskId(0)]);
    assert_eq!(job.unfinished_count(), info.graph.len());
}

#[test]
fn compile_failure_fails_the_job() {
    let mut job = JobProgress::new(JobId(1));
    let step = job.submit(|| {
        Err(PipelineError::InsufficientInput {
            product_type: ProductType::Amplitude,
            practice: agripractices::types::Practice::CatchCrop,
        })
    });

    assert_eq!(job.state(), JobState::Failed);
    match step.commands.as_slice() {
        [CoreCommand::JobFinished {
            outcome: JobOutcome::Failed { reason },
            ..
        }] => assert!(reason.contains("amp")),
        other => panic!("unexpected commands {other:?}"),
    }
    assert!(job.execution().is_none());
}

#[test]
fn completing_the_ids_task_unlocks_its_dependents() {
    let (mut job, info) = dispatched();
    let step = job.task_finished(&finished(TaskId(0)));
    assert!(step.commands.is_empty());
    assert_eq!(step.newly_unlocked, info.graph.dependents_of(TaskId(0)));
    assert_eq!(job.ready_tasks(), step.newly_unlocked);
}

#[test]
fn job_completes_only_after_every_task_and_the_manifest() {
    let (mut job, info) = dispatched();
    let last = info.graph.len() - 1;

    for task in info.tasks().iter().take(last) {
        let step = job.task_finished(&finished(task.id));
        assert!(step.commands.is_empty());
        assert_eq!(job.state(), JobState::TasksDispatched);
    }

    let step = job.task_finished(&finished(info.terminal_task()));
    assert_eq!(job.state(), JobState::Finalizing);
    let manifest = match step.commands.as_slice() {
        [CoreCommand::WriteManifest { path, manifest, .. }] => {
            assert_eq!(*path, info.formatter.manifest_path);
            manifest.clone()
        }
        other => panic!("unexpected commands {other:?}"),
    };
    assert_eq!(manifest.products.len(), 9);

    let step = job.manifest_written(Ok(()));
    assert_eq!(job.state(), JobState::Completed);
    assert!(matches!(
        step.commands.as_slice(),
        [CoreCommand::JobFinished {
            outcome: JobOutcome::Completed,
            ..
        }]
    ));
}

#[test]
fn early_terminal_notification_defers_finalisation() {
    let (mut job, info) = dispatched();

    let step = job.task_finished(&finished(info.terminal_task()));
    assert!(step.commands.is_empty());
    assert_eq!(job.state(), JobState::TasksDispatched);

    for task in info.tasks() {
        job.task_finished(&finished(task.id));
    }
    assert_eq!(job.state(), JobState::Finalizing);
    assert_eq!(job.unfinished_count(), 0);
}

#[test]
fn duplicate_and_unknown_notifications_are_ignored() {
    let (mut job, _info) = dispatched();

    job.task_finished(&finished(TaskId(0)));
    let again = job.task_finished(&finished(TaskId(0)));
    assert!(again.commands.is_empty());
    assert!(again.newly_unlocked.is_empty());

    let unknown = job.task_finished(&finished(TaskId(10_000)));
    assert!(unknown.commands.is_empty());
    assert_eq!(job.state(), JobState::TasksDispatched);
}

#[test]
fn task_failure_fails_the_job_and_later_notifications_are_ignored() {
    let (mut job, _info) = dispatched();
    job.task_finished(&finished(TaskId(0)));

    let step = job.task_finished(&failed(TaskId(1), "exit code 3"));
    assert_eq!(job.state(), JobState::Failed);
    assert!(job.failure().unwrap().contains("exit code 3"));
    assert_eq!(step.commands.len(), 1);

    let after = job.task_finished(&finished(TaskId(2)));
    assert!(after.commands.is_empty());
    assert_eq!(after.state, Some(JobState::Failed));
    assert!(!job.is_finished(TaskId(2)));
}

#[test]
fn manifest_failure_fails_the_job() {
    let (mut job, info) = dispatched();
    for task in info.tasks() {
        job.task_finished(&finished(task.id));
    }

    let step = job.manifest_written(Err(PipelineError::ManifestWrite {
        path: info.formatter.manifest_path.clone(),
        source: anyhow::anyhow!("disk full"),
    }));
    assert_eq!(job.state(), JobState::Failed);
    assert!(job.failure().unwrap().contains("disk full"));
    assert!(matches!(
        step.commands.as_slice(),
        [CoreCommand::JobFinished {
            outcome: JobOutcome::Failed { .. },
            ..
        }]
    ));
}

#[test]
fn resubmission_is_ignored() {
    let (mut job, info) = dispatched();
    let step = job.submit(|| Ok(info.clone()));
    assert!(step.commands.is_empty());
    assert_eq!(job.state(), JobState::TasksDispatched);
}

#[test]
fn rejected_dispatch_fails_the_job_once() {
    let (mut job, _) = dispatched();

    let step = job.dispatch_failed(PipelineError::Scheduler("db unavailable".to_string()));
    assert_eq!(job.state(), JobState::Failed);
    assert!(matches!(
        step.commands.as_slice(),
        [CoreCommand::JobFinished { job_id: JobId(1), outcome: JobOutcome::Failed { reason } }]
            if reason.contains("db unavailable")
    ));

    // Already terminal: a second rejection changes nothing.
    let again = job.dispatch_failed(PipelineError::Scheduler("again".to_string()));
    assert!(again.commands.is_empty());
    assert!(job.failure().unwrap().contains("db unavailable"));
}
