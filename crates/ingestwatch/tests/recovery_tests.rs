//! Restart recovery driven by the persisted active-job pointer.

mod common;

use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;

use common::*;
use ingestwatch::{
    HistoryStore, Job, JobStatus, LifecycleEvent, RecoveryOutcome, ServiceError,
};

#[tokio::test(start_paused = true)]
async fn test_no_pointer_is_noop() {
    let harness = TestHarness::new();
    let manager = harness.manager();
    let mut rx = manager.subscribe();

    assert!(matches!(
        manager.recover_on_startup().await,
        RecoveryOutcome::NothingToRecover
    ));
    assert!(!manager.is_polling().await);
    assert!(manager.current_job().await.is_none());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.service.status_calls(), 0);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_job_failed_while_away_is_finalized() {
    let harness = TestHarness::new();
    harness.store().set_pointer("j1");
    harness
        .service
        .push_status(Ok(failed("j1", &[("a.md", "parse error")])));

    let manager = harness.manager();
    let mut rx = manager.subscribe();

    match manager.recover_on_startup().await {
        RecoveryOutcome::Finalized(job) => {
            assert_eq!(job.status, JobStatus::Failed);
            assert_eq!(job.error_count(), 1);
            assert!(job.completed_at.is_some());
        }
        other => panic!("expected finalized, got {:?}", other),
    }

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].job_id, "j1");
    assert_eq!(history[0].status, JobStatus::Failed);
    assert_eq!(history[0].error_count, 1);

    assert_eq!(manager.active_job_id(), None);
    assert!(!manager.is_polling().await);
    assert!(matches!(rx.try_recv(), Ok(LifecycleEvent::Terminal(_))));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.service.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_running_job_resumes_polling() {
    let harness = TestHarness::new();
    harness.store().set_pointer("j1");
    harness.service.push_status(Ok(running("j1", 40.0, 10, 4)));
    harness.service.push_status(Ok(running("j1", 80.0, 10, 8)));
    harness.service.push_status(Ok(completed("j1", 10, 70)));

    let manager = harness.manager();
    let mut rx = manager.subscribe();

    match manager.recover_on_startup().await {
        RecoveryOutcome::Resumed(job) => {
            assert_eq!(job.job_id, "j1");
            assert_eq!(job.status, JobStatus::Running);
            assert_eq!(job.progress.percent, 40.0);
        }
        other => panic!("expected resumed, got {:?}", other),
    }
    assert!(manager.is_polling().await);
    assert_eq!(manager.active_job_id(), Some("j1".to_string()));

    match next_event(&mut rx).await {
        LifecycleEvent::Progress(job) => assert_eq!(job.progress.percent, 80.0),
        other => panic!("expected progress, got {:?}", other),
    }
    match next_event(&mut rx).await {
        LifecycleEvent::Terminal(job) => assert_eq!(job.stats.unwrap().chunks, 70),
        other => panic!("expected terminal, got {:?}", other),
    }

    assert_eq!(manager.active_job_id(), None);
    assert_eq!(manager.history()[0].chunks, 70);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_job_is_discarded_silently() {
    let harness = TestHarness::new();
    harness.store().set_pointer("gone");
    harness
        .service
        .push_status(Err(ServiceError::NotFound("gone".to_string())));

    let manager = harness.manager();
    let mut rx = manager.subscribe();

    match manager.recover_on_startup().await {
        RecoveryOutcome::Discarded { job_id, error } => {
            assert_eq!(job_id, "gone");
            assert_eq!(error, ServiceError::NotFound("gone".to_string()));
        }
        other => panic!("expected discarded, got {:?}", other),
    }

    assert_eq!(manager.active_job_id(), None);
    assert!(manager.history().is_empty());
    assert!(!manager.is_polling().await);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_service_clears_pointer() {
    let harness = TestHarness::new();
    harness.store().set_pointer("j1");
    harness.service.push_status(Err(transport_error()));

    let manager = harness.manager();
    assert!(matches!(
        manager.recover_on_startup().await,
        RecoveryOutcome::Discarded { .. }
    ));
    assert_eq!(harness.store().get_pointer(), None);

    // A second startup has nothing left to retry.
    let manager = harness.manager();
    assert!(matches!(
        manager.recover_on_startup().await,
        RecoveryOutcome::NothingToRecover
    ));
    assert_eq!(harness.service.status_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_job_survives_restart_after_submission() {
    let harness = TestHarness::new();
    harness.service.push_create(Ok(created("j1", "/vault", "work")));

    {
        let first_run = harness.manager();
        first_run.submit("/vault", "work").await.unwrap();
        assert_eq!(first_run.active_job_id(), Some("j1".to_string()));
        // Dropped before the first tick, as if the process died.
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(harness.service.status_calls(), 0);

    harness.service.push_status(Ok(completed("j1", 5, 40)));
    let second_run = harness.manager();
    match second_run.recover_on_startup().await {
        RecoveryOutcome::Finalized(job) => {
            assert_eq!(job.job_id, "j1");
            assert_eq!(job.stats.unwrap().documents, 5);
        }
        other => panic!("expected finalized, got {:?}", other),
    }
    assert_eq!(second_run.history().len(), 1);
    assert_eq!(second_run.active_job_id(), None);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_is_retried_on_next_startup() {
    let harness = TestHarness::new();
    harness.service.push_create(Ok(created("j1", "/vault", "work")));
    harness.service.push_status(Err(transport_error()));

    let first_run = harness.manager();
    let mut rx = first_run.subscribe();
    first_run.submit("/vault", "work").await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        LifecycleEvent::PollFailed { .. }
    ));
    drop(first_run);

    harness.service.push_status(Ok(completed("j1", 2, 8)));
    let second_run = harness.manager();
    assert!(matches!(
        second_run.recover_on_startup().await,
        RecoveryOutcome::Finalized(_)
    ));
    assert_eq!(harness.service.requested_ids(), vec!["j1", "j1"]);
    assert_eq!(second_run.active_job_id(), None);
}

#[tokio::test(start_paused = true)]
async fn test_refinalized_job_is_not_duplicated() {
    let harness = TestHarness::new();

    // A previous run recorded the job but died before clearing the pointer.
    let store = harness.store();
    let mut earlier = Job::from_snapshot(&created("j1", "/vault", "work"), "", "");
    earlier.finalize(&completed("j1", 3, 10));
    HistoryStore::new(store.clone(), 5).record(&earlier).unwrap();
    store.set_pointer("j1");

    harness.service.push_status(Ok(completed("j1", 4, 16)));
    let manager = harness.manager();
    assert!(matches!(
        manager.recover_on_startup().await,
        RecoveryOutcome::Finalized(_)
    ));

    let history = manager.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].documents, 4);
    assert_eq!(history[0].chunks, 16);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_without_storage_is_noop() {
    let harness = TestHarness::new();
    let manager = ingestwatch::LifecycleManager::new(
        harness.service.clone(),
        ingestwatch::StateStore::disabled(),
        POLL_INTERVAL,
        5,
    );

    assert!(matches!(
        manager.recover_on_startup().await,
        RecoveryOutcome::NothingToRecover
    ));
    assert_eq!(harness.service.status_calls(), 0);
}
