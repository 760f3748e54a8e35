//! Tests for the display snapshot

use prometheus_task_policy::builders::TaskPropertyBuilder;
use prometheus_task_policy::core::{CancelReason, TaskState};
use prometheus_task_policy::runtime::{InstanceSummary, PropertyState, TokioSpawner};

#[tokio::test]
async fn test_snapshot_of_fresh_property() {
    let task = TaskPropertyBuilder::from_fn(|n: u32, _token| async move { Ok(n) })
        .name("fresh")
        .build(TokioSpawner::current().unwrap())
        .unwrap();

    let snap = task.snapshot();
    assert_eq!(snap.name, "fresh");
    assert_eq!(snap.state, PropertyState::Idle);
    assert!(snap.is_idle);
    assert!(!snap.is_active);
    assert_eq!(snap.running, 0);
    assert_eq!(snap.queued, 0);
    assert!(snap.last_called.is_none());
}

#[tokio::test]
async fn test_instance_summary_of_failure() {
    let task = TaskPropertyBuilder::from_fn(|_: (), _token| async move {
        Err::<u32, _>(anyhow::anyhow!("quota exceeded"))
    })
    .build(TokioSpawner::current().unwrap())
    .unwrap();

    let ti = task.run(());
    ti.settled().await;

    let summary = InstanceSummary::from(&ti);
    assert_eq!(summary.id, ti.id());
    assert_eq!(summary.state, TaskState::Rejected);
    assert_eq!(summary.error.as_deref(), Some("quota exceeded"));
    assert!(summary.cancel_reason.is_none());

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["state"], "rejected");
    assert!(json.get("cancelReason").is_some());
}

#[tokio::test]
async fn test_snapshot_records_abort() {
    let task = TaskPropertyBuilder::from_fn(|_: (), token: tokio_util::sync::CancellationToken| async move {
        token.cancelled().await;
        Ok(())
    })
    .build(TokioSpawner::current().unwrap())
    .unwrap();

    let ti = task.run(());
    assert_eq!(task.snapshot().state, PropertyState::Active);
    task.abort();
    ti.settled().await;

    let snap = task.snapshot();
    assert!(snap.self_canceled);
    let canceled = snap.last_canceled.unwrap();
    assert_eq!(canceled.cancel_reason, Some(CancelReason::Aborted));

    let json = serde_json::to_value(task.snapshot()).unwrap();
    assert_eq!(json["lastCanceled"]["cancelReason"], "aborted");
}
